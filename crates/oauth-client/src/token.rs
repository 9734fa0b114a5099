//! Token endpoint and verify endpoint interactions
//!
//! Handles the three back-channel calls:
//! 1. Authorization code exchange (`grant_type=authorization_code`)
//! 2. Token refresh (`grant_type=refresh_token`)
//! 3. Access token verification (GET on the verify endpoint)
//!
//! These functions only speak the wire format. Session bookkeeping and
//! callback validation live in `client`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpResponse, reason_phrase};

/// Header carrying the access token on verify requests.
pub const VERIFY_TOKEN_HEADER: &str = "x-api-key";

/// Decoded token endpoint response.
///
/// Fields the client does not model are kept in `extra`, so serializing a
/// `TokenSet` reproduces the payload the server sent. Built from a response
/// with [`TokenSet::from_payload`], which also parks mistyped known fields
/// in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Seconds until the access token expires (delta, not absolute)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl TokenSet {
    /// Split a token endpoint object into modelled fields and passthrough.
    ///
    /// Only `access_token` must be a string. A known field with any other
    /// JSON type (say `"expires_in": "3600"`) is left in `extra` unchanged.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let mut extra = payload.as_object()?.clone();
        let access_token = take_string(&mut extra, "access_token")?;
        let token_type = take_string(&mut extra, "token_type");
        let refresh_token = take_string(&mut extra, "refresh_token");
        let scope = take_string(&mut extra, "scope");
        let expires_in = extra.get("expires_in").and_then(Value::as_u64);
        if expires_in.is_some() {
            extra.remove("expires_in");
        }

        Some(Self {
            access_token,
            token_type,
            expires_in,
            refresh_token,
            scope,
            extra,
        })
    }
}

fn take_string(fields: &mut serde_json::Map<String, Value>, key: &str) -> Option<String> {
    if !matches!(fields.get(key), Some(Value::String(_))) {
        return None;
    }
    match fields.remove(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

/// What a 2xx token endpoint body amounted to.
#[derive(Debug)]
pub enum TokenReply {
    /// Non-empty `access_token`.
    Issued(TokenSet),
    /// Non-empty `error`; carries the whole payload.
    Rejected(Value),
    /// Neither a token nor an error (or not JSON at all).
    Empty(Value),
}

/// Exchange an authorization code for tokens.
///
/// The verifier proves this client started the flow the code belongs to.
pub async fn exchange_code(
    http: &dyn HttpClient,
    config: &ClientConfig,
    code: &str,
    verifier: &str,
) -> Result<TokenReply> {
    debug!(token_url = %config.token_url, "exchanging authorization code");
    let response = http
        .post_form(
            &config.token_url,
            &[
                ("grant_type", "authorization_code"),
                ("client_id", config.client_id.as_str()),
                ("client_secret", config.client_secret.expose().as_str()),
                ("redirect_uri", config.redirect_uri.as_str()),
                ("code_verifier", verifier),
                ("code", code),
            ],
        )
        .await?;
    classify_token_response(response)
}

/// Obtain a new token set using a refresh token.
pub async fn refresh_token(
    http: &dyn HttpClient,
    config: &ClientConfig,
    refresh: &str,
) -> Result<TokenReply> {
    debug!(token_url = %config.token_url, "refreshing access token");
    let response = http
        .post_form(
            &config.token_url,
            &[
                ("grant_type", "refresh_token"),
                ("client_id", config.client_id.as_str()),
                ("client_secret", config.client_secret.expose().as_str()),
                ("refresh_token", refresh),
            ],
        )
        .await?;
    classify_token_response(response)
}

/// Ask the verify endpoint whether `access_token` is currently valid.
///
/// `Ok(false)` is a legitimate answer: the server reports invalid or expired
/// tokens that way.
pub async fn verify_token(
    http: &dyn HttpClient,
    config: &ClientConfig,
    access_token: &str,
) -> Result<bool> {
    debug!(verify_url = %config.verify_url, "verifying access token");
    let response = http
        .get(&config.verify_url, &[(VERIFY_TOKEN_HEADER, access_token)])
        .await?;
    let payload = success_payload(response)?;

    if is_present(payload.get("error")) {
        warn!("verify endpoint reported an error");
        return Err(Error::Token(payload));
    }
    match payload.get("status") {
        Some(Value::Bool(status)) => Ok(*status),
        _ => Err(Error::Token(payload)),
    }
}

/// Map a token endpoint response onto `TokenReply`.
fn classify_token_response(response: HttpResponse) -> Result<TokenReply> {
    let payload = success_payload(response)?;

    if is_present(payload.get("error")) {
        warn!("token endpoint reported an error");
        return Ok(TokenReply::Rejected(payload));
    }
    if !is_present(payload.get("access_token")) {
        return Ok(TokenReply::Empty(payload));
    }

    match TokenSet::from_payload(&payload) {
        Some(tokens) => Ok(TokenReply::Issued(tokens)),
        None => {
            warn!("token response access_token is not a string");
            Ok(TokenReply::Rejected(payload))
        }
    }
}

/// Reject non-2xx statuses and decode the body.
///
/// A body that is not JSON comes back as a JSON string so callers still have
/// something to report.
fn success_payload(response: HttpResponse) -> Result<Value> {
    if !response.status.is_success() {
        warn!(status = response.status.as_u16(), "endpoint returned non-success status");
        return Err(Error::Transport(reason_phrase(response.status)));
    }
    Ok(serde_json::from_str(&response.body).unwrap_or(Value::String(response.body)))
}

/// Whether a JSON field counts as set.
///
/// Missing, `null`, `false`, `0`, `""`, `"0"`, `[]` and `{}` are all unset,
/// the same values a loosely typed server treats as empty.
fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty() && s != "0",
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}
