//! The authorization code flow state machine
//!
//! `OAuthClient` holds an immutable `ClientConfig` and an HTTP capability.
//! Session state is threaded in by the caller on every call:
//!
//! 1. `begin_authorization` stores state + PKCE values and returns the redirect target
//! 2. the authorization server redirects back with `state` and `code`
//! 3. `complete_authorization` validates the callback and exchanges the code
//! 4. `refresh` / `verify` as needed afterwards

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::pkce::{self, PkcePair};
use crate::session::{self, Session};
use crate::token::{self, TokenReply, TokenSet};

/// Everything needed to send the user agent to the authorization server.
///
/// The client never performs the redirect itself; the caller decides how to
/// apply `location`.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub state: String,
    pub pkce: PkcePair,
    pub location: Url,
}

/// Raw query parameters of the redirect back from the authorization server.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub state: Option<String>,
    pub code: Option<String>,
    pub error: Option<String>,
}

/// OAuth 2.0 authorization code + PKCE client for one authorization server.
///
/// Read-only after construction; share it behind an `Arc`.
pub struct OAuthClient {
    config: ClientConfig,
    http: Arc<dyn HttpClient>,
}

impl OAuthClient {
    pub fn new(config: ClientConfig, http: Arc<dyn HttpClient>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Start a flow: generate (or accept) state and PKCE values, record them
    /// in the session, and compute the authorization redirect.
    pub fn begin_authorization(
        &self,
        session: &dyn Session,
        scope: &str,
        state_override: Option<&str>,
        verifier_override: Option<&str>,
    ) -> AuthorizationRequest {
        let state = match state_override {
            Some(s) => s.to_owned(),
            None => pkce::generate_state(),
        };
        let pkce = pkce::generate_pkce(verifier_override);

        session.set(session::STATE, state.clone());
        session.set(session::CODE_VERIFIER, pkce.verifier.clone());
        session.set(session::CODE_CHALLENGE, pkce.challenge.clone());

        let location = pkce::build_authorization_url(&self.config, scope, &state, &pkce.challenge);
        AuthorizationRequest {
            state,
            pkce,
            location,
        }
    }

    /// Validate the callback and exchange its code for tokens.
    ///
    /// Checks run cheapest first and short-circuit: server-reported error,
    /// missing parameters, state binding, code format, then the network call.
    /// The pending flow is only cleared once tokens are issued, so a callback
    /// that failed in transport can be retried.
    pub async fn complete_authorization(
        &self,
        session: &dyn Session,
        params: &CallbackParams,
    ) -> Result<TokenSet> {
        if let Some(error) = non_empty(&params.error) {
            warn!(error, "authorization server returned an error");
            return Err(Error::AuthorizationDenied(error.to_owned()));
        }

        let (Some(state), Some(code)) = (non_empty(&params.state), non_empty(&params.code)) else {
            return Err(Error::InvalidRequest);
        };

        if session.get(session::STATE).as_deref() != Some(state) {
            warn!("callback state does not match pending flow");
            return Err(Error::InvalidState);
        }

        if !self.config.code_policy.accepts(code) {
            return Err(Error::InvalidCode);
        }

        let Some(verifier) = session.get(session::CODE_VERIFIER) else {
            warn!("pending flow has no code verifier");
            return Err(Error::InvalidState);
        };

        match token::exchange_code(self.http.as_ref(), &self.config, code, &verifier).await? {
            TokenReply::Issued(tokens) => {
                session.delete(session::STATE);
                session.delete(session::CODE_VERIFIER);
                session.delete(session::CODE_CHALLENGE);
                store_tokens(session, &tokens, None);
                info!("authorization code exchanged");
                Ok(tokens)
            }
            TokenReply::Rejected(payload) => Err(Error::Token(payload)),
            TokenReply::Empty(_) => Err(Error::UserDenied),
        }
    }

    /// Renew tokens with a refresh token and overwrite them in the session.
    ///
    /// A server that does not rotate refresh tokens omits `refresh_token`
    /// from the reply; the one just used stays valid and stays in the session.
    pub async fn refresh(&self, session: &dyn Session, refresh_token: &str) -> Result<TokenSet> {
        match token::refresh_token(self.http.as_ref(), &self.config, refresh_token).await? {
            TokenReply::Issued(tokens) => {
                store_tokens(session, &tokens, Some(refresh_token));
                info!("access token refreshed");
                Ok(tokens)
            }
            TokenReply::Rejected(payload) | TokenReply::Empty(payload) => {
                Err(Error::Token(payload))
            }
        }
    }

    /// Whether the verify endpoint considers `access_token` valid.
    pub async fn verify(&self, access_token: &str) -> Result<bool> {
        token::verify_token(self.http.as_ref(), &self.config, access_token).await
    }
}

/// Write issued tokens.
///
/// `used_refresh` is the refresh token of a refresh grant. It is kept when the
/// server issues no replacement, and so is the current scope (an omitted scope
/// means the granted scope is unchanged). After a code exchange, values the
/// server did not send are removed.
fn store_tokens(session: &dyn Session, tokens: &TokenSet, used_refresh: Option<&str>) {
    session.set(session::ACCESS_TOKEN, tokens.access_token.clone());

    match (&tokens.refresh_token, used_refresh) {
        (Some(issued), _) => session.set(session::REFRESH_TOKEN, issued.clone()),
        (None, Some(used)) => session.set(session::REFRESH_TOKEN, used.to_owned()),
        (None, None) => session.delete(session::REFRESH_TOKEN),
    }

    match &tokens.scope {
        Some(scope) => session.set(session::SCOPE, scope.clone()),
        None if used_refresh.is_none() => session.delete(session::SCOPE),
        None => {}
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
