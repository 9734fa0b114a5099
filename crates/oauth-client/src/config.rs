//! Client configuration: endpoints, credentials and the code-format policy
//!
//! A `ClientConfig` is validated once when built and never changes after
//! that. Missing values are configuration errors, not runtime ones.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use common::Secret;
use url::Url;

use crate::error::{Error, Result};

/// Path of the token verification endpoint, relative to the token URL origin.
pub const DEFAULT_VERIFY_PATH: &str = "/oauth/verify";

/// Predicate an authorization code must satisfy before it is exchanged.
#[derive(Clone, Default)]
pub enum CodePolicy {
    /// Hexadecimal digits only.
    #[default]
    HexDigits,
    /// Any non-empty code.
    NonEmpty,
    /// Deployment-specific predicate.
    Custom(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl CodePolicy {
    pub fn accepts(&self, code: &str) -> bool {
        match self {
            CodePolicy::HexDigits => !code.is_empty() && code.bytes().all(|b| b.is_ascii_hexdigit()),
            CodePolicy::NonEmpty => !code.is_empty(),
            CodePolicy::Custom(predicate) => predicate(code),
        }
    }
}

impl fmt::Debug for CodePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodePolicy::HexDigits => write!(f, "HexDigits"),
            CodePolicy::NonEmpty => write!(f, "NonEmpty"),
            CodePolicy::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl FromStr for CodePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hex" => Ok(CodePolicy::HexDigits),
            "non_empty" => Ok(CodePolicy::NonEmpty),
            other => Err(Error::Config(format!(
                "unknown code policy {other:?}, expected \"hex\" or \"non_empty\""
            ))),
        }
    }
}

/// Endpoints and credentials for one authorization server.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub authorize_url: Url,
    pub token_url: Url,
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub redirect_uri: Url,
    /// Token verification endpoint. Defaults to `/oauth/verify` on the token URL origin.
    pub verify_url: Url,
    pub code_policy: CodePolicy,
}

impl ClientConfig {
    /// Parse and validate the five required values.
    pub fn new(
        authorize_url: &str,
        token_url: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: &str,
    ) -> Result<Self> {
        let token_url = parse_url("token_url", token_url)?;
        let verify_url = token_url
            .join(DEFAULT_VERIFY_PATH)
            .map_err(|e| Error::Config(format!("cannot derive verify_url: {e}")))?;

        let config = Self {
            authorize_url: parse_url("authorize_url", authorize_url)?,
            token_url,
            client_id: client_id.into(),
            client_secret: Secret::new(client_secret.into()),
            redirect_uri: parse_url("redirect_uri", redirect_uri)?,
            verify_url,
            code_policy: CodePolicy::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_verify_url(mut self, verify_url: &str) -> Result<Self> {
        self.verify_url = parse_url("verify_url", verify_url)?;
        Ok(self)
    }

    pub fn with_code_policy(mut self, policy: CodePolicy) -> Self {
        self.code_policy = policy;
        self
    }

    /// Check that every credential is present.
    ///
    /// URLs are already known to parse; this catches empty identifiers,
    /// which the authorization server would otherwise reject mid-flow.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(Error::Config("client_id must not be empty".into()));
        }
        if self.client_secret.expose().is_empty() {
            return Err(Error::Config("client_secret must not be empty".into()));
        }
        Ok(())
    }
}

fn parse_url(field: &str, value: &str) -> Result<Url> {
    let url = Url::parse(value).map_err(|e| Error::Config(format!("{field} {value:?}: {e}")))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(Error::Config(format!(
            "{field} must use http:// or https://, got: {value}"
        )));
    }
    Ok(url)
}
