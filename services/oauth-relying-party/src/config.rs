//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The client secret is loaded from OAUTH_CLIENT_SECRET or client_secret_file,
//! never stored in the TOML directly to avoid leaking secrets.

use common::Secret;
use oauth_client::{ClientConfig, CodePolicy};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub oauth: OAuthConfig,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Idle time after which a session is forgotten
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
    /// Upper bound on live sessions; the least recently seen is evicted first
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

/// Authorization server endpoints and client registration
#[derive(Debug, Deserialize)]
pub struct OAuthConfig {
    pub authorize_url: String,
    pub token_url: String,
    /// Defaults to `/oauth/verify` on the token URL origin
    #[serde(default)]
    pub verify_url: Option<String>,
    pub client_id: String,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
    /// Path to a file containing the client secret (alternative to OAUTH_CLIENT_SECRET)
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
    pub redirect_uri: String,
    #[serde(default = "default_scope")]
    pub scope: String,
    /// "hex" or "non_empty"
    #[serde(default = "default_code_policy")]
    pub code_policy: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Raise non-2xx responses as transport errors instead of returning them
    #[serde(default)]
    pub http_errors: bool,
}

fn default_max_connections() -> usize {
    1000
}

fn default_session_ttl() -> u64 {
    1800
}

fn default_max_sessions() -> usize {
    10_000
}

fn default_scope() -> String {
    "sso".into()
}

fn default_code_policy() -> String {
    "hex".into()
}

fn default_timeout() -> u64 {
    2
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Client secret resolution order:
    /// 1. OAUTH_CLIENT_SECRET env var
    /// 2. client_secret_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if config.oauth.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if config.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        if config.server.session_ttl_secs == 0 || config.server.max_sessions == 0 {
            return Err(common::Error::Config(
                "session_ttl_secs and max_sessions must be greater than 0".into(),
            ));
        }

        if let Ok(secret) = std::env::var("OAUTH_CLIENT_SECRET") {
            config.oauth.client_secret = Some(Secret::new(secret));
        } else if let Some(ref secret_file) = config.oauth.client_secret_file {
            config.oauth.client_secret = Some(Secret::from_file(secret_file)?);
        }

        // Surface bad URLs, empty credentials and unknown policies at startup.
        config
            .oauth
            .client_config()
            .map_err(|e| common::Error::Config(e.to_string()))?;

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("oauth-relying-party.toml")
    }
}

impl ServerConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

impl OAuthConfig {
    /// Build the validated client configuration.
    pub fn client_config(&self) -> oauth_client::Result<ClientConfig> {
        let secret = self.client_secret.as_ref().ok_or_else(|| {
            oauth_client::Error::Config(
                "client secret not set (OAUTH_CLIENT_SECRET or client_secret_file)".into(),
            )
        })?;
        let policy: CodePolicy = self.code_policy.parse()?;

        let mut config = ClientConfig::new(
            &self.authorize_url,
            &self.token_url,
            self.client_id.clone(),
            secret.expose().clone(),
            &self.redirect_uri,
        )?
        .with_code_policy(policy);
        if let Some(ref verify_url) = self.verify_url {
            config = config.with_verify_url(verify_url)?;
        }
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
