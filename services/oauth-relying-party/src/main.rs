//! OAuth Relying Party
//!
//! Reference web service driving the authorization code + PKCE flow:
//! 1. `/login` starts a flow and redirects to the authorization server
//! 2. `/callback` exchanges the returned code for tokens
//! 3. `/refresh` and `/verify` renew and check the session's tokens

mod config;
mod error;
mod routes;
mod sessions;

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use oauth_client::{OAuthClient, ReqwestHttp};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::sessions::SessionRegistry;

/// Shared application state accessible from all handlers
#[derive(Clone)]
struct AppState {
    client: Arc<OAuthClient>,
    sessions: Arc<SessionRegistry>,
    default_scope: String,
    started_at: Instant,
}

fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/login", get(routes::login))
        .route("/callback", get(routes::callback))
        .route("/refresh", post(routes::refresh))
        .route("/verify", get(routes::verify))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting oauth-relying-party");

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let client_config = config.oauth.client_config()?;
    info!(
        listen_addr = %config.server.listen_addr,
        authorize_url = %client_config.authorize_url,
        token_url = %client_config.token_url,
        verify_url = %client_config.verify_url,
        code_policy = ?client_config.code_policy,
        http_errors = config.oauth.http_errors,
        "configuration loaded"
    );

    let http = ReqwestHttp::new(config.oauth.timeout(), config.oauth.http_errors)?;
    let client = OAuthClient::new(client_config, Arc::new(http))?;

    let state = AppState {
        client: Arc::new(client),
        sessions: Arc::new(SessionRegistry::new(
            config.server.session_ttl(),
            config.server.max_sessions,
        )),
        default_scope: config.oauth.scope.clone(),
        started_at: Instant::now(),
    };
    let app = build_router(state, config.server.max_connections);

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;
    info!(addr = %listen_addr, "accepting requests");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

/// Liveness endpoint: status, uptime and number of known sessions.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "healthy",
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "sessions": state.sessions.len(),
    }))
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
