//! Request-level errors and their HTTP rendering
//!
//! The OAuth client reports typed failures; this module decides what the
//! user agent sees. Bodies are JSON `{"error": code, "message": text}`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    OAuth(#[from] oauth_client::Error),

    #[error("no refresh token in session")]
    MissingRefreshToken,

    #[error("not signed in")]
    NotSignedIn,
}

impl Error {
    pub fn status(&self) -> StatusCode {
        use oauth_client::Error as OAuth;
        match self {
            Error::OAuth(OAuth::InvalidRequest | OAuth::InvalidState | OAuth::InvalidCode) => {
                StatusCode::BAD_REQUEST
            }
            Error::OAuth(OAuth::AuthorizationDenied(_) | OAuth::UserDenied) => {
                StatusCode::UNAUTHORIZED
            }
            Error::OAuth(OAuth::Transport(_) | OAuth::Token(_)) => StatusCode::BAD_GATEWAY,
            Error::OAuth(OAuth::Config(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::MissingRefreshToken => StatusCode::BAD_REQUEST,
            Error::NotSignedIn => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Error::OAuth(e) => e.code(),
            Error::MissingRefreshToken => "invalid_grant",
            Error::NotSignedIn => "unauthorized",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(status = status.as_u16(), error = %self, "request failed");
        let body = serde_json::json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

/// Result alias for request handlers
pub type Result<T> = std::result::Result<T, Error>;
