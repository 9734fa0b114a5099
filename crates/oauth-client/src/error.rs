//! Error types for the authorization code flow
//!
//! Every variant is fatal to the current call. Nothing is retried here; the
//! caller decides whether to restart the flow or surface the failure.

/// Errors from OAuth client operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The authorization server reported an error on the callback.
    #[error("authorization denied: {0}")]
    AuthorizationDenied(String),

    #[error("invalid_request: callback is missing code or state")]
    InvalidRequest,

    /// Callback state does not match the pending flow (possible CSRF).
    #[error("invalid_state: callback state does not match session")]
    InvalidState,

    #[error("invalid_code: authorization code is malformed")]
    InvalidCode,

    /// The token endpoint answered 2xx with neither a token nor an error.
    #[error("the user denies the request")]
    UserDenied,

    #[error("transport error: {0}")]
    Transport(String),

    /// 2xx response whose body reports an error. Carries the decoded payload.
    #[error("token endpoint error: {0}")]
    Token(serde_json::Value),

    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl Error {
    /// Stable machine-readable code, suitable for an OAuth-style `error` field.
    pub fn code(&self) -> &str {
        match self {
            Error::AuthorizationDenied(reason) => reason,
            Error::InvalidRequest => "invalid_request",
            Error::InvalidState => "invalid_state",
            Error::InvalidCode => "invalid_code",
            Error::UserDenied => "user_denied",
            Error::Transport(_) => "transport_error",
            Error::Token(_) => "token_error",
            Error::Config(_) => "invalid_config",
        }
    }
}

/// Result alias for OAuth client operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_context() {
        assert_eq!(
            Error::AuthorizationDenied("Undefined Error".into()).to_string(),
            "authorization denied: Undefined Error"
        );
        assert!(
            Error::Transport("Unauthorized".into())
                .to_string()
                .contains("Unauthorized")
        );

        let payload = serde_json::json!({"error": "something error"});
        assert!(
            Error::Token(payload).to_string().contains("something error"),
            "token error must render the payload"
        );
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(Error::InvalidRequest.code(), "invalid_request");
        assert_eq!(Error::InvalidState.code(), "invalid_state");
        assert_eq!(Error::InvalidCode.code(), "invalid_code");
        assert_eq!(Error::UserDenied.code(), "user_denied");
        assert_eq!(Error::Transport("x".into()).code(), "transport_error");
        assert_eq!(Error::Token(serde_json::Value::Null).code(), "token_error");
        assert_eq!(
            Error::AuthorizationDenied("access_denied".into()).code(),
            "access_denied"
        );
    }

    #[test]
    fn error_debug_includes_variant() {
        let debug = format!("{:?}", Error::InvalidState);
        assert!(
            debug.contains("InvalidState"),
            "Debug should include variant name, got: {debug}"
        );
    }
}
