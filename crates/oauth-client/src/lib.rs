//! OAuth 2.0 authorization code + PKCE client
//!
//! Obtains, renews and verifies access tokens on behalf of a user against a
//! remote authorization server. The HTTP transport and the per-user-agent
//! session are injected collaborators; this crate holds no global state.
//!
//! Flow:
//! 1. Caller builds a `ClientConfig` and an `OAuthClient` once
//! 2. `OAuthClient::begin_authorization()` stores state + PKCE values in the session
//!    and returns the redirect target
//! 3. Authorization server redirects back with `state` and `code`
//! 4. `OAuthClient::complete_authorization()` validates and exchanges the code
//! 5. `OAuthClient::refresh()` / `OAuthClient::verify()` on demand

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod pkce;
pub mod session;
pub mod token;

pub use client::{AuthorizationRequest, CallbackParams, OAuthClient};
pub use config::{ClientConfig, CodePolicy};
pub use error::{Error, Result};
pub use http::{HttpClient, HttpResponse, ReqwestHttp};
pub use pkce::{PkcePair, compute_challenge, generate_pkce, generate_state};
pub use session::{MemorySession, Session};
pub use token::TokenSet;
