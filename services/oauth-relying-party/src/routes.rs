//! OAuth flow handlers
//!
//! Thin adapters between HTTP and `OAuthClient`: they resolve the caller's
//! session from the cookie, call the client, and apply its answer (redirect,
//! JSON body, or error response).

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use oauth_client::{
    CallbackParams, Error as OAuthError, MemorySession, Session, TokenSet, session as keys,
};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::AppState;
use crate::error::{Error, Result};
use crate::sessions::SESSION_COOKIE;

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub scope: Option<String>,
}

fn session_id(jar: &CookieJar) -> Option<Uuid> {
    jar.get(SESSION_COOKIE)
        .and_then(|c| Uuid::parse_str(c.value()).ok())
}

/// Session for an existing cookie, or an empty throwaway one.
///
/// A missing session is not an error here: the client's state check reports
/// it, after the cheaper parameter checks.
fn existing_session(state: &AppState, id: Option<Uuid>) -> Arc<MemorySession> {
    id.and_then(|id| state.sessions.get(id)).unwrap_or_default()
}

/// Start a login: record the pending flow and redirect to the authorization server.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<LoginQuery>,
) -> Response {
    let (id, session) = state.sessions.get_or_create(session_id(&jar));
    let scope = query.scope.as_deref().unwrap_or(&state.default_scope);

    let request = state
        .client
        .begin_authorization(session.as_ref(), scope, None, None);
    info!(session = %id, scope, "redirecting to authorization server");

    let cookie = Cookie::build((SESSION_COOKIE, id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    (
        StatusCode::FOUND,
        jar.add(cookie),
        [(header::LOCATION, request.location.to_string())],
    )
        .into_response()
}

/// Complete the flow with the authorization server's redirect parameters.
///
/// A flow the user or server declined is over; unless the session still holds
/// tokens from an earlier login it is dropped from the registry.
pub async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<Json<TokenSet>> {
    let id = session_id(&jar);
    let session = existing_session(&state, id);
    let result = state
        .client
        .complete_authorization(session.as_ref(), &params)
        .await;

    let declined = matches!(
        result,
        Err(OAuthError::AuthorizationDenied(_) | OAuthError::UserDenied)
    );
    if let Some(id) = id.filter(|_| declined && session.get(keys::ACCESS_TOKEN).is_none()) {
        state.sessions.remove(id);
        debug!(session = %id, "dropped session of declined flow");
    }

    Ok(Json(result?))
}

/// Renew the session's tokens.
pub async fn refresh(State(state): State<AppState>, jar: CookieJar) -> Result<Json<TokenSet>> {
    let session = existing_session(&state, session_id(&jar));
    let refresh_token = session
        .get(keys::REFRESH_TOKEN)
        .ok_or(Error::MissingRefreshToken)?;
    let tokens = state
        .client
        .refresh(session.as_ref(), &refresh_token)
        .await?;
    Ok(Json(tokens))
}

/// Check the session's access token against the verify endpoint.
pub async fn verify(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<serde_json::Value>> {
    let session = existing_session(&state, session_id(&jar));
    let access_token = session
        .get(keys::ACCESS_TOKEN)
        .ok_or(Error::NotSignedIn)?;
    let status = state.client.verify(&access_token).await?;
    Ok(Json(serde_json::json!({ "status": status })))
}
