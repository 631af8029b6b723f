//! Handler functions for session-related API endpoints.
//!
//! These functions read the credential off the request, look up or create the
//! matching session provider, and answer with a [`SessionSnapshot`] the view
//! layer renders from.

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::response::{AppendHeaders, IntoResponse};
use axum::Json;
use tracing::warn;

use super::middleware::MaybeCredential;
use super::service::SessionSnapshot;
use crate::server::AppState;

/// `GET /auth/session`: current state without touching the remote API.
pub async fn get_session(
    State(state): State<AppState>,
    MaybeCredential(credential): MaybeCredential,
) -> Json<SessionSnapshot> {
    let snapshot = state
        .provider(credential.as_ref())
        .map(|provider| provider.snapshot())
        .unwrap_or_else(|| SessionSnapshot::unauthenticated(state.sessions.routes()));
    Json(snapshot)
}

/// `POST /auth/session`: bootstrap from the presented credential.
pub async fn bootstrap_session(
    State(state): State<AppState>,
    MaybeCredential(credential): MaybeCredential,
) -> Json<SessionSnapshot> {
    let Some(credential) = credential else {
        return Json(SessionSnapshot::unauthenticated(state.sessions.routes()));
    };

    let provider = state.sessions.bootstrap(credential).await;
    Json(provider.snapshot())
}

/// `POST /auth/logout`: drop the local session, end the remote one, and
/// expire the credential cookies.
pub async fn logout(
    State(state): State<AppState>,
    MaybeCredential(credential): MaybeCredential,
) -> impl IntoResponse {
    if let Some(credential) = credential {
        if let Err(err) = state.sessions.logout(&credential).await {
            warn!(error = %err, "Remote logout failed; local session cleared anyway");
        }
    }

    let [token_cookie, user_cookie] = state.cookies.expired();
    (
        AppendHeaders([(SET_COOKIE, token_cookie), (SET_COOKIE, user_cookie)]),
        Json(SessionSnapshot::unauthenticated(state.sessions.routes())),
    )
}
