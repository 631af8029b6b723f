//! Defines the HTTP routes specifically for session handling.
//!
//! Mounted under `/auth` by the server.

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{bootstrap_session, get_session, logout};
use crate::server::AppState;

pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/session", get(get_session).post(bootstrap_session))
        .route("/logout", post(logout))
}
