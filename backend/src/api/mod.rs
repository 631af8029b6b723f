//! Central module for organizing the application's main API endpoints.
//!
//! This module acts as a top-level container for API domains that read the
//! current session, excluding the session bootstrap and logout routes which
//! live under `auth`.

pub mod user;

use axum::Router;

use crate::server::AppState;

pub fn api_router() -> Router<AppState> {
    Router::new().nest("/user", user::routes::user_router())
}
