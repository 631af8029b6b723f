//! Routes for the current user, mounted under `/api/user`.

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{check_permission, gates, landing, me, record_visit};
use crate::server::AppState;

pub fn user_router() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/permissions", get(check_permission))
        .route("/gates", get(gates))
        .route("/landing", get(landing))
        .route("/visit", post(record_visit))
}
