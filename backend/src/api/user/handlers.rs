//! Handler functions for user profile and access decision endpoints.
//!
//! Permission, gate and landing answers are fail-closed: a request with no
//! authenticated session gets "denied" rather than an error, so the view
//! layer can render from them unconditionally. Only `me` and `visit` require
//! a session, and `visit` only accepts dashboard routes the role may view.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::middleware::MaybeCredential;
use crate::auth::models::{Action, Credential, Identity, Session};
use crate::auth::permissions::{gate_map, Gates};
use crate::auth::service::SessionProvider;
use crate::auth::AuthError;
use crate::errors::{AppError, Result};
use crate::server::AppState;

fn authenticated(
    state: &AppState,
    credential: Option<&Credential>,
) -> Result<(Arc<SessionProvider>, Arc<Session>)> {
    let credential = credential.ok_or(AuthError::MissingCredential)?;
    let provider = state
        .sessions
        .get(credential)
        .ok_or(AuthError::Unauthenticated)?;
    let session = provider.session().ok_or(AuthError::Unauthenticated)?;
    Ok((provider, session))
}

/// `GET /api/user/me`
pub async fn me(
    State(state): State<AppState>,
    MaybeCredential(credential): MaybeCredential,
) -> Result<Json<Identity>> {
    let (_, session) = authenticated(&state, credential.as_ref())?;
    Ok(Json(session.identity().clone()))
}

#[derive(Debug, Deserialize)]
pub struct PermissionQuery {
    pub feature: String,
    /// Defaults to `View`.
    pub action: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionDecision {
    pub feature: String,
    pub action: String,
    pub allowed: bool,
}

/// `GET /api/user/permissions?feature=Events&action=Edit`
pub async fn check_permission(
    State(state): State<AppState>,
    MaybeCredential(credential): MaybeCredential,
    Query(query): Query<PermissionQuery>,
) -> Json<PermissionDecision> {
    let action = query
        .action
        .unwrap_or_else(|| Action::View.as_str().to_string());

    let allowed = match (action.parse::<Action>(), state.provider(credential.as_ref())) {
        (Ok(parsed), Some(provider)) => provider.has_permission(&query.feature, parsed),
        _ => false,
    };

    Json(PermissionDecision {
        feature: query.feature,
        action,
        allowed,
    })
}

/// `GET /api/user/gates`
pub async fn gates(
    State(state): State<AppState>,
    MaybeCredential(credential): MaybeCredential,
) -> Json<Gates> {
    let gates = match state.provider(credential.as_ref()) {
        Some(provider) => provider.gates(),
        None => gate_map(None, state.sessions.routes().features()),
    };
    Json(gates)
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LandingRoute {
    pub path: String,
}

/// `GET /api/user/landing`
pub async fn landing(
    State(state): State<AppState>,
    MaybeCredential(credential): MaybeCredential,
) -> Json<LandingRoute> {
    let path = match state.provider(credential.as_ref()) {
        Some(provider) => provider.landing_route(),
        None => state.sessions.routes().first_accessible_route(None),
    };
    Json(LandingRoute {
        path: path.to_string(),
    })
}

#[derive(Debug, Deserialize)]
pub struct VisitRequest {
    pub path: String,
}

/// `POST /api/user/visit` with `{"path": "/eventList"}`
pub async fn record_visit(
    State(state): State<AppState>,
    MaybeCredential(credential): MaybeCredential,
    Json(visit): Json<VisitRequest>,
) -> Result<StatusCode> {
    let (provider, session) = authenticated(&state, credential.as_ref())?;
    if visit.path.is_empty() {
        return Err(AppError::BadRequest("path must not be empty".to_string()));
    }
    let routes = provider.routes();
    let Some(feature) = routes.feature_for(&visit.path) else {
        return Err(AppError::BadRequest(format!(
            "{} is not a dashboard route",
            visit.path
        )));
    };
    if !routes.can_view(Some(session.permissions()), &visit.path) {
        return Err(AppError::Forbidden(format!("no View permission on {feature}")));
    }
    if provider.record_visit(&visit.path) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AuthError::Unauthenticated.into())
    }
}
