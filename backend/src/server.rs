//! HTTP server wiring: shared state, router assembly and the serve loop.

use std::sync::Arc;

use axum::middleware::from_fn;
use axum::routing::get;
use axum::Router;
use ticketdash_adapters::ApiGateway;
use tracing::{info, warn};

use crate::api::api_router;
use crate::auth::middleware::CookieNames;
use crate::auth::models::Credential;
use crate::auth::routes::auth_router;
use crate::auth::service::SessionProvider;
use crate::config::BackendConfig;
use crate::errors::AppError;
use crate::middleware::log_requests;
use crate::services::session_registry::SessionRegistry;

/// Shared state for handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
    pub cookies: Arc<CookieNames>,
}

impl AppState {
    pub fn new(gateway: Arc<dyn ApiGateway>, cookies: CookieNames) -> Self {
        Self {
            sessions: Arc::new(SessionRegistry::new(gateway)),
            cookies: Arc::new(cookies),
        }
    }

    /// State with the session limits from `config`.
    pub fn from_config(gateway: Arc<dyn ApiGateway>, config: &BackendConfig) -> Self {
        let registry = SessionRegistry::new(gateway)
            .with_idle_timeout(config.session_idle_timeout())
            .with_max_sessions(config.max_sessions);
        Self {
            sessions: Arc::new(registry),
            cookies: Arc::new(CookieNames::from(config)),
        }
    }

    /// Existing provider for the request's credential, if any.
    pub fn provider(&self, credential: Option<&Credential>) -> Option<Arc<SessionProvider>> {
        credential.and_then(|credential| self.sessions.get(credential))
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/healthz", get(|| async { "ok" }))
        .nest("/auth", auth_router())
        .nest("/api", api_router())
        .layer(from_fn(log_requests))
        .with_state(state)
}

async fn root_handler() -> &'static str {
    "Welcome to Ticketdash!"
}

/// Bind `config.listen_addr` and serve until Ctrl-C.
pub async fn serve(config: &BackendConfig, state: AppState) -> Result<(), AppError> {
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .map_err(|err| AppError::Internal(format!("cannot bind {}: {err}", config.listen_addr)))?;

    info!(addr = %config.listen_addr, api = %config.api_base_url, "Listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
