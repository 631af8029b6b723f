//! Authentication module for sessions and access control.
//!
//! This module provides the session lifecycle, the permission lookup the
//! view layer gates on, verification-state derivation, and the HTTP surface
//! for bootstrapping and ending sessions.

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod permissions;
pub mod routes;
pub mod service;
pub mod verification;

// Re-exports for convenience
pub use errors::*;
pub use middleware::{CookieNames, MaybeCredential};
pub use models::*;
pub use permissions::{gate_map, has_permission, has_permission_raw, normalize_role_data};
pub use routes::auth_router;
pub use service::*;
pub use verification::is_fully_verified;
