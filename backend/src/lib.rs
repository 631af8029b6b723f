//! Ticketdash backend: session and permission resolution for the ticketing
//! admin dashboard.
//!
//! The browser presents its credential; this service fetches the identity
//! from the remote ticketing API once, caches the resolved role for the
//! session, and answers the view layer's gating questions: which page to land
//! on, which features and actions are enabled, and whether the verification
//! banner should show. The remote API stays the authority for every action.

pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod middleware;
pub mod navigation;
pub mod server;
pub mod services;

pub use server::{build_router, AppState};
