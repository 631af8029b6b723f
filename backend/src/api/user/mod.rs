//! Module for the current user's profile and access decisions.
//!
//! Everything here reads the session provider for the request's credential
//! and never calls the remote API.

pub mod handlers;
pub mod routes;
