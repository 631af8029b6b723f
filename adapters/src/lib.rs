//! Core `adapters` crate for abstracting remote ticketing API interactions.
//!
//! This crate defines the [`ApiGateway`] trait, which outlines the calls the
//! dashboard backend makes against the remote REST API (identity fetch and
//! logout), and provides the concrete implementations: [`HttpGateway`] for the
//! real API and [`MemoryGateway`] for tests and local runs.

pub mod errors;
pub mod http;
pub mod memory;
pub mod models;

use async_trait::async_trait;

pub use errors::{AdapterError, Result};
pub use http::HttpGateway;
pub use memory::MemoryGateway;
pub use models::{Credential, UserData, UserEnvelope, WireUser};

/// The remote API as seen by the session layer.
///
/// The remote API is the authoritative source for identity, roles and
/// permissions; the backend only caches what it returns for the duration of a
/// session. Implementations must not retry on their own: a failed call is
/// reported once and the caller decides what to do next.
#[async_trait]
pub trait ApiGateway: Send + Sync {
    /// Fetch the identity (and role payload) the credential belongs to.
    async fn fetch_identity(&self, credential: &Credential) -> Result<UserEnvelope>;

    /// Ask the remote API to invalidate the server-side session.
    async fn logout(&self, credential: &Credential) -> Result<()>;
}
