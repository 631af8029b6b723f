//! Custom error types specific to authentication failures.
//!
//! Gateway failures during bootstrap never surface here: they become a
//! `Failed` session state. These errors cover the cases a caller has to act
//! on directly.

use thiserror::Error;
use ticketdash_adapters::AdapterError;

#[derive(Debug, Error)]
pub enum AuthError {
    /// The request carried no usable credential.
    #[error("no credential presented")]
    MissingCredential,

    /// The credential has no authenticated session behind it.
    #[error("session is not authenticated")]
    Unauthenticated,

    /// Local state was cleared but the remote API refused to end its session.
    #[error("remote logout failed: {0}")]
    RemoteLogout(#[source] AdapterError),
}
