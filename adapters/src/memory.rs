//! In-process implementation of [`ApiGateway`].
//!
//! Responses are scripted per token. Fetches can be held open with
//! [`MemoryGateway::hold_fetches`] until [`MemoryGateway::release_fetches`] is
//! called, which lets callers reproduce a logout racing an in-flight identity
//! fetch.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::errors::{AdapterError, Result};
use crate::models::{Credential, UserEnvelope};
use crate::ApiGateway;

#[derive(Debug, Clone)]
enum Scripted {
    User(UserEnvelope),
    Failure { status: u16, body: String },
}

pub struct MemoryGateway {
    responses: Mutex<HashMap<String, Scripted>>,
    logged_out: Mutex<Vec<String>>,
    fail_logout: Mutex<bool>,
    fetches: AtomicUsize,
    release_tx: watch::Sender<bool>,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGateway {
    pub fn new() -> Self {
        let (release_tx, _) = watch::channel(true);
        Self {
            responses: Mutex::new(HashMap::new()),
            logged_out: Mutex::new(Vec::new()),
            fail_logout: Mutex::new(false),
            fetches: AtomicUsize::new(0),
            release_tx,
        }
    }

    /// Answer fetches for `token` with `envelope`.
    pub fn insert_user(&self, token: impl Into<String>, envelope: UserEnvelope) {
        self.responses
            .lock()
            .insert(token.into(), Scripted::User(envelope));
    }

    /// Answer fetches for `token` with an HTTP failure.
    pub fn fail_with(&self, token: impl Into<String>, status: u16) {
        self.responses.lock().insert(
            token.into(),
            Scripted::Failure {
                status,
                body: format!("scripted failure {status}"),
            },
        );
    }

    /// Make remote logout calls fail with a 502.
    pub fn fail_logout(&self, fail: bool) {
        *self.fail_logout.lock() = fail;
    }

    /// Park every subsequent fetch until [`release_fetches`](Self::release_fetches).
    pub fn hold_fetches(&self) {
        self.release_tx.send_replace(false);
    }

    pub fn release_fetches(&self) {
        self.release_tx.send_replace(true);
    }

    /// Number of identity fetches started so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Tokens for which remote logout was requested, in call order.
    pub fn logged_out(&self) -> Vec<String> {
        self.logged_out.lock().clone()
    }
}

#[async_trait]
impl ApiGateway for MemoryGateway {
    async fn fetch_identity(&self, credential: &Credential) -> Result<UserEnvelope> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let mut release_rx = self.release_tx.subscribe();
        // The sender lives as long as `self`, so this only errs during teardown.
        let released = release_rx.wait_for(|released| *released).await.is_ok();
        if !released {
            return Err(AdapterError::Transport("gateway shut down".to_string()));
        }

        let scripted = self.responses.lock().get(credential.token()).cloned();
        match scripted {
            Some(Scripted::User(envelope)) => Ok(envelope),
            Some(Scripted::Failure { status, body }) => Err(AdapterError::Status { status, body }),
            None => Err(AdapterError::Status {
                status: 401,
                body: "unknown token".to_string(),
            }),
        }
    }

    async fn logout(&self, credential: &Credential) -> Result<()> {
        self.logged_out.lock().push(credential.token().to_string());
        if *self.fail_logout.lock() {
            return Err(AdapterError::Status {
                status: 502,
                body: "logout unavailable".to_string(),
            });
        }
        Ok(())
    }
}
