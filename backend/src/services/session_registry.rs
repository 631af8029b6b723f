//! Registry of live sessions, one [`SessionProvider`] per browser credential.
//!
//! Providers are keyed by the SHA-256 fingerprint of the session token so the
//! raw token is never stored as a map key or written to logs.
//!
//! The registry stays bounded: failed bootstraps are dropped, entries idle
//! longer than the idle timeout are swept whenever a new credential arrives,
//! and once `max_sessions` is reached the least recently used entry makes
//! room.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use ticketdash_adapters::ApiGateway;
use tracing::debug;

use crate::auth::errors::AuthError;
use crate::auth::models::Credential;
use crate::auth::service::{SessionProvider, SessionStatus};
use crate::navigation::RouteTable;

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// Hex SHA-256 of a session token.
pub fn token_fingerprint(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// First 12 hex characters of the fingerprint, for log fields.
pub fn short_fingerprint(token: &str) -> String {
    let mut fingerprint = token_fingerprint(token);
    fingerprint.truncate(12);
    fingerprint
}

struct Tracked {
    provider: Arc<SessionProvider>,
    last_seen: Instant,
}

pub struct SessionRegistry {
    gateway: Arc<dyn ApiGateway>,
    routes: RouteTable,
    idle_timeout: Duration,
    max_sessions: usize,
    sessions: DashMap<String, Tracked>,
}

impl SessionRegistry {
    pub fn new(gateway: Arc<dyn ApiGateway>) -> Self {
        Self {
            gateway,
            routes: RouteTable::default(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            max_sessions: DEFAULT_MAX_SESSIONS,
            sessions: DashMap::new(),
        }
    }

    pub fn with_routes(mut self, routes: RouteTable) -> Self {
        self.routes = routes;
        self
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// At least one session is always kept.
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions.max(1);
        self
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Provider for `credential`, created unauthenticated if absent.
    pub fn provider_for(&self, credential: &Credential) -> Arc<SessionProvider> {
        let key = token_fingerprint(credential.token());
        if let Some(mut tracked) = self.sessions.get_mut(&key) {
            tracked.last_seen = Instant::now();
            return Arc::clone(&tracked.provider);
        }

        self.make_room();
        let tracked = self.sessions.entry(key).or_insert_with(|| {
            debug!(token = %short_fingerprint(credential.token()), "Creating session provider");
            Tracked {
                provider: Arc::new(
                    SessionProvider::new(Arc::clone(&self.gateway)).with_routes(self.routes),
                ),
                last_seen: Instant::now(),
            }
        });
        Arc::clone(&tracked.provider)
    }

    /// Bootstrap the session for `credential`. A bootstrap that fails is not
    /// kept; the returned provider still reports the failure.
    pub async fn bootstrap(&self, credential: Credential) -> Arc<SessionProvider> {
        let provider = self.provider_for(&credential);
        provider.load_session(Some(credential.clone())).await;

        if provider.status() == SessionStatus::Failed {
            let key = token_fingerprint(credential.token());
            let evicted = self
                .sessions
                .remove_if(&key, |_, tracked| Arc::ptr_eq(&tracked.provider, &provider));
            if evicted.is_some() {
                debug!(token = %short_fingerprint(credential.token()), "Dropped failed session");
            }
        }
        provider
    }

    /// Live provider for `credential`, without creating one. Idle or failed
    /// entries are dropped on the way.
    pub fn get(&self, credential: &Credential) -> Option<Arc<SessionProvider>> {
        let key = token_fingerprint(credential.token());
        let live = {
            let mut tracked = self.sessions.get_mut(&key)?;
            let live = !self.is_stale(&tracked);
            if live {
                tracked.last_seen = Instant::now();
            }
            live.then(|| Arc::clone(&tracked.provider))
        };
        if live.is_none() {
            self.sessions.remove_if(&key, |_, tracked| self.is_stale(tracked));
        }
        live
    }

    pub fn remove(&self, credential: &Credential) -> Option<Arc<SessionProvider>> {
        self.sessions
            .remove(&token_fingerprint(credential.token()))
            .map(|(_, tracked)| tracked.provider)
    }

    /// End the session for `credential`: drop its provider and ask the remote
    /// API to invalidate it. Without a local provider the remote call is still
    /// made.
    pub async fn logout(&self, credential: &Credential) -> Result<(), AuthError> {
        match self.remove(credential) {
            Some(provider) => provider.logout().await,
            None => self
                .gateway
                .logout(credential)
                .await
                .map_err(AuthError::RemoteLogout),
        }
    }

    /// Drop every idle or failed entry; returns how many went.
    pub fn sweep(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, tracked| !self.is_stale(tracked));
        let swept = before.saturating_sub(self.sessions.len());
        if swept > 0 {
            debug!(swept, remaining = self.sessions.len(), "Swept stale sessions");
        }
        swept
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn is_stale(&self, tracked: &Tracked) -> bool {
        tracked.last_seen.elapsed() >= self.idle_timeout
            || tracked.provider.status() == SessionStatus::Failed
    }

    fn make_room(&self) {
        self.sweep();
        while self.sessions.len() >= self.max_sessions {
            let oldest = self
                .sessions
                .iter()
                .min_by_key(|entry| entry.value().last_seen)
                .map(|entry| entry.key().clone());
            let Some(key) = oldest else {
                break;
            };
            self.sessions.remove(&key);
            debug!(token = %&key[..12], "Evicted least recently used session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticketdash_adapters::MemoryGateway;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(Arc::new(MemoryGateway::new()))
    }

    #[test]
    fn fingerprint_is_stable_hex() {
        let a = token_fingerprint("token-a");
        assert_eq!(a.len(), 64);
        assert_eq!(a, token_fingerprint("token-a"));
        assert_ne!(a, token_fingerprint("token-b"));
        assert_eq!(short_fingerprint("token-a"), a[..12]);
    }

    #[test]
    fn same_token_shares_a_provider() {
        let registry = registry();
        let first = registry.provider_for(&Credential::new("t1").with_user_id("u-1"));
        let second = registry.provider_for(&Credential::new("t1"));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn distinct_tokens_are_isolated() {
        let registry = registry();
        let a = registry.provider_for(&Credential::new("t1"));
        let b = registry.provider_for(&Credential::new("t2"));
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn get_does_not_create_and_remove_drops() {
        let registry = registry();
        let cred = Credential::new("t1");
        assert!(registry.get(&cred).is_none());
        assert!(registry.is_empty());

        registry.provider_for(&cred);
        assert!(registry.get(&cred).is_some());
        assert!(registry.remove(&cred).is_some());
        assert!(registry.get(&cred).is_none());
    }

    #[tokio::test]
    async fn logout_without_provider_still_reaches_remote() {
        let gateway = Arc::new(MemoryGateway::new());
        let registry = SessionRegistry::new(Arc::clone(&gateway) as Arc<dyn ApiGateway>);

        registry.logout(&Credential::new("t9")).await.unwrap();
        assert_eq!(gateway.logged_out(), vec!["t9".to_string()]);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn failed_bootstrap_is_not_kept() {
        let gateway = Arc::new(MemoryGateway::new());
        let registry = SessionRegistry::new(Arc::clone(&gateway) as Arc<dyn ApiGateway>);
        let cred = Credential::new("unknown").with_user_id("u-1");

        let provider = registry.bootstrap(cred.clone()).await;
        assert_eq!(provider.status(), SessionStatus::Failed);
        assert!(registry.is_empty());
        assert!(registry.get(&cred).is_none());
    }

    #[test]
    fn idle_entries_are_swept_when_a_new_credential_arrives() {
        let registry = registry().with_idle_timeout(Duration::ZERO);
        let first = Credential::new("t1");
        registry.provider_for(&first);

        registry.provider_for(&Credential::new("t2"));
        assert_eq!(registry.len(), 1);
        assert!(registry.get(&first).is_none());
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let registry = registry().with_max_sessions(2);
        let (a, b, c) = (Credential::new("a"), Credential::new("b"), Credential::new("c"));

        registry.provider_for(&a);
        std::thread::sleep(Duration::from_millis(2));
        registry.provider_for(&b);
        std::thread::sleep(Duration::from_millis(2));
        // Touching `a` makes `b` the oldest.
        assert!(registry.get(&a).is_some());
        std::thread::sleep(Duration::from_millis(2));
        registry.provider_for(&c);

        assert_eq!(registry.len(), 2);
        assert!(registry.get(&a).is_some());
        assert!(registry.get(&b).is_none());
        assert!(registry.get(&c).is_some());
    }

    #[tokio::test]
    async fn logout_removes_provider() {
        let gateway = Arc::new(MemoryGateway::new());
        gateway.fail_with("t1", 401);
        let registry = SessionRegistry::new(Arc::clone(&gateway) as Arc<dyn ApiGateway>);
        let cred = Credential::new("t1").with_user_id("u-1");

        let provider = registry.provider_for(&cred);
        provider.load_session(Some(cred.clone())).await;
        registry.logout(&cred).await.unwrap();

        assert!(registry.get(&cred).is_none());
        assert_eq!(gateway.logged_out(), vec!["t1".to_string()]);
    }
}
