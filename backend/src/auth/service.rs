//! Session lifecycle for one browser credential.
//!
//! [`SessionProvider`] owns the only mutable session state. It moves through
//! `Unauthenticated -> Loading -> {Authenticated, Failed}` on bootstrap and
//! back to `Unauthenticated` on logout. Readers always get a whole snapshot:
//! an authenticated [`Session`] is installed in one write once the identity
//! fetch resolves, never field by field.
//!
//! Every transition bumps a generation counter. A bootstrap only installs its
//! result if the generation is still the one it started with, so a logout
//! that lands while the fetch is in flight cannot be undone by the fetch
//! completing afterwards.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use ticketdash_adapters::{AdapterError, ApiGateway};
use tracing::{debug, info, warn};

use super::errors::AuthError;
use super::models::{Action, Credential, Identity, Session};
use super::permissions::{gate_map, has_permission, Gates};
use super::verification::is_fully_verified;
use crate::navigation::RouteTable;
use crate::services::session_registry::short_fingerprint;

/// Why a bootstrap ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionFailure {
    /// `transport`, `rejected`, `malformed`, `config` or `cancelled`.
    pub kind: &'static str,
    pub status: Option<u16>,
    pub message: String,
}

impl SessionFailure {
    /// The bootstrap was dropped before its identity fetch resolved.
    pub fn cancelled() -> Self {
        Self {
            kind: "cancelled",
            status: None,
            message: "identity fetch abandoned before it resolved".to_string(),
        }
    }
}

impl From<&AdapterError> for SessionFailure {
    fn from(err: &AdapterError) -> Self {
        Self {
            kind: err.kind(),
            status: err.status(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Loading,
    Authenticated(Arc<Session>),
    Failed(SessionFailure),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Unauthenticated,
    Loading,
    Authenticated,
    Failed,
}

impl SessionState {
    pub fn status(&self) -> SessionStatus {
        match self {
            SessionState::Unauthenticated => SessionStatus::Unauthenticated,
            SessionState::Loading => SessionStatus::Loading,
            SessionState::Authenticated(_) => SessionStatus::Authenticated,
            SessionState::Failed(_) => SessionStatus::Failed,
        }
    }

    /// The session, only when authenticated.
    pub fn session(&self) -> Option<&Arc<Session>> {
        match self {
            SessionState::Authenticated(session) => Some(session),
            _ => None,
        }
    }
}

/// Everything the view layer needs, derived from one consistent read.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub identity: Option<Identity>,
    pub role_name: Option<String>,
    pub verified: bool,
    pub landing: &'static str,
    pub gates: Gates,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<SessionFailure>,
}

impl SessionSnapshot {
    fn from_state(state: &SessionState, routes: &RouteTable, last_visited: Option<&str>) -> Self {
        let session = state.session();
        let roles = session.map(|session| session.permissions());
        Self {
            status: state.status(),
            identity: session.map(|session| session.identity().clone()),
            role_name: session.and_then(|session| session.role_name().map(str::to_string)),
            verified: session
                .map(|session| is_fully_verified(session.identity()))
                .unwrap_or(false),
            landing: routes.landing_route(roles, last_visited),
            gates: gate_map(roles, routes.features()),
            failure: match state {
                SessionState::Failed(failure) => Some(failure.clone()),
                _ => None,
            },
        }
    }

    /// Snapshot for a browser with no session at all.
    pub fn unauthenticated(routes: &RouteTable) -> Self {
        Self::from_state(&SessionState::Unauthenticated, routes, None)
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: SessionState,
    generation: u64,
    credential: Option<Credential>,
    last_visited: Option<String>,
}

impl Inner {
    /// Move to `state`, invalidating any bootstrap still in flight.
    fn transition(&mut self, state: SessionState) -> u64 {
        self.generation += 1;
        self.state = state;
        self.generation
    }
}

/// Settles a bootstrap whose future is dropped mid-fetch, so the provider
/// never stays `Loading` with nothing in flight.
struct InFlight<'a> {
    inner: &'a RwLock<Inner>,
    generation: u64,
    settled: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut inner = self.inner.write();
        if inner.generation == self.generation {
            warn!(generation = self.generation, "Bootstrap dropped before identity fetch resolved");
            inner.transition(SessionState::Failed(SessionFailure::cancelled()));
        }
    }
}

/// Injectable session context for one credential.
pub struct SessionProvider {
    gateway: Arc<dyn ApiGateway>,
    routes: RouteTable,
    inner: RwLock<Inner>,
}

impl SessionProvider {
    pub fn new(gateway: Arc<dyn ApiGateway>) -> Self {
        Self {
            gateway,
            routes: RouteTable::default(),
            inner: RwLock::new(Inner::default()),
        }
    }

    pub fn with_routes(mut self, routes: RouteTable) -> Self {
        self.routes = routes;
        self
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn state(&self) -> SessionState {
        self.inner.read().state.clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.read().state.status()
    }

    /// The authenticated session, if there is one right now.
    pub fn session(&self) -> Option<Arc<Session>> {
        self.inner.read().state.session().cloned()
    }

    /// Bootstrap from `credential`.
    ///
    /// With no credential the provider becomes unauthenticated and `None` is
    /// returned without contacting the remote API. Otherwise exactly one
    /// identity fetch is made; failures leave the provider `Failed` and are
    /// not retried. If the returned future is dropped before the fetch
    /// resolves, the provider settles as `Failed` with kind `cancelled`.
    pub async fn load_session(&self, credential: Option<Credential>) -> Option<Arc<Session>> {
        let Some(credential) = credential else {
            let mut inner = self.inner.write();
            inner.transition(SessionState::Unauthenticated);
            inner.credential = None;
            return None;
        };

        let fingerprint = short_fingerprint(credential.token());
        let generation = {
            let mut inner = self.inner.write();
            inner.credential = Some(credential.clone());
            inner.transition(SessionState::Loading)
        };

        let mut in_flight = InFlight {
            inner: &self.inner,
            generation,
            settled: false,
        };

        debug!(token = %fingerprint, generation, "Bootstrapping session");
        let outcome = self.gateway.fetch_identity(&credential).await;
        in_flight.settled = true;

        let mut inner = self.inner.write();
        if inner.generation != generation {
            debug!(
                token = %fingerprint,
                generation,
                current = inner.generation,
                "Discarding superseded identity fetch"
            );
            return None;
        }

        match outcome {
            Ok(envelope) => {
                let session = Arc::new(Session::from_wire(&envelope.into_user()));
                info!(
                    token = %fingerprint,
                    user = %session.identity().id,
                    role = session.role_name().unwrap_or("-"),
                    features = session.permissions().features.len(),
                    "Session authenticated"
                );
                inner.transition(SessionState::Authenticated(Arc::clone(&session)));
                Some(session)
            }
            Err(err) => {
                warn!(token = %fingerprint, error = %err, "Session bootstrap failed");
                inner.transition(SessionState::Failed(SessionFailure::from(&err)));
                None
            }
        }
    }

    /// Clear local state, then ask the remote API to end its session.
    ///
    /// Local state is gone even when the remote call fails.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let credential = {
            let mut inner = self.inner.write();
            inner.transition(SessionState::Unauthenticated);
            inner.last_visited = None;
            inner.credential.take()
        };

        let Some(credential) = credential else {
            return Ok(());
        };

        info!(token = %short_fingerprint(credential.token()), "Logging out");
        self.gateway
            .logout(&credential)
            .await
            .map_err(AuthError::RemoteLogout)
    }

    /// Denies everything unless authenticated.
    pub fn has_permission(&self, feature_name: &str, action: Action) -> bool {
        let session = self.session();
        has_permission(
            session.as_deref().map(Session::permissions),
            feature_name,
            action,
        )
    }

    pub fn first_accessible_route(&self) -> &'static str {
        let session = self.session();
        self.routes
            .first_accessible_route(session.as_deref().map(Session::permissions))
    }

    pub fn landing_route(&self) -> &'static str {
        let inner = self.inner.read();
        let roles = inner.state.session().map(|session| session.permissions());
        self.routes
            .landing_route(roles, inner.last_visited.as_deref())
    }

    pub fn gates(&self) -> Gates {
        let session = self.session();
        gate_map(
            session.as_deref().map(Session::permissions),
            self.routes.features(),
        )
    }

    pub fn is_fully_verified(&self) -> bool {
        self.session()
            .map(|session| is_fully_verified(session.identity()))
            .unwrap_or(false)
    }

    /// Remember `path` as the last visited page. Only recorded while
    /// authenticated; returns whether it was kept.
    pub fn record_visit(&self, path: &str) -> bool {
        let mut inner = self.inner.write();
        if inner.state.session().is_none() {
            return false;
        }
        inner.last_visited = Some(path.to_string());
        true
    }

    pub fn last_visited(&self) -> Option<String> {
        self.inner.read().last_visited.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.read();
        SessionSnapshot::from_state(&inner.state, &self.routes, inner.last_visited.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::navigation::UNAUTHORIZED_PATH;
    use serde_json::json;
    use ticketdash_adapters::{MemoryGateway, UserEnvelope};

    fn envelope(value: serde_json::Value) -> UserEnvelope {
        serde_json::from_value(json!({"data": {"user": value}})).unwrap()
    }

    fn events_admin() -> UserEnvelope {
        envelope(json!({
            "_id": "u-1",
            "email": "ops@example.com",
            "emailVerified": true,
            "phoneVerificationStatus": "verified",
            "roles": [{
                "roleName": "Admin",
                "rolePermissions": [
                    {"featureName": "Events", "permissions": [
                        {"permissionName": "View"}, {"permissionName": "Edit"}
                    ]}
                ]
            }]
        }))
    }

    fn credential(token: &str) -> Credential {
        Credential::new(token).with_user_id("u-1")
    }

    fn provider_with(gateway: &Arc<MemoryGateway>) -> SessionProvider {
        SessionProvider::new(Arc::clone(gateway) as Arc<dyn ApiGateway>)
    }

    #[tokio::test]
    async fn no_credential_stays_unauthenticated_without_fetching() {
        let gateway = Arc::new(MemoryGateway::new());
        let provider = provider_with(&gateway);

        assert!(provider.load_session(None).await.is_none());
        assert_eq!(provider.status(), SessionStatus::Unauthenticated);
        assert_eq!(gateway.fetch_count(), 0);
        assert!(!provider.has_permission("Events", Action::View));
        assert_eq!(provider.first_accessible_route(), UNAUTHORIZED_PATH);
    }

    #[tokio::test]
    async fn successful_bootstrap_authenticates() {
        let gateway = Arc::new(MemoryGateway::new());
        gateway.insert_user("t1", events_admin());
        let provider = provider_with(&gateway);

        let session = provider.load_session(Some(credential("t1"))).await;
        assert!(session.is_some());
        assert_eq!(gateway.fetch_count(), 1);
        assert_eq!(provider.status(), SessionStatus::Authenticated);
        assert!(provider.has_permission("Events", Action::Edit));
        assert!(!provider.has_permission("Events", Action::Delete));
        assert_eq!(provider.first_accessible_route(), "/eventList");
        assert!(provider.is_fully_verified());
    }

    #[tokio::test]
    async fn server_error_fails_closed() {
        let gateway = Arc::new(MemoryGateway::new());
        gateway.insert_user("t1", events_admin());
        let provider = provider_with(&gateway);
        provider.load_session(Some(credential("t1"))).await;
        assert!(provider.has_permission("Events", Action::View));

        // Same provider, new page load, remote now failing.
        gateway.fail_with("t1", 500);
        assert!(provider.load_session(Some(credential("t1"))).await.is_none());

        match provider.state() {
            SessionState::Failed(failure) => {
                assert_eq!(failure.status, Some(500));
                assert_eq!(failure.kind, "rejected");
            }
            other => panic!("expected failed state, got {other:?}"),
        }
        assert!(!provider.has_permission("Events", Action::View));
        assert!(!provider.is_fully_verified());
        assert_eq!(gateway.fetch_count(), 2);
    }

    #[tokio::test]
    async fn checks_deny_while_loading() {
        let gateway = Arc::new(MemoryGateway::new());
        gateway.insert_user("t1", events_admin());
        gateway.hold_fetches();
        let provider = Arc::new(provider_with(&gateway));

        let task = {
            let provider = Arc::clone(&provider);
            tokio::spawn(async move { provider.load_session(Some(credential("t1"))).await })
        };
        while gateway.fetch_count() == 0 {
            tokio::task::yield_now().await;
        }

        assert_eq!(provider.status(), SessionStatus::Loading);
        assert!(!provider.has_permission("Events", Action::View));
        assert_eq!(provider.snapshot().landing, UNAUTHORIZED_PATH);

        gateway.release_fetches();
        assert!(task.await.unwrap().is_some());
        assert!(provider.has_permission("Events", Action::View));
    }

    #[tokio::test]
    async fn logout_during_fetch_discards_the_result() {
        let gateway = Arc::new(MemoryGateway::new());
        gateway.insert_user("t1", events_admin());
        gateway.hold_fetches();
        let provider = Arc::new(provider_with(&gateway));

        let task = {
            let provider = Arc::clone(&provider);
            tokio::spawn(async move { provider.load_session(Some(credential("t1"))).await })
        };
        while gateway.fetch_count() == 0 {
            tokio::task::yield_now().await;
        }

        provider.logout().await.unwrap();
        assert_eq!(gateway.logged_out(), vec!["t1".to_string()]);

        gateway.release_fetches();
        assert!(task.await.unwrap().is_none());
        assert_eq!(provider.status(), SessionStatus::Unauthenticated);
        assert!(provider.session().is_none());
        assert!(!provider.has_permission("Events", Action::View));
    }

    #[tokio::test]
    async fn abandoned_bootstrap_settles_as_cancelled() {
        let gateway = Arc::new(MemoryGateway::new());
        gateway.insert_user("t1", events_admin());
        gateway.hold_fetches();
        let provider = provider_with(&gateway);

        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            provider.load_session(Some(credential("t1"))),
        )
        .await;
        assert!(abandoned.is_err());

        match provider.state() {
            SessionState::Failed(failure) => {
                assert_eq!(failure.kind, "cancelled");
                assert_eq!(failure.status, None);
            }
            other => panic!("expected cancelled failure, got {other:?}"),
        }
        assert!(!provider.has_permission("Events", Action::View));

        // The next page load bootstraps normally.
        gateway.release_fetches();
        assert!(provider.load_session(Some(credential("t1"))).await.is_some());
        assert_eq!(provider.status(), SessionStatus::Authenticated);
    }

    #[tokio::test]
    async fn abandoned_bootstrap_after_logout_stays_unauthenticated() {
        let gateway = Arc::new(MemoryGateway::new());
        gateway.insert_user("t1", events_admin());
        gateway.hold_fetches();
        let provider = Arc::new(provider_with(&gateway));

        let task = {
            let provider = Arc::clone(&provider);
            tokio::spawn(async move { provider.load_session(Some(credential("t1"))).await })
        };
        while gateway.fetch_count() == 0 {
            tokio::task::yield_now().await;
        }

        provider.logout().await.unwrap();
        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        assert_eq!(provider.status(), SessionStatus::Unauthenticated);
    }

    #[tokio::test]
    async fn logout_clears_state_even_if_remote_fails() {
        let gateway = Arc::new(MemoryGateway::new());
        gateway.insert_user("t1", events_admin());
        gateway.fail_logout(true);
        let provider = provider_with(&gateway);
        provider.load_session(Some(credential("t1"))).await;
        assert!(provider.record_visit("/eventList"));

        let result = provider.logout().await;
        assert!(matches!(result, Err(AuthError::RemoteLogout(_))));
        assert_eq!(provider.status(), SessionStatus::Unauthenticated);
        assert_eq!(provider.last_visited(), None);

        // A second logout has nothing left to invalidate remotely.
        provider.logout().await.unwrap();
        assert_eq!(gateway.logged_out().len(), 1);
    }

    #[tokio::test]
    async fn record_visit_drives_landing_route() {
        let gateway = Arc::new(MemoryGateway::new());
        gateway.insert_user(
            "t1",
            envelope(json!({
                "_id": "u-1",
                "roles": [{"rolePermissions": [
                    {"featureName": "Events", "permissions": ["View"]},
                    {"featureName": "Settings", "permissions": ["View"]}
                ]}]
            })),
        );
        let provider = provider_with(&gateway);

        assert!(!provider.record_visit("/settings"));
        provider.load_session(Some(credential("t1"))).await;
        assert_eq!(provider.landing_route(), "/eventList");

        assert!(provider.record_visit("/settings"));
        assert_eq!(provider.landing_route(), "/settings");

        provider.record_visit("/roles");
        assert_eq!(provider.landing_route(), "/eventList");
    }

    #[tokio::test]
    async fn snapshot_is_consistent() {
        let gateway = Arc::new(MemoryGateway::new());
        gateway.insert_user("t1", events_admin());
        let provider = provider_with(&gateway);

        let before = provider.snapshot();
        assert_eq!(before, SessionSnapshot::unauthenticated(provider.routes()));
        assert!(before.gates.values().all(|gates| !gates.view));

        provider.load_session(Some(credential("t1"))).await;
        let after = provider.snapshot();
        assert_eq!(after.status, SessionStatus::Authenticated);
        assert_eq!(after.role_name.as_deref(), Some("Admin"));
        assert!(after.verified);
        assert_eq!(after.landing, "/eventList");
        assert!(after.gates["Events"].edit);
        assert!(!after.gates["Settings"].view);
        assert!(after.failure.is_none());
    }
}
