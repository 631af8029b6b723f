//! Static route table and landing-route selection.
//!
//! The route table is fixed at build time. Its order is significant: when a
//! role can view several features, the earliest entry wins.

use crate::auth::models::{Action, RolePermissions};
use crate::auth::permissions::has_permission;

/// Where users with no viewable feature are sent.
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteEntry {
    pub path: &'static str,
    pub feature_name: &'static str,
}

/// Dashboard pages in landing-priority order.
pub const DASHBOARD_ROUTES: RouteTable = RouteTable::new(&[
    RouteEntry {
        path: "/dashboard",
        feature_name: "Dashboard",
    },
    RouteEntry {
        path: "/calendar",
        feature_name: "Calendar",
    },
    RouteEntry {
        path: "/eventList",
        feature_name: "Events",
    },
    RouteEntry {
        path: "/transactions",
        feature_name: "Transactions",
    },
    RouteEntry {
        path: "/roles",
        feature_name: "Roles",
    },
    RouteEntry {
        path: "/users",
        feature_name: "Users",
    },
    RouteEntry {
        path: "/businessVerification",
        feature_name: "Business Verification",
    },
    RouteEntry {
        path: "/paymentMethods",
        feature_name: "Payment Methods",
    },
    RouteEntry {
        path: "/settings",
        feature_name: "Settings",
    },
]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteTable {
    entries: &'static [RouteEntry],
}

impl Default for RouteTable {
    fn default() -> Self {
        DASHBOARD_ROUTES
    }
}

impl RouteTable {
    pub const fn new(entries: &'static [RouteEntry]) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &'static [RouteEntry] {
        self.entries
    }

    /// Path of the first entry `roles` may view, or [`UNAUTHORIZED_PATH`].
    pub fn first_accessible_route(&self, roles: Option<&RolePermissions>) -> &'static str {
        self.entries
            .iter()
            .find(|entry| has_permission(roles, entry.feature_name, Action::View))
            .map(|entry| entry.path)
            .unwrap_or(UNAUTHORIZED_PATH)
    }

    /// Feature guarding `path`, if the path is in the table.
    pub fn feature_for(&self, path: &str) -> Option<&'static str> {
        self.entry_for(path).map(|entry| entry.feature_name)
    }

    /// Paths outside the table are never viewable.
    pub fn can_view(&self, roles: Option<&RolePermissions>, path: &str) -> bool {
        self.feature_for(path)
            .map(|feature| has_permission(roles, feature, Action::View))
            .unwrap_or(false)
    }

    /// The last visited page if it is still viewable, otherwise the first
    /// accessible route.
    pub fn landing_route(
        &self,
        roles: Option<&RolePermissions>,
        last_visited: Option<&str>,
    ) -> &'static str {
        last_visited
            .and_then(|path| self.entry_for(path))
            .filter(|entry| has_permission(roles, entry.feature_name, Action::View))
            .map(|entry| entry.path)
            .unwrap_or_else(|| self.first_accessible_route(roles))
    }

    /// Distinct feature names, in table order.
    pub fn features(&self) -> Vec<&'static str> {
        let mut features: Vec<&'static str> = Vec::with_capacity(self.entries.len());
        for entry in self.entries {
            if !features.contains(&entry.feature_name) {
                features.push(entry.feature_name);
            }
        }
        features
    }

    fn entry_for(&self, path: &str) -> Option<&'static RouteEntry> {
        self.entries.iter().find(|entry| entry.path == path)
    }
}

/// [`RouteTable::first_accessible_route`] over the dashboard table.
pub fn first_accessible_route(roles: Option<&RolePermissions>) -> &'static str {
    DASHBOARD_ROUTES.first_accessible_route(roles)
}
