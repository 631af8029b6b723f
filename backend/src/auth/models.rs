//! Data structures for authentication-related entities.
//!
//! This module defines the canonical in-memory shapes the session layer works
//! with: the identity, the closed set of permission actions, feature grants,
//! the role they belong to, and the session that ties them together. Wire
//! payloads are converted into these once, at session bootstrap.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ticketdash_adapters::WireUser;

pub use ticketdash_adapters::Credential;

use super::permissions::normalize_user_roles;

/// Operation within a feature. The set is closed: names outside it are never
/// granted.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Action {
    #[default]
    View,
    Create,
    Edit,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::View, Action::Create, Action::Edit, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "View",
            Action::Create => "Create",
            Action::Edit => "Edit",
            Action::Delete => "Delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action: {0}")]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    /// Exact, case-sensitive match against the closed set.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == name)
            .ok_or_else(|| UnknownAction(name.to_string()))
    }
}

/// Grants for one feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturePermission {
    pub feature_name: String,
    pub actions: BTreeSet<Action>,
}

impl FeaturePermission {
    pub fn new(feature_name: impl Into<String>, actions: impl IntoIterator<Item = Action>) -> Self {
        Self {
            feature_name: feature_name.into(),
            actions: actions.into_iter().collect(),
        }
    }

    pub fn allows(&self, action: Action) -> bool {
        self.actions.contains(&action)
    }
}

/// The active role: an optional display name plus its ordered feature grants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RolePermissions {
    pub role_name: Option<String>,
    pub features: Vec<FeaturePermission>,
}

impl RolePermissions {
    pub fn new(role_name: Option<String>, features: Vec<FeaturePermission>) -> Self {
        Self {
            role_name,
            features,
        }
    }

    /// First entry for `feature_name`, if any.
    pub fn feature(&self, feature_name: &str) -> Option<&FeaturePermission> {
        self.features
            .iter()
            .find(|entry| entry.feature_name == feature_name)
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PhoneVerificationStatus {
    /// Wire value `none`: no phone verification was ever started.
    #[serde(rename = "none")]
    NotStarted,
    Pending,
    Verified,
    /// Anything the client does not recognise.
    Unknown,
}

impl PhoneVerificationStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "none" => PhoneVerificationStatus::NotStarted,
            "pending" => PhoneVerificationStatus::Pending,
            "verified" => PhoneVerificationStatus::Verified,
            _ => PhoneVerificationStatus::Unknown,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub email_verified: Option<bool>,
    pub phone_verification_status: Option<PhoneVerificationStatus>,
    pub business_info: Option<Value>,
}

impl From<&WireUser> for Identity {
    fn from(user: &WireUser) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            email_verified: user.email_verified,
            phone_verification_status: user
                .phone_verification_status
                .as_deref()
                .map(PhoneVerificationStatus::parse),
            business_info: user.business_info.clone(),
        }
    }
}

/// A fully-formed authenticated session. Built in one piece from the identity
/// response and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    identity: Identity,
    permissions: RolePermissions,
}

impl Session {
    pub fn new(identity: Identity, permissions: RolePermissions) -> Self {
        Self {
            identity,
            permissions,
        }
    }

    pub fn from_wire(user: &WireUser) -> Self {
        Self::new(Identity::from(user), normalize_user_roles(user))
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn permissions(&self) -> &RolePermissions {
        &self.permissions
    }

    pub fn role_name(&self) -> Option<&str> {
        self.permissions.role_name.as_deref()
    }
}
