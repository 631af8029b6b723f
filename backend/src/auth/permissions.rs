//! Permission lookup and role payload normalization.
//!
//! The remote API has delivered role data in several shapes: a bare list of
//! feature grants, an object wrapping `rolePermissions`, a list of roles, or an
//! object wrapping `roles`. [`normalize_role_data`] folds all of them into a
//! single [`RolePermissions`] so that lookups only ever see one shape.
//! Anything unrecognised normalizes to an empty grant set.
//!
//! Every function here is total. Missing or malformed data denies access.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use ticketdash_adapters::WireUser;
use tracing::debug;

use super::models::{Action, FeaturePermission, RolePermissions};

/// Whether `roles` grants `action` on `feature_name`.
///
/// `None` (no session, or a session still loading) denies everything.
pub fn has_permission(roles: Option<&RolePermissions>, feature_name: &str, action: Action) -> bool {
    roles
        .and_then(|roles| roles.feature(feature_name))
        .map(|feature| feature.allows(action))
        .unwrap_or(false)
}

/// Lookup directly over an unnormalized role payload and a raw action name.
///
/// Unknown action names, absent payloads and unrecognised shapes all deny.
pub fn has_permission_raw(role_data: Option<&Value>, feature_name: &str, action_name: &str) -> bool {
    let Ok(action) = action_name.parse::<Action>() else {
        return false;
    };
    let roles = role_data.map(normalize_role_data);
    has_permission(roles.as_ref(), feature_name, action)
}

/// Role grants for a user record. `roles` wins over the legacy
/// `rolePermission` field unless it is absent, null or empty.
pub fn normalize_user_roles(user: &WireUser) -> RolePermissions {
    let roles = user
        .roles
        .as_ref()
        .filter(|value| !is_blank(value))
        .or(user.role_permission.as_ref());

    match roles {
        Some(value) => normalize_role_data(value),
        None => RolePermissions::default(),
    }
}

/// Fold any accepted role payload shape into [`RolePermissions`].
pub fn normalize_role_data(value: &Value) -> RolePermissions {
    match value {
        Value::Array(items) => match items.first() {
            // A list of roles: only the first one is authoritative.
            Some(first) if is_role_entry(first) => role_from_entry(first),
            _ => RolePermissions::new(None, features_from_list(items)),
        },
        Value::Object(map) => match map.get("roles") {
            Some(roles) => normalize_role_data(roles),
            None => role_from_entry(value),
        },
        other => {
            debug!(shape = %shape_name(other), "Ignoring role payload with unexpected shape");
            RolePermissions::default()
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn is_role_entry(value: &Value) -> bool {
    value.get("rolePermissions").is_some() || value.get("roleName").is_some()
}

fn role_from_entry(entry: &Value) -> RolePermissions {
    let role_name = entry
        .get("roleName")
        .and_then(Value::as_str)
        .map(str::to_string);
    let features = entry
        .get("rolePermissions")
        .and_then(Value::as_array)
        .map(|items| features_from_list(items))
        .unwrap_or_default();
    RolePermissions::new(role_name, features)
}

fn features_from_list(items: &[Value]) -> Vec<FeaturePermission> {
    items.iter().filter_map(feature_from_entry).collect()
}

fn feature_from_entry(entry: &Value) -> Option<FeaturePermission> {
    let feature_name = entry.get("featureName").and_then(Value::as_str)?;
    let actions = entry
        .get("permissions")
        .and_then(Value::as_array)
        .map(|permissions| permissions.iter().filter_map(action_from_entry).collect())
        .unwrap_or_default();

    Some(FeaturePermission {
        feature_name: feature_name.to_string(),
        actions,
    })
}

/// Accepts `{"permissionName": "View"}` or a bare `"View"`.
fn action_from_entry(entry: &Value) -> Option<Action> {
    let name = match entry {
        Value::String(name) => name.as_str(),
        other => other.get("permissionName").and_then(Value::as_str)?,
    };
    match name.parse() {
        Ok(action) => Some(action),
        Err(err) => {
            debug!(error = %err, "Dropping permission outside the known action set");
            None
        }
    }
}

fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Per-action switches for one feature, as the view layer consumes them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActionGates {
    pub view: bool,
    pub create: bool,
    pub edit: bool,
    pub delete: bool,
}

impl ActionGates {
    fn for_feature(roles: Option<&RolePermissions>, feature_name: &str) -> Self {
        Self {
            view: has_permission(roles, feature_name, Action::View),
            create: has_permission(roles, feature_name, Action::Create),
            edit: has_permission(roles, feature_name, Action::Edit),
            delete: has_permission(roles, feature_name, Action::Delete),
        }
    }
}

/// Feature name to action switches.
pub type Gates = BTreeMap<String, ActionGates>;

/// Gate decisions for every named feature. Features missing from `roles`
/// come back with every switch off.
pub fn gate_map<'a>(
    roles: Option<&RolePermissions>,
    features: impl IntoIterator<Item = &'a str>,
) -> Gates {
    features
        .into_iter()
        .map(|feature| {
            (
                feature.to_string(),
                ActionGates::for_feature(roles, feature),
            )
        })
        .collect()
}
