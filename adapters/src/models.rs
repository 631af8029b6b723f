//! Wire models for the remote ticketing API.
//!
//! These models mirror the JSON the remote API returns for identity fetches.
//! Identity fields are typed; role payloads are kept as raw JSON because the
//! API has shipped several shapes over time and normalizing them is the
//! backend's job, not the transport's. Optional identity fields with an
//! unexpected type decode as absent rather than failing the whole record.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Credential presented by the browser: the session token plus the user id the
/// identity endpoint is addressed by.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    user_id: Option<String>,
}

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            user_id: None,
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the token itself.
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Top-level identity response: `{ "data": { "user": { ... } } }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserEnvelope {
    pub data: UserData,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserData {
    pub user: WireUser,
}

/// User record as returned by `GET /users/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WireUser {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default, deserialize_with = "lenient")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub email_verified: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub phone_verification_status: Option<String>,
    #[serde(default)]
    pub business_info: Option<Value>,
    /// Legacy single-role payload (bare array or wrapped object).
    #[serde(default)]
    pub role_permission: Option<Value>,
    /// Current payload: list of roles, each carrying `rolePermissions`.
    #[serde(default)]
    pub roles: Option<Value>,
}

/// `None` for a missing, null or mistyped value.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

impl UserEnvelope {
    pub fn into_user(self) -> WireUser {
        self.data.user
    }
}
