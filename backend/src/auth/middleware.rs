//! Credential extraction for incoming requests.
//!
//! The browser keeps its session token and user id in cookies. API clients
//! may send `Authorization: Bearer <token>` and `X-User-Id` instead. Cookies
//! win when both are present.

use std::collections::HashMap;
use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;

use super::models::Credential;
use crate::config::BackendConfig;
use crate::server::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Names of the cookies holding the credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieNames {
    pub token: String,
    pub user_id: String,
}

impl Default for CookieNames {
    fn default() -> Self {
        Self::from(&BackendConfig::default())
    }
}

impl From<&BackendConfig> for CookieNames {
    fn from(config: &BackendConfig) -> Self {
        Self {
            token: config.token_cookie.clone(),
            user_id: config.user_cookie.clone(),
        }
    }
}

impl CookieNames {
    /// `Set-Cookie` values that expire both credential cookies.
    pub fn expired(&self) -> [String; 2] {
        [expired_cookie(&self.token), expired_cookie(&self.user_id)]
    }
}

fn expired_cookie(name: &str) -> String {
    format!("{name}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax")
}

/// Credential carried by the request, if any. Never rejects.
#[derive(Debug, Clone)]
pub struct MaybeCredential(pub Option<Credential>);

impl FromRequestParts<AppState> for MaybeCredential {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(credential_from_headers(&parts.headers, &state.cookies)))
    }
}

pub fn credential_from_headers(headers: &HeaderMap, names: &CookieNames) -> Option<Credential> {
    let cookies = parse_cookies(headers);

    let token = cookies
        .get(names.token.as_str())
        .map(|token| token.to_string())
        .or_else(|| bearer_token(headers))
        .filter(|token| !token.is_empty())?;

    let user_id = cookies
        .get(names.user_id.as_str())
        .map(|id| id.to_string())
        .or_else(|| header_str(headers, USER_ID_HEADER).map(str::to_string))
        .filter(|id| !id.is_empty());

    let credential = Credential::new(token);
    Some(match user_id {
        Some(id) => credential.with_user_id(id),
        None => credential,
    })
}

/// All cookies across every `Cookie` header. The first occurrence of a name wins.
fn parse_cookies(headers: &HeaderMap) -> HashMap<&str, &str> {
    let mut cookies = HashMap::new();
    for value in headers.get_all(COOKIE) {
        let Ok(value) = value.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            if let Some((name, val)) = pair.trim().split_once('=') {
                cookies.entry(name.trim()).or_insert(val.trim());
            }
        }
    }
    cookies
}

/// The auth scheme name is case-insensitive.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let (scheme, token) = header_str(headers, AUTHORIZATION.as_str())?
        .trim()
        .split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim().to_string())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
