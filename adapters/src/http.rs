//! REST implementation of [`ApiGateway`].
//!
//! Talks to the remote ticketing API over HTTP with `reqwest`. The session
//! token is sent both as a bearer header and as a cookie (`token` unless
//! configured otherwise), since the remote API accepts either depending on
//! the deployment.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::COOKIE;
use reqwest::{Client, RequestBuilder, Response, Url};
use tracing::debug;

use crate::errors::{AdapterError, Result};
use crate::models::{Credential, UserEnvelope};
use crate::ApiGateway;

/// Default request timeout when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Cookie the remote API reads the session token from by default.
pub const DEFAULT_TOKEN_COOKIE: &str = "token";

pub struct HttpGateway {
    client: Client,
    base_url: Url,
    token_cookie: String,
}

impl HttpGateway {
    /// Build a gateway rooted at `base_url` (e.g. `https://api.example.com/api`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|err| AdapterError::Config(format!("invalid base URL {base_url}: {err}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(AdapterError::Config(format!(
                "unsupported URL scheme: {}",
                base_url.scheme()
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AdapterError::Config(format!("cannot build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url,
            token_cookie: DEFAULT_TOKEN_COOKIE.to_string(),
        })
    }

    /// Send the token under `name` instead of [`DEFAULT_TOKEN_COOKIE`].
    pub fn with_token_cookie(mut self, name: impl Into<String>) -> Self {
        self.token_cookie = name.into();
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn token_cookie(&self) -> &str {
        &self.token_cookie
    }

    /// Join path segments onto the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                AdapterError::Config(format!("base URL cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder, credential: &Credential) -> RequestBuilder {
        request
            .bearer_auth(credential.token())
            .header(COOKIE, format!("{}={}", self.token_cookie, credential.token()))
    }
}

#[async_trait]
impl ApiGateway for HttpGateway {
    async fn fetch_identity(&self, credential: &Credential) -> Result<UserEnvelope> {
        let user_id = credential
            .user_id()
            .ok_or_else(|| AdapterError::Config("credential carries no user id".to_string()))?;
        let url = self.endpoint(&["users", user_id])?;

        debug!(url = %url, "Fetching identity from remote API");

        let response = self
            .authorized(self.client.get(url), credential)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        response
            .json::<UserEnvelope>()
            .await
            .map_err(|err| AdapterError::Decode(err.to_string()))
    }

    async fn logout(&self, credential: &Credential) -> Result<()> {
        let url = self.endpoint(&["logout"])?;

        debug!(url = %url, "Invalidating remote session");

        let response = self
            .authorized(self.client.get(url), credential)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}

/// Turn a non-2xx response into [`AdapterError::Status`], keeping the body for logs.
async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(AdapterError::Status {
        status: status.as_u16(),
        body,
    })
}
