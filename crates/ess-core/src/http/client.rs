//! Authorized request client

use super::envelope::{normalize_error_bytes, parse_body, unwrap_data};
use super::origin::resolve_endpoint;
use super::sanitize::sanitize_error_text;
use crate::auth::RefreshGuard;
use crate::config::{PortalConfig, timeouts};
use crate::error::{EssError, EssResult};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use url::Url;

/// Per-request knobs
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Query string pairs
    pub query: Vec<(String, String)>,
    /// Overrides the client's request timeout
    pub timeout: Option<Duration>,
    /// Cancelling stops this caller's wait; a refresh it joined keeps running
    pub cancel: Option<CancellationToken>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

enum Attempt {
    Done(Value),
    Unauthorized(String),
}

/// HTTP client that attaches the current access token to every request.
///
/// A 401 triggers exactly one refresh and one retry; a second 401 is returned
/// as [`EssError::ExpiredAccessToken`].
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    guard: Arc<RefreshGuard>,
    timeout: Duration,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client with its own connection pool
    pub fn new(config: &PortalConfig, guard: Arc<RefreshGuard>) -> EssResult<Self> {
        let http = Client::builder()
            .connect_timeout(timeouts::network::connect_timeout())
            .build()
            .map_err(|e| EssError::config(format!("Failed to build HTTP client: {}", e)))?;
        Self::with_http_client(http, config, guard)
    }

    /// Create a client on top of an existing `reqwest::Client`
    pub fn with_http_client(
        http: Client,
        config: &PortalConfig,
        guard: Arc<RefreshGuard>,
    ) -> EssResult<Self> {
        Ok(Self {
            http,
            base_url: config.base_url()?,
            guard,
            timeout: config.request_timeout,
        })
    }

    /// Backend origin requests are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn guard(&self) -> &Arc<RefreshGuard> {
        &self.guard
    }

    /// Perform an authorized request and return the unwrapped body
    #[instrument(skip(self, body, options), level = "debug")]
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
        options: RequestOptions,
    ) -> EssResult<Value> {
        // Checked before a token is ever looked at.
        let url = resolve_endpoint(&self.base_url, endpoint)?;

        let work = self.execute(method, url, body, &options);
        match options.cancel.clone() {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(EssError::Cancelled),
                    result = work => result,
                }
            }
            None => work.await,
        }
    }

    async fn execute(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
        options: &RequestOptions,
    ) -> EssResult<Value> {
        let session = self.guard.ensure_fresh().await?;
        let rejected = match self
            .send_once(&method, &url, body, options, &session.tokens.access_token)
            .await?
        {
            Attempt::Done(value) => return Ok(value),
            Attempt::Unauthorized(_) => session.tokens.access_token.clone(),
        };

        tracing::debug!(path = url.path(), "access token rejected; refreshing once");
        let session = self.guard.refresh_after_rejection(&rejected).await?;

        match self
            .send_once(&method, &url, body, options, &session.tokens.access_token)
            .await?
        {
            Attempt::Done(value) => Ok(value),
            Attempt::Unauthorized(message) => {
                tracing::warn!(path = url.path(), "access token rejected after refresh");
                Err(EssError::ExpiredAccessToken { message })
            }
        }
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &Url,
        body: Option<&Value>,
        options: &RequestOptions,
        access_token: &str,
    ) -> EssResult<Attempt> {
        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .bearer_auth(access_token)
            .timeout(options.timeout.unwrap_or(self.timeout));
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if status == StatusCode::UNAUTHORIZED {
            return Ok(Attempt::Unauthorized(normalize_error_bytes(&bytes)));
        }

        if !status.is_success() {
            tracing::debug!(
                status = status.as_u16(),
                body = %sanitize_error_text(&String::from_utf8_lossy(&bytes)),
                "request failed"
            );
            return Err(EssError::from_status(
                status.as_u16(),
                normalize_error_bytes(&bytes),
            ));
        }

        Ok(Attempt::Done(unwrap_data(parse_body(&bytes)?)))
    }

    pub async fn get(&self, endpoint: &str, options: RequestOptions) -> EssResult<Value> {
        self.request(Method::GET, endpoint, None, options).await
    }

    /// GET and deserialize the unwrapped body
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> EssResult<T> {
        let value = self.get(endpoint, options).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn post(&self, endpoint: &str, body: &Value) -> EssResult<Value> {
        self.request(Method::POST, endpoint, Some(body), RequestOptions::default())
            .await
    }

    pub async fn patch(&self, endpoint: &str, body: &Value) -> EssResult<Value> {
        self.request(Method::PATCH, endpoint, Some(body), RequestOptions::default())
            .await
    }

    pub async fn put(&self, endpoint: &str, body: &Value) -> EssResult<Value> {
        self.request(Method::PUT, endpoint, Some(body), RequestOptions::default())
            .await
    }

    pub async fn delete(&self, endpoint: &str) -> EssResult<Value> {
        self.request(Method::DELETE, endpoint, None, RequestOptions::default())
            .await
    }
}
