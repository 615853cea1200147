//! Credential exchange: password login, second factor, code resend

use super::session::SessionStore;
use super::types::{
    AuthPayload, ExpirySemantics, LoginResponse, PendingVerification, RefreshResponse, Session,
    TokenSet, UserProfile,
};
use crate::cache::ViewCache;
use crate::config::{PortalConfig, timeouts};
use crate::error::{EssError, EssResult};
use crate::http::{normalize_error_body, parse_body, resolve_endpoint, sanitize_error_text, unwrap_data};
use crate::navigation::{Destination, Navigator};
use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, StatusCode, header};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const LOGIN_ENDPOINT: &str = "/api/auth/employee-login";
const VERIFY_CODE_ENDPOINT: &str = "/api/auth/verify-code";
const RESEND_CODE_ENDPOINT: &str = "/api/auth/resend-code";
const REFRESH_ENDPOINT: &str = "/api/auth/refresh";

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Validate and trim an email address
pub fn validate_email(email: &str) -> EssResult<String> {
    let email = email.trim();
    if email.is_empty() {
        return Err(EssError::invalid_input_field("Email is required", "email"));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(EssError::invalid_input_field(
            "Enter a valid email address",
            "email",
        ));
    }
    Ok(email.to_string())
}

/// Where a freshly authenticated user lands
pub fn post_login_destination(user: &UserProfile) -> Destination {
    if user.is_onboarding() {
        Destination::Onboarding
    } else {
        Destination::Dashboard
    }
}

/// Token and credential endpoints of the backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// `POST /api/auth/employee-login`
    async fn login(&self, email: &str, password: &str) -> EssResult<LoginResponse>;

    /// `POST /api/auth/verify-code`
    async fn verify_code(&self, temp_token: &str, code: &str) -> EssResult<AuthPayload>;

    /// `POST /api/auth/resend-code`
    async fn resend_code(&self, temp_token: &str) -> EssResult<()>;

    /// `POST /api/auth/refresh` with `Authorization: Refresh <token>`
    async fn refresh(&self, refresh_token: &str) -> EssResult<RefreshResponse>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthCall {
    Login,
    VerifyCode,
    ResendCode,
    Refresh,
}

impl AuthCall {
    fn endpoint(self) -> &'static str {
        match self {
            Self::Login => LOGIN_ENDPOINT,
            Self::VerifyCode => VERIFY_CODE_ENDPOINT,
            Self::ResendCode => RESEND_CODE_ENDPOINT,
            Self::Refresh => REFRESH_ENDPOINT,
        }
    }

    /// Map a non-success status onto the credential error taxonomy
    fn failure(self, status: StatusCode, message: Option<String>) -> EssError {
        let code = status.as_u16();
        if matches!(code, 408 | 429) || status.is_server_error() {
            return EssError::Transient {
                message: message.unwrap_or_else(|| crate::http::GENERIC_ERROR_MESSAGE.to_string()),
                status_code: Some(code),
            };
        }

        match self {
            Self::Login if status.is_client_error() => EssError::InvalidCredentials { message },
            Self::VerifyCode | Self::ResendCode if status.is_client_error() => {
                EssError::InvalidCode { message }
            }
            Self::Refresh => EssError::refresh_failed(
                message.unwrap_or_else(|| format!("refresh rejected with status {}", code)),
            ),
            _ => EssError::Http {
                message: message.unwrap_or_else(|| crate::http::GENERIC_ERROR_MESSAGE.to_string()),
                status_code: Some(code),
            },
        }
    }
}

/// reqwest implementation of [`AuthBackend`]
#[derive(Debug, Clone)]
pub struct HttpAuthBackend {
    http: Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpAuthBackend {
    pub fn new(config: &PortalConfig) -> EssResult<Self> {
        let http = Client::builder()
            .connect_timeout(timeouts::network::connect_timeout())
            .build()
            .map_err(|e| EssError::config(format!("Failed to build HTTP client: {}", e)))?;
        Self::with_http_client(http, config)
    }

    pub fn with_http_client(http: Client, config: &PortalConfig) -> EssResult<Self> {
        Ok(Self {
            http,
            base_url: config.base_url()?,
            timeout: config.auth_timeout,
        })
    }

    /// POST to an auth endpoint and decode the (unwrapped) success body
    async fn call<T: DeserializeOwned>(
        &self,
        call: AuthCall,
        body: Option<Value>,
        refresh_token: Option<&str>,
    ) -> EssResult<T> {
        let url = resolve_endpoint(&self.base_url, call.endpoint())?;
        let mut request = self.http.post(url);
        if let Some(token) = refresh_token {
            request = request.header(header::AUTHORIZATION, format!("Refresh {}", token));
        }
        if let Some(body) = &body {
            request = request.json(body);
        }

        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let bytes = response.bytes().await?;
            Ok::<_, EssError>((status, bytes))
        };
        let (status, bytes) = match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result?,
            Err(elapsed) => {
                tracing::warn!(endpoint = call.endpoint(), "auth call timed out");
                return Err(elapsed.into());
            }
        };

        if !status.is_success() {
            tracing::debug!(
                endpoint = call.endpoint(),
                status = status.as_u16(),
                body = %sanitize_error_text(&String::from_utf8_lossy(&bytes)),
                "auth call failed"
            );
            let message = serde_json::from_slice::<Value>(&bytes)
                .ok()
                .and_then(|body| normalize_error_body(&body));
            return Err(call.failure(status, message));
        }

        let body = unwrap_data(parse_body(&bytes)?);
        serde_json::from_value(body).map_err(|e| {
            tracing::debug!(endpoint = call.endpoint(), "undecodable auth response: {}", e);
            match call {
                AuthCall::Refresh => EssError::refresh_failed("Malformed refresh response"),
                _ => EssError::json(format!("Malformed response from {}", call.endpoint())),
            }
        })
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn login(&self, email: &str, password: &str) -> EssResult<LoginResponse> {
        self.call(
            AuthCall::Login,
            Some(json!({ "email": email, "password": password })),
            None,
        )
        .await
    }

    async fn verify_code(&self, temp_token: &str, code: &str) -> EssResult<AuthPayload> {
        self.call(
            AuthCall::VerifyCode,
            Some(json!({ "code": code, "tempToken": temp_token })),
            None,
        )
        .await
    }

    async fn resend_code(&self, temp_token: &str) -> EssResult<()> {
        self.call::<Value>(
            AuthCall::ResendCode,
            Some(json!({ "tempToken": temp_token })),
            None,
        )
        .await
        .map(|_| ())
    }

    async fn refresh(&self, refresh_token: &str) -> EssResult<RefreshResponse> {
        self.call(AuthCall::Refresh, None, Some(refresh_token)).await
    }
}

/// A completed login
#[derive(Debug, Clone)]
pub struct AuthenticatedLogin {
    pub session: Arc<Session>,
    pub destination: Destination,
}

/// Result of a password login
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    Authenticated(AuthenticatedLogin),
    /// The backend sent a one-time code; finish with
    /// [`CredentialExchange::verify_code`]
    RequiresSecondFactor(PendingVerification),
}

/// Turns credentials into a session in the store.
///
/// A new login starts from an empty view cache so nothing fetched for the
/// previous session is served to the next one.
pub struct CredentialExchange {
    backend: Arc<dyn AuthBackend>,
    store: Arc<SessionStore>,
    cache: Arc<ViewCache>,
    navigator: Arc<dyn Navigator>,
    semantics: ExpirySemantics,
}

impl CredentialExchange {
    pub fn new(
        backend: Arc<dyn AuthBackend>,
        store: Arc<SessionStore>,
        cache: Arc<ViewCache>,
        navigator: Arc<dyn Navigator>,
        semantics: ExpirySemantics,
    ) -> Self {
        Self {
            backend,
            store,
            cache,
            navigator,
            semantics,
        }
    }

    /// Password login
    pub async fn login(&self, email: &str, password: &str) -> EssResult<LoginOutcome> {
        let email = validate_email(email)?;
        if password.trim().is_empty() {
            return Err(EssError::invalid_input_field(
                "Password is required",
                "password",
            ));
        }

        tracing::info!(email = %email, "logging in");
        match self.backend.login(&email, password).await? {
            LoginResponse::Authenticated(payload) => {
                Ok(LoginOutcome::Authenticated(self.establish(payload)))
            }
            LoginResponse::Challenge(challenge) => {
                tracing::info!(email = %email, "second factor required");
                Ok(LoginOutcome::RequiresSecondFactor(PendingVerification {
                    temp_token: challenge.temp_token,
                    email: challenge.email.unwrap_or(email),
                }))
            }
        }
    }

    /// Complete a login with the one-time code
    pub async fn verify_code(
        &self,
        pending: &PendingVerification,
        code: &str,
    ) -> EssResult<AuthenticatedLogin> {
        let code = code.trim();
        if code.is_empty() {
            return Err(EssError::invalid_input_field(
                "Verification code is required",
                "code",
            ));
        }

        let payload = self.backend.verify_code(&pending.temp_token, code).await?;
        Ok(self.establish(payload))
    }

    /// Ask the backend to send a new code
    pub async fn resend_code(&self, pending: &PendingVerification) -> EssResult<()> {
        self.backend.resend_code(&pending.temp_token).await?;
        tracing::info!(email = %pending.email, "verification code re-sent");
        Ok(())
    }

    fn establish(&self, payload: AuthPayload) -> AuthenticatedLogin {
        let destination = post_login_destination(&payload.user);
        self.cache.clear();
        let session = self.store.set(Session {
            tokens: TokenSet::from_backend(payload.backend_tokens, self.semantics, Utc::now()),
            user: payload.user,
            permissions: payload.permissions,
        });
        tracing::info!(
            user = %session.user.email,
            destination = ?destination,
            "login complete"
        );
        self.navigator.navigate(destination);
        AuthenticatedLogin {
            session,
            destination,
        }
    }
}
