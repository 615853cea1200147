//! Session, token and wire types

use crate::error::{EssError, EssResult};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How the backend's `expiresIn` value is read.
///
/// The field is named like a duration, but the portal backend sends an
/// absolute Unix time in milliseconds, which is the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpirySemantics {
    /// Absolute Unix time in milliseconds
    #[default]
    AbsoluteMillis,
    /// Absolute Unix time in seconds
    AbsoluteSeconds,
    /// Seconds from the moment the response is received
    RelativeSeconds,
}

impl ExpirySemantics {
    /// Turn a raw `expiresIn` into an absolute expiry.
    ///
    /// Out-of-range values resolve to `now`, so the token reads as expired
    /// rather than valid forever.
    pub fn resolve(self, expires_in: i64, now: DateTime<Utc>) -> DateTime<Utc> {
        let resolved = match self {
            Self::AbsoluteMillis => DateTime::from_timestamp_millis(expires_in),
            Self::AbsoluteSeconds => DateTime::from_timestamp(expires_in, 0),
            Self::RelativeSeconds => {
                TimeDelta::try_seconds(expires_in).and_then(|delta| now.checked_add_signed(delta))
            }
        };
        resolved.unwrap_or(now)
    }
}

impl FromStr for ExpirySemantics {
    type Err = EssError;

    fn from_str(s: &str) -> EssResult<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "absolute_millis" | "millis" => Ok(Self::AbsoluteMillis),
            "absolute_seconds" | "seconds" => Ok(Self::AbsoluteSeconds),
            "relative_seconds" | "relative" => Ok(Self::RelativeSeconds),
            other => Err(EssError::config(format!(
                "Unknown expiry semantics '{}' (expected absolute_millis, absolute_seconds or relative_seconds)",
                other
            ))),
        }
    }
}

/// Authenticated user claims as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub email: String,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub company_id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub employment_status: Option<String>,
    #[serde(default)]
    pub annual_gross: Option<f64>,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl UserProfile {
    /// Employee is still going through onboarding
    pub fn is_onboarding(&self) -> bool {
        self.employment_status.as_deref() == Some("onboarding")
    }

    /// Employee has an administrative role
    pub fn is_admin(&self) -> bool {
        self.role.as_deref().is_some_and(|role| {
            matches!(
                role.to_ascii_lowercase().as_str(),
                "admin" | "super_admin" | "hr_admin"
            )
        })
    }

    /// Best display name available
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.email
        } else {
            &self.name
        }
    }
}

/// The token triple held by a session
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl TokenSet {
    /// Build from a login response
    pub fn from_backend(
        tokens: BackendTokens,
        semantics: ExpirySemantics,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at: semantics.resolve(tokens.expires_in, now),
        }
    }

    /// Build from a refresh response; a missing refresh token keeps the current one
    pub fn from_refresh(
        response: RefreshResponse,
        previous_refresh_token: &str,
        semantics: ExpirySemantics,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response
                .refresh_token
                .unwrap_or_else(|| previous_refresh_token.to_string()),
            expires_at: semantics.resolve(response.expires_in, now),
        }
    }

    /// Whether the access token is expired or expires within `skew`
    ///
    /// A skew too large to represent reaches past any expiry.
    pub fn is_expired_at(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        TimeDelta::from_std(skew)
            .ok()
            .and_then(|skew| now.checked_add_signed(skew))
            .is_none_or(|deadline| deadline >= self.expires_at)
    }

    /// Remaining lifetime in seconds (negative once expired)
    pub fn remaining_lifetime(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds()
    }
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &crate::http::mask_token(&self.access_token))
            .field("refresh_token", &crate::http::mask_token(&self.refresh_token))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Current user identity plus token triple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user: UserProfile,
    pub tokens: TokenSet,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl Session {
    /// Whether the backend granted `permission`
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

/// Short-lived state between a password login and the second factor
#[derive(Clone, PartialEq, Eq)]
pub struct PendingVerification {
    pub temp_token: String,
    pub email: String,
}

impl fmt::Debug for PendingVerification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingVerification")
            .field("temp_token", &crate::http::mask_token(&self.temp_token))
            .field("email", &self.email)
            .finish()
    }
}

/// `backendTokens` in the login response
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

impl fmt::Debug for BackendTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendTokens")
            .field("access_token", &crate::http::mask_token(&self.access_token))
            .field("refresh_token", &crate::http::mask_token(&self.refresh_token))
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Full login payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub user: UserProfile,
    pub backend_tokens: BackendTokens,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Two-factor challenge payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengePayload {
    pub temp_token: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response of the login endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LoginResponse {
    Authenticated(AuthPayload),
    Challenge(ChallengePayload),
}

/// Response of the refresh endpoint
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: i64,
}

impl fmt::Debug for RefreshResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshResponse")
            .field("access_token", &crate::http::mask_token(&self.access_token))
            .field("refresh_token", &self.refresh_token.as_deref().map(crate::http::mask_token))
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Int(i64),
    Float(f64),
}

impl From<StringOrNumber> for String {
    fn from(value: StringOrNumber) -> Self {
        match value {
            StringOrNumber::String(s) => s,
            StringOrNumber::Int(n) => n.to_string(),
            StringOrNumber::Float(n) => n.to_string(),
        }
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    StringOrNumber::deserialize(deserializer).map(String::from)
}

fn opt_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Option::<StringOrNumber>::deserialize(deserializer).map(|v| v.map(String::from))
}
