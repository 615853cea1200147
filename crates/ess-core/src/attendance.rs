//! Attendance clock state
//!
//! Clock state is tracked in two tiers: the last value the server confirmed
//! and an optimistic local value set right after a successful clock action.
//! The server value wins as soon as a status fetch succeeds.

use crate::cache::Resource;
use crate::error::EssResult;
use crate::http::{ApiClient, RequestOptions};
use crate::mutation::{MutationOptions, MutationPipeline};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

const STATUS_ENDPOINT: &str = "/api/attendance/status";
const CLOCK_IN_ENDPOINT: &str = "/api/attendance/clock-in";
const CLOCK_OUT_ENDPOINT: &str = "/api/attendance/clock-out";

/// Whether the employee is on the clock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockStatus {
    pub clocked_in: bool,
    #[serde(default, alias = "clockInTime")]
    pub since: Option<DateTime<Utc>>,
}

impl ClockStatus {
    pub fn clocked_in_at(since: DateTime<Utc>) -> Self {
        Self {
            clocked_in: true,
            since: Some(since),
        }
    }

    pub fn clocked_out() -> Self {
        Self {
            clocked_in: false,
            since: None,
        }
    }
}

/// Which tier a value came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierView<T> {
    /// Confirmed by the server
    Authoritative(T),
    /// Set locally, not yet confirmed
    Optimistic(T),
    Unknown,
}

impl<T> TierView<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Authoritative(value) | Self::Optimistic(value) => Some(value),
            Self::Unknown => None,
        }
    }

    pub fn is_authoritative(&self) -> bool {
        matches!(self, Self::Authoritative(_))
    }
}

/// Server value plus optimistic override
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tiered<T> {
    authoritative: Option<T>,
    optimistic: Option<T>,
}

impl<T> Default for Tiered<T> {
    fn default() -> Self {
        Self {
            authoritative: None,
            optimistic: None,
        }
    }
}

impl<T: Clone> Tiered<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a server value; clears any optimistic value
    pub fn set_authoritative(&mut self, value: T) {
        self.authoritative = Some(value);
        self.optimistic = None;
    }

    /// Record a local value pending server confirmation
    pub fn set_optimistic(&mut self, value: T) {
        self.optimistic = Some(value);
    }

    /// Optimistic value if one is pending, otherwise the server value
    pub fn current(&self) -> TierView<T> {
        match (&self.optimistic, &self.authoritative) {
            (Some(value), _) => TierView::Optimistic(value.clone()),
            (None, Some(value)) => TierView::Authoritative(value.clone()),
            (None, None) => TierView::Unknown,
        }
    }

    pub fn authoritative(&self) -> Option<&T> {
        self.authoritative.as_ref()
    }
}

/// Clock-in / clock-out with two-tier state
pub struct AttendanceTracker {
    client: Arc<ApiClient>,
    pipeline: Arc<MutationPipeline>,
    state: Mutex<Tiered<ClockStatus>>,
}

impl AttendanceTracker {
    pub fn new(client: Arc<ApiClient>, pipeline: Arc<MutationPipeline>) -> Self {
        Self {
            client,
            pipeline,
            state: Mutex::new(Tiered::new()),
        }
    }

    pub fn current(&self) -> TierView<ClockStatus> {
        self.state.lock().current()
    }

    /// Forget both tiers; used when the session changes hands
    pub fn reset(&self) {
        *self.state.lock() = Tiered::new();
    }

    /// Fetch the server's clock status.
    ///
    /// Session failures are returned; anything else is logged and the
    /// current (possibly optimistic) state is returned instead.
    pub async fn refresh_status(&self) -> EssResult<TierView<ClockStatus>> {
        match self
            .client
            .get_json::<ClockStatus>(STATUS_ENDPOINT, RequestOptions::default())
            .await
        {
            Ok(status) => {
                let mut state = self.state.lock();
                state.set_authoritative(status);
                Ok(state.current())
            }
            Err(e) if e.category() == crate::error::ErrorCategory::SessionExpired => Err(e),
            Err(e) => {
                tracing::warn!("attendance status unavailable, keeping local state: {}", e);
                Ok(self.current())
            }
        }
    }

    pub async fn clock_in(&self) -> EssResult<TierView<ClockStatus>> {
        self.clock(CLOCK_IN_ENDPOINT, "Clocked in", ClockStatus::clocked_in_at(Utc::now()))
            .await
    }

    pub async fn clock_out(&self) -> EssResult<TierView<ClockStatus>> {
        self.clock(CLOCK_OUT_ENDPOINT, "Clocked out", ClockStatus::clocked_out())
            .await
    }

    async fn clock(
        &self,
        endpoint: &str,
        message: &str,
        optimistic: ClockStatus,
    ) -> EssResult<TierView<ClockStatus>> {
        self.pipeline
            .create(
                endpoint,
                &json!({}),
                MutationOptions::new()
                    .success_message(message)
                    .invalidates([Resource::Attendance]),
            )
            .await?;

        let mut state = self.state.lock();
        state.set_optimistic(optimistic);
        Ok(state.current())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::TracingNotifier;
    use crate::test_support::{session_expiring_in, stack};
    use chrono::TimeDelta;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tracker(server: &MockServer) -> AttendanceTracker {
        let s = stack(server, Some(session_expiring_in(TimeDelta::minutes(10))));
        let pipeline = Arc::new(MutationPipeline::new(
            s.client.clone(),
            s.cache.clone(),
            Arc::new(TracingNotifier),
        ));
        AttendanceTracker::new(s.client, pipeline)
    }

    #[test]
    fn test_server_value_wins() {
        let mut tiered = Tiered::new();
        assert_eq!(tiered.current(), TierView::Unknown);

        tiered.set_authoritative(ClockStatus::clocked_out());
        tiered.set_optimistic(ClockStatus::clocked_in_at(Utc::now()));
        assert!(matches!(tiered.current(), TierView::Optimistic(ref s) if s.clocked_in));

        tiered.set_authoritative(ClockStatus::clocked_out());
        assert_eq!(
            tiered.current(),
            TierView::Authoritative(ClockStatus::clocked_out())
        );
    }

    #[tokio::test]
    async fn test_clock_in_is_optimistic_until_confirmed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CLOCK_IN_ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": {}})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(STATUS_ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"clockedIn": true, "clockInTime": "2024-03-01T08:00:00Z"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tracker = tracker(&server);
        let view = tracker.clock_in().await.unwrap();
        assert!(matches!(view, TierView::Optimistic(ref s) if s.clocked_in));

        let view = tracker.refresh_status().await.unwrap();
        assert!(view.is_authoritative());
        assert_eq!(
            view.value().and_then(|s| s.since).map(|t| t.to_rfc3339()),
            Some("2024-03-01T08:00:00+00:00".to_string())
        );
    }

    #[tokio::test]
    async fn test_status_failure_falls_back_to_optimistic() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CLOCK_OUT_ENDPOINT))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(STATUS_ENDPOINT))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let tracker = tracker(&server);
        tracker.clock_out().await.unwrap();
        let view = tracker.refresh_status().await.unwrap();
        assert_eq!(view, TierView::Optimistic(ClockStatus::clocked_out()));
    }

    #[tokio::test]
    async fn test_failed_clock_in_sets_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CLOCK_IN_ENDPOINT))
            .respond_with(
                ResponseTemplate::new(409)
                    .set_body_json(serde_json::json!({"error": {"message": "Already clocked in"}})),
            )
            .mount(&server)
            .await;

        let tracker = tracker(&server);
        let err = tracker.clock_in().await.unwrap_err();
        assert_eq!(err.user_message(), "Already clocked in");
        assert_eq!(tracker.current(), TierView::Unknown);
    }

    #[tokio::test]
    async fn test_reset_forgets_both_tiers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CLOCK_OUT_ENDPOINT))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let tracker = tracker(&server);
        tracker.clock_out().await.unwrap();
        assert!(matches!(tracker.current(), TierView::Optimistic(_)));

        tracker.reset();
        assert_eq!(tracker.current(), TierView::Unknown);
    }
}
