//! Session lifecycle against a mock portal backend
//!
//! Login routing, coalesced refresh, refresh exhaustion and the
//! `expiresIn` interpretations.

use chrono::{TimeDelta, Utc};
use ess_core::auth::{
    ExpirySemantics, MemoryPersistence, SealedFileStore, SessionPersistence, TokenSet,
    UserProfile,
};
use ess_core::error::ErrorCategory;
use ess::{CacheKey, Destination, EssError, LoginOutcome, Portal, PortalConfig, Resource, Session};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn http() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

fn stale_session() -> Session {
    Session {
        user: UserProfile {
            id: "41".into(),
            name: "Tomi Ade".into(),
            email: "tomi@example.com".into(),
            company_id: Some("9".into()),
            role: Some("employee".into()),
            employment_status: Some("active".into()),
            annual_gross: None,
            avatar: None,
        },
        tokens: TokenSet {
            access_token: "stale-access".into(),
            refresh_token: "refresh-1".into(),
            expires_at: Utc::now() - TimeDelta::minutes(1),
        },
        permissions: vec![],
    }
}

fn login_body(employment_status: &str, expires_in: i64) -> Value {
    json!({
        "data": {
            "user": {
                "id": 41,
                "name": "Tomi Ade",
                "email": "tomi@example.com",
                "employmentStatus": employment_status
            },
            "backendTokens": {
                "accessToken": "access-1",
                "refreshToken": "refresh-1",
                "expiresIn": expires_in
            },
            "permissions": ["payslip:view"]
        }
    })
}

fn far_future_millis() -> i64 {
    (Utc::now() + TimeDelta::hours(1)).timestamp_millis()
}

fn portal_with_session(server: &MockServer, persistence: Arc<dyn SessionPersistence>) -> Portal {
    Portal::builder(PortalConfig::new(server.uri()))
        .with_http_client(http())
        .with_persistence(persistence)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_login_routes_by_employment_status() {
    for (status, expected) in [
        ("onboarding", Destination::Onboarding),
        ("active", Destination::Dashboard),
        ("Onboarding", Destination::Dashboard),
    ] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/employee-login"))
            .and(body_partial_json(json!({"email": "tomi@example.com"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(login_body(status, far_future_millis())),
            )
            .mount(&server)
            .await;

        let portal = Portal::builder(PortalConfig::new(server.uri()))
            .with_http_client(http())
            .build()
            .unwrap();

        let outcome = portal.login("tomi@example.com", "secret").await.unwrap();
        let LoginOutcome::Authenticated(login) = outcome else {
            panic!("expected a direct login for {}", status);
        };
        assert_eq!(login.destination, expected, "status {}", status);
        assert_eq!(portal.destination(), Some(expected));
        assert!(login.session.has_permission("payslip:view"));
    }
}

#[tokio::test]
async fn test_concurrent_requests_share_one_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .and(header("Authorization", "Refresh refresh-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(200))
                .set_body_json(json!({
                    "accessToken": "access-2",
                    "refreshToken": "refresh-2",
                    "expiresIn": far_future_millis()
                })),
        )
        .expect(1)
        .mount(&server)
        .await;
    for resource in [Resource::Payslips, Resource::Loans, Resource::Assets, Resource::Goals] {
        Mock::given(method("GET"))
            .and(path(resource.endpoint()))
            .and(header("Authorization", "Bearer access-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .expect(1)
            .mount(&server)
            .await;
    }

    let persistence = Arc::new(MemoryPersistence::new());
    persistence.save(&stale_session()).unwrap();
    let portal = portal_with_session(&server, persistence);

    let (a, b, c, d) = tokio::join!(
        portal.view(Resource::Payslips.into()),
        portal.view(Resource::Loans.into()),
        portal.view(Resource::Assets.into()),
        portal.view(Resource::Goals.into()),
    );
    for result in [a, b, c, d] {
        assert_eq!(result.unwrap(), json!([]));
    }

    let session = portal.session().unwrap();
    assert_eq!(session.tokens.access_token, "access-2");
    assert_eq!(session.tokens.refresh_token, "refresh-2");
}

#[tokio::test]
async fn test_refresh_exhaustion_ends_the_session_everywhere() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Refresh token revoked"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/payslips"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(0)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let file = SealedFileStore::new(temp_dir.path().join("session"), "test-secret");
    file.save(&stale_session()).unwrap();
    let portal = portal_with_session(&server, Arc::new(file));
    assert!(portal.is_authenticated());

    let err = portal.view(Resource::Payslips.into()).await.unwrap_err();
    assert!(matches!(err, EssError::RefreshFailed { .. }), "{:?}", err);
    assert_eq!(err.category(), ErrorCategory::SessionExpired);

    assert!(!portal.is_authenticated());
    assert_eq!(portal.destination(), Some(Destination::Login));
    assert!(portal.cache().registered_resources().is_empty());
    assert!(!temp_dir.path().join("session").exists());

    // Nothing to refresh any more
    let err = portal.view(Resource::Payslips.into()).await.unwrap_err();
    assert!(matches!(err, EssError::NotAuthenticated), "{:?}", err);
}

#[tokio::test]
async fn test_transient_refresh_failure_keeps_the_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let persistence = Arc::new(MemoryPersistence::new());
    persistence.save(&stale_session()).unwrap();
    let portal = portal_with_session(&server, persistence.clone());

    let err = portal.view(Resource::Loans.into()).await.unwrap_err();
    assert!(err.is_transient(), "{:?}", err);
    assert!(portal.is_authenticated());
    assert!(!persistence.is_empty());
    assert_ne!(portal.destination(), Some(Destination::Login));
}

#[tokio::test]
async fn test_session_survives_restart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/employee-login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(login_body("active", far_future_millis())),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/benefits"))
        .and(header("Authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"plan": "gold"}})))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let mut config = PortalConfig::new(server.uri());
    config.session.file = Some(temp_dir.path().join("session"));
    config.session.secret = Some("restart-secret".into());

    let first = Portal::builder(config.clone())
        .with_http_client(http())
        .build()
        .unwrap();
    first.login("tomi@example.com", "secret").await.unwrap();
    drop(first);

    let second = Portal::builder(config)
        .with_http_client(http())
        .build()
        .unwrap();
    assert!(second.is_authenticated());
    let benefits = second.view(CacheKey::new(Resource::Benefits)).await.unwrap();
    assert_eq!(benefits, json!({"plan": "gold"}));
}

#[tokio::test]
async fn test_expires_in_interpretations() {
    let cases = [
        (ExpirySemantics::AbsoluteMillis, far_future_millis()),
        (
            ExpirySemantics::AbsoluteSeconds,
            (Utc::now() + TimeDelta::hours(1)).timestamp(),
        ),
        (ExpirySemantics::RelativeSeconds, 3600),
    ];

    for (semantics, expires_in) in cases {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/employee-login"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(login_body("active", expires_in)),
            )
            .mount(&server)
            .await;

        let mut config = PortalConfig::new(server.uri());
        config.expiry_semantics = semantics;
        let portal = Portal::builder(config)
            .with_http_client(http())
            .build()
            .unwrap();
        portal.login("tomi@example.com", "secret").await.unwrap();

        let remaining = portal.session().unwrap().tokens.remaining_lifetime();
        assert!(
            (3500..=3600).contains(&remaining),
            "{:?} gave {}s",
            semantics,
            remaining
        );
    }
}
