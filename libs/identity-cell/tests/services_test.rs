use std::sync::Arc;

use assert_matches::assert_matches;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use identity_cell::models::ProfileUpdate;
use identity_cell::services::auth::AuthService;
use identity_cell::services::profile::ProfileService;
use shared_backend::ClinicApiClient;
use shared_config::AppConfig;
use shared_models::auth::{InvalidationReason, Session, SessionStore, UserProfile};
use shared_models::error::AppError;

fn test_config(base_url: &str) -> AppConfig {
    AppConfig {
        clinic_api_url: base_url.to_string(),
        intent_api_url: String::new(),
        intent_api_token: String::new(),
        intent_confidence_threshold: 0.5,
    }
}

fn client_for(server: &MockServer, sessions: &SessionStore) -> Arc<ClinicApiClient> {
    let store = sessions.clone();
    Arc::new(
        ClinicApiClient::new(&test_config(&server.uri())).with_on_unauthorized(Arc::new(
            move || store.invalidate(InvalidationReason::Expired),
        )),
    )
}

#[tokio::test]
async fn login_stores_session() {
    let server = MockServer::start().await;
    let sessions = SessionStore::new();

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({
            "email": "jane@example.com",
            "password": "secret"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "tok-123",
            "user": { "name": "Jane Doe", "email": "jane@example.com" }
        })))
        .mount(&server)
        .await;

    let auth = AuthService::new(client_for(&server, &sessions), sessions.clone());
    let session = auth.login("jane@example.com", "secret").await.unwrap();

    assert_eq!(session.token, "tok-123");
    assert_eq!(sessions.token().as_deref(), Some("tok-123"));
    assert!(!auth.session_expired());
}

#[tokio::test]
async fn login_failure_surfaces_server_message() {
    let server = MockServer::start().await;
    let sessions = SessionStore::new();

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "message": "Invalid credentials" })),
        )
        .mount(&server)
        .await;

    let auth = AuthService::new(client_for(&server, &sessions), sessions.clone());
    let err = auth.login("jane@example.com", "wrong").await.unwrap_err();

    assert_matches!(err, AppError::BadRequest(ref msg) if msg == "Invalid credentials");
    assert!(!sessions.is_authenticated());
}

#[tokio::test]
async fn unauthorized_response_invalidates_session() {
    let server = MockServer::start().await;
    let sessions = SessionStore::with_session(Session {
        token: "stale".to_string(),
        user: UserProfile::default(),
    });

    Mock::given(method("GET"))
        .and(path("/api/auth/user-details"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "expired" })))
        .mount(&server)
        .await;

    let profile = ProfileService::new(client_for(&server, &sessions));
    let err = profile.fetch_user_details("stale").await.unwrap_err();

    assert_matches!(err, AppError::Auth(_));
    assert!(!sessions.is_authenticated());
    assert_eq!(
        sessions.last_invalidation(),
        Some(InvalidationReason::Expired)
    );
}

#[tokio::test]
async fn prefill_uses_bearer_token() {
    let server = MockServer::start().await;
    let sessions = SessionStore::new();

    Mock::given(method("GET"))
        .and(path("/api/auth/user-details"))
        .and(header("Authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Jane Doe",
            "email": "jane@example.com",
            "phone": "+60123456789",
            "address": "123 Health Street"
        })))
        .mount(&server)
        .await;

    let profile = ProfileService::new(client_for(&server, &sessions));
    let details = profile.fetch_user_details("tok-123").await.unwrap();

    assert_eq!(details.name, "Jane Doe");
    assert_eq!(details.phone, "+60123456789");
    assert_eq!(details.weight, "");
}

#[tokio::test]
async fn email_existence_check() {
    let server = MockServer::start().await;
    let sessions = SessionStore::new();

    Mock::given(method("GET"))
        .and(path("/api/auth/check-email/taken%40example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "exists": true })))
        .mount(&server)
        .await;

    let profile = ProfileService::new(client_for(&server, &sessions));
    assert!(profile.email_exists("taken@example.com").await.unwrap());
}

#[tokio::test]
async fn profile_sync_omits_absent_measurements() {
    let server = MockServer::start().await;
    let sessions = SessionStore::new();

    Mock::given(method("PUT"))
        .and(path("/api/auth/update-user"))
        .and(header("Authorization", "Bearer tok-123"))
        .and(body_json(json!({
            "phone": "+60123456789",
            "address": "123 Health Street"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;

    let profile = ProfileService::new(client_for(&server, &sessions));
    let update = ProfileUpdate {
        phone: "+60123456789".to_string(),
        address: "123 Health Street".to_string(),
        weight: None,
        height: None,
    };
    profile.sync_profile("tok-123", &update).await.unwrap();
}
