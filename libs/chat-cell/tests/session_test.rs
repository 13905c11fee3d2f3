use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chat_cell::models::{ChatInput, InputExpectation};
use chat_cell::services::intent::IntentClassifier;
use chat_cell::services::session::ChatSession;
use schedule_cell::{calendar, slots};
use shared_backend::ClinicApiClient;
use shared_config::AppConfig;
use shared_models::auth::{Session, SessionStore, UserProfile};

fn test_config(base_url: &str) -> AppConfig {
    AppConfig {
        clinic_api_url: base_url.to_string(),
        intent_api_url: String::new(),
        intent_api_token: String::new(),
        intent_confidence_threshold: 0.5,
    }
}

fn session_for(server: &MockServer, sessions: SessionStore) -> ChatSession {
    let client = Arc::new(ClinicApiClient::new(&test_config(&server.uri())));
    ChatSession::new(client, sessions, IntentClassifier::new(None, 0.5))
}

/// The last date of the second picker page is always at least seven
/// weekdays out, so its slots never depend on the wall clock.
fn second_page_target() -> NaiveDate {
    let today = Local::now().date_naive();
    *calendar::paginated_dates(today, 1, calendar::DATE_PAGE_SIZE)
        .last()
        .unwrap()
}

fn patient_session() -> SessionStore {
    SessionStore::with_session(Session {
        token: "tok-123".to_string(),
        user: UserProfile {
            name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            phone: "+60123456789".to_string(),
            address: "123 Health Street".to_string(),
            ..UserProfile::default()
        },
    })
}

fn confirmed_appointment(id: &str) -> serde_json::Value {
    json!({
        "_id": id,
        "name": "Jane Doe",
        "email": "jane@example.com",
        "phone": "+60123456789",
        "address": "123 Health Street",
        "treatment": { "_id": "svc-cleaning", "name": "Cleaning", "duration": 30, "price": 120.0 },
        "appointmentTime": "2099-03-02T02:00:00.000Z",
        "status": "confirmed",
        "noteHistory": []
    })
}

async fn mount_catalog(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "_id": "cat-dental", "name": "Dental", "description": "Dental care" }
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "_id": "svc-cleaning",
                "name": "Cleaning",
                "description": "Scaling and polishing",
                "duration": 30,
                "price": 120.0,
                "category": "cat-dental"
            }
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/appointments/booked-slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bookedSlots": ["9:00 AM"]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn unknown_free_text_asks_for_a_rephrase() {
    let server = MockServer::start().await;
    let mut chat = session_for(&server, SessionStore::new());

    let reply = chat.handle(ChatInput::Text("zzz qqq".to_string())).await;
    assert!(reply.messages[0].contains("rephrase"));
}

#[tokio::test]
async fn guest_chat_booking_happy_path() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    let target = second_page_target();
    let expected_time = slots::date_time_from_slot(target, "10:00 AM").unwrap();
    let expected_iso = slots::to_appointment_iso(&slots::local_to_utc(expected_time).unwrap());

    Mock::given(method("GET"))
        .and(path("/api/auth/check-email/guest%40example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "exists": false })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/appointments/create"))
        .and(body_partial_json(json!({
            "name": "Jane Doe",
            "email": "guest@example.com",
            "phone": "+60123456789",
            "treatment": "svc-cleaning",
            "appointmentTime": expected_iso,
            "status": "confirmed",
            "doctorPreference": "female",
            "notes": "Female doctor preferred\n\nfollow-up"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let mut chat = session_for(&server, SessionStore::new());

    // Keyword intent starts the flow and lists categories.
    let reply = chat.handle(ChatInput::Text("book appointment".to_string())).await;
    assert_eq!(reply.expects, InputExpectation::Choice);
    assert_eq!(reply.options, vec!["Dental"]);

    let reply = chat.handle(ChatInput::Select(0)).await;
    assert_eq!(reply.options, vec!["Cleaning - RM 120"]);

    let reply = chat.handle(ChatInput::Select(0)).await;
    assert_eq!(reply.options.len(), calendar::DATE_PAGE_SIZE);
    assert!(!reply.has_prev_page);
    assert!(reply.has_next_page);

    let reply = chat.handle(ChatInput::NextPage).await;
    assert!(reply.has_prev_page);

    // Last date of the second page, then the 10:00 AM slot (grid index 2).
    let reply = chat.handle(ChatInput::Select(5)).await;
    assert_eq!(reply.options.len(), 17);
    assert_eq!(reply.options[0], "9:00 AM (Booked)");
    assert_eq!(reply.options[2], "10:00 AM");

    // Booked slots re-ask instead of advancing.
    let reply = chat.handle(ChatInput::Select(0)).await;
    assert!(reply.messages[0].contains("already booked"));
    let reply = chat.handle(ChatInput::Select(2)).await;
    assert!(reply.messages[0].contains("full name"));

    let reply = chat.handle(ChatInput::Text("Jane Doe".to_string())).await;
    assert!(reply.messages[0].contains("email"));

    // An invalid answer re-asks the same question.
    let reply = chat.handle(ChatInput::Text("bad-email".to_string())).await;
    assert!(reply.messages[0].contains("valid email"));
    let reply = chat
        .handle(ChatInput::Text("guest@example.com".to_string()))
        .await;
    assert!(reply.messages[0].contains("phone"));

    let reply = chat.handle(ChatInput::Text("012-345 6789".to_string())).await;
    assert!(reply.messages[0].contains("address"));

    let reply = chat
        .handle(ChatInput::Text("123 Health Street".to_string()))
        .await;
    assert_eq!(
        reply.options,
        vec!["No Preference", "Male Doctor", "Female Doctor"]
    );

    let reply = chat.handle(ChatInput::Select(2)).await;
    assert_eq!(reply.expects, InputExpectation::OptionalText);

    let reply = chat.handle(ChatInput::Text("follow-up".to_string())).await;
    assert!(reply.messages[0].contains("booked successfully"));
    assert!(reply.messages[0].contains("Cleaning"));
}

#[tokio::test]
async fn registered_guest_email_is_blocked_in_chat() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/auth/check-email/taken%40example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "exists": true })))
        .mount(&server)
        .await;

    let mut chat = session_for(&server, SessionStore::new());
    chat.handle(ChatInput::Text("book".to_string())).await;
    chat.handle(ChatInput::Select(0)).await;
    chat.handle(ChatInput::Select(0)).await;
    chat.handle(ChatInput::NextPage).await;
    chat.handle(ChatInput::Select(5)).await;
    chat.handle(ChatInput::Select(2)).await;
    chat.handle(ChatInput::Text("Jane Doe".to_string())).await;

    let reply = chat
        .handle(ChatInput::Text("taken@example.com".to_string()))
        .await;
    assert!(reply.messages[0].contains("already registered"));

    // The question is re-asked; a fresh email is still accepted.
    Mock::given(method("GET"))
        .and(path("/api/auth/check-email/fresh%40example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "exists": false })))
        .mount(&server)
        .await;
    let reply = chat
        .handle(ChatInput::Text("fresh@example.com".to_string()))
        .await;
    assert!(reply.messages[0].contains("phone"));
}

#[tokio::test]
async fn managing_requires_a_session() {
    let server = MockServer::start().await;
    let mut chat = session_for(&server, SessionStore::new());

    let reply = chat
        .handle(ChatInput::Text("cancel my appointment".to_string()))
        .await;
    assert!(reply.messages[0].contains("not logged in"));
}

#[tokio::test]
async fn chat_cancellation_requires_reason_before_any_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/appointments/patient"))
        .and(query_param("email", "jane@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            confirmed_appointment("apt-1"),
            confirmed_appointment("apt-2"),
            confirmed_appointment("apt-3"),
            confirmed_appointment("apt-4"),
        ])))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/api/appointments/apt-1/status"))
        .and(body_partial_json(json!({
            "status": "cancelled",
            "notes": "feeling better"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let mut chat = session_for(&server, patient_session());

    let reply = chat
        .handle(ChatInput::Text("cancel my booking".to_string()))
        .await;
    assert_eq!(reply.options.len(), 3); // three per page
    assert!(reply.has_next_page);

    let reply = chat.handle(ChatInput::Select(0)).await;
    assert!(reply.messages[0].contains("reason for cancellation"));

    // Empty reasons never reach the network; the PUT above expects exactly
    // one call, which only the non-empty retry produces.
    let reply = chat.handle(ChatInput::Text("   ".to_string())).await;
    assert!(reply.messages[0].contains("reason for cancellation"));

    let reply = chat
        .handle(ChatInput::Text("feeling better".to_string()))
        .await;
    assert!(reply.messages[0].contains("cancelled successfully"));
}

#[tokio::test]
async fn chat_reschedule_sends_new_time_and_reason() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    let target = second_page_target();
    let expected_time = slots::date_time_from_slot(target, "2:30 PM").unwrap();
    let expected_iso = slots::to_appointment_iso(&slots::local_to_utc(expected_time).unwrap());

    Mock::given(method("GET"))
        .and(path("/api/appointments/patient"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([confirmed_appointment("apt-1")])),
        )
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/api/appointments/apt-1/reschedule"))
        .and(body_partial_json(json!({
            "newDateTime": expected_iso,
            "reason": "schedule conflict"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let mut chat = session_for(&server, patient_session());

    let reply = chat
        .handle(ChatInput::Text("reschedule my appointment".to_string()))
        .await;
    assert_eq!(reply.options.len(), 1);

    let reply = chat.handle(ChatInput::Select(0)).await;
    assert!(reply.messages[0].contains("new date"));

    chat.handle(ChatInput::NextPage).await;
    let reply = chat.handle(ChatInput::Select(5)).await;
    assert_eq!(reply.options.len(), 17);

    // 2:30 PM sits at grid index 11.
    let reply = chat.handle(ChatInput::Select(11)).await;
    assert!(reply.messages[0].contains("reason for rescheduling"));

    let reply = chat
        .handle(ChatInput::Text("schedule conflict".to_string()))
        .await;
    assert!(reply.messages[0].contains("rescheduled to"));
}
