//! The intake server driven over real HTTP.

use booking_relay::{
    core::{LaunchMethod, Launcher},
    dispatcher::{BOOKING_RECEIVED_MESSAGE, CONTACT_MESSAGE},
    formatting::message_from_deep_link,
    test_utils::{FakeBackend, FakeLauncher},
};
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

#[path = "../helpers/mod.rs"]
mod helpers;
use helpers::{app::TestAppBuilder, booking_form, contact_form};

#[tokio::test]
async fn test_health() {
    let app = TestAppBuilder::new().start().await.unwrap();

    let response = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "ok");

    app.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn test_booking_accepted() {
    let app = TestAppBuilder::new().start().await.unwrap();

    let response = app
        .client
        .post(app.url("/api/bookings"))
        .json(&booking_form())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "received");
    assert_eq!(body["message"], BOOKING_RECEIVED_MESSAGE);
    assert_eq!(body["bookingId"], "BK-1");
    assert_eq!(body["webhookDelivered"], false);

    let url = body["whatsappUrl"].as_str().unwrap();
    assert!(url.starts_with("https://wa.me/918013763607?text="));
    let message = message_from_deep_link(url).unwrap();
    assert!(message.contains("Booking ID: BK-1\nName: A\nMobile: 9999999999\nEmail: a@example.com\nCase Type: criminal\nTime Slot: 1 PM\n"));

    let persisted = app.backend.persisted();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].appointment_date, "Monday, January 1, 2024");

    app.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn test_missing_date_is_bad_request() {
    let app = TestAppBuilder::new().start().await.unwrap();

    let mut form = booking_form();
    form.appointment_date = None;
    let response = app
        .client
        .post(app.url("/api/bookings"))
        .json(&form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Please select an appointment date");
    assert!(app.backend.persisted().is_empty());

    app.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn test_blank_or_malformed_date_is_bad_request() {
    let app = TestAppBuilder::new().start().await.unwrap();

    for date in ["", "not-a-date"] {
        let mut form = serde_json::to_value(booking_form()).unwrap();
        form["appointmentDate"] = Value::from(date);
        let response = app
            .client
            .post(app.url("/api/bookings"))
            .json(&form)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "date {date:?}");
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], "Please select an appointment date");
    }
    assert!(app.backend.persisted().is_empty());

    app.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn test_persistence_failure_is_bad_gateway() {
    let backend = Arc::new(FakeBackend::new());
    backend.fail_next_persist(500);
    let app = TestAppBuilder::new().with_backend(backend).start().await.unwrap();

    let response = app
        .client
        .post(app.url("/api/bookings"))
        .json(&booking_form())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Failed to book appointment. Please try again.");

    let state: Value = app
        .client
        .get(app.url("/api/submissions/9999999999"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(state["state"], "failed");

    app.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn test_resubmission_within_display_window_conflicts() {
    let app = TestAppBuilder::new().start().await.unwrap();

    let first = app
        .client
        .post(app.url("/api/bookings"))
        .json(&booking_form())
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let state: Value = app
        .client
        .get(app.url("/api/submissions/9999999999"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(state["state"], "submitted");

    let second = app
        .client
        .post(app.url("/api/bookings"))
        .json(&booking_form())
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(app.backend.persisted().len(), 1);

    app.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn test_contact_and_outbox() {
    let launcher = Arc::new(FakeLauncher::confirming(LaunchMethod::NewWindow));
    let app = TestAppBuilder::new()
        .with_launchers(vec![launcher.clone() as Arc<dyn Launcher>])
        .start()
        .await
        .unwrap();

    let empty = app.client.get(app.url("/api/outbox")).send().await.unwrap();
    assert_eq!(empty.status(), StatusCode::NO_CONTENT);

    let response = app
        .client
        .post(app.url("/api/contact"))
        .json(&contact_form())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], CONTACT_MESSAGE);
    assert_eq!(body["handoff"]["confirmed"], true);
    assert_eq!(body["handoff"]["method"], "new_window");
    assert_eq!(launcher.calls(), 1);

    let record: Value = app
        .client
        .get(app.url("/api/outbox"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(record["whatsapp_backup_url"], body["whatsappUrl"]);
    assert_eq!(record["delivered"], true);

    app.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn test_contact_handoff_failure_is_bad_gateway() {
    let app = TestAppBuilder::new()
        .with_launchers(vec![Arc::new(FakeLauncher::failing(LaunchMethod::NewWindow)) as Arc<dyn Launcher>])
        .with_config_modifier(|config| config.whatsapp.retry_delays_ms = vec![1])
        .start()
        .await
        .unwrap();

    let response = app
        .client
        .post(app.url("/api/contact"))
        .json(&contact_form())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Failed to open WhatsApp. Please try again.");

    app.shutdown(Duration::from_secs(5)).await.unwrap();
}
