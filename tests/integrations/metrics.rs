//! Prometheus exposition through the intake server. Installs the global
//! recorder, so it runs in its own test binary.

use reqwest::StatusCode;
use std::time::Duration;

#[path = "../helpers/mod.rs"]
mod helpers;
use helpers::{app::TestAppBuilder, booking_form};

#[tokio::test]
async fn test_metrics_endpoint_reports_bookings() {
    let app = TestAppBuilder::new()
        .with_config_modifier(|config| config.metrics.enabled = true)
        .start()
        .await
        .unwrap();

    let response = app
        .client
        .post(app.url("/api/bookings"))
        .json(&booking_form())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = app
        .client
        .get(app.url("/metrics"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("bookings_persisted_total 1"));
    assert!(body.contains("bookings_total{outcome=\"accepted\"} 1"));
    assert!(body.contains("http_request_duration_seconds"));

    app.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn test_metrics_route_absent_when_disabled() {
    let app = TestAppBuilder::new().start().await.unwrap();

    let response = app.client.get(app.url("/metrics")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    app.shutdown(Duration::from_secs(5)).await.unwrap();
}
