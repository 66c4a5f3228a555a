//! Undelivered WhatsApp links left by a previous run.

use booking_relay::{
    core::{LaunchMethod, Launcher},
    outbox::OutboxRecord,
    test_utils::FakeLauncher,
};
use chrono::Utc;
use reqwest::StatusCode;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[path = "../helpers/mod.rs"]
mod helpers;
use helpers::app::TestAppBuilder;

const LEFTOVER_URL: &str = "https://wa.me/918013763607?text=left%20over";

async fn write_record(path: &Path, delivered: bool) {
    let record = OutboxRecord {
        whatsapp_backup_url: LEFTOVER_URL.to_string(),
        recorded_at: Utc::now(),
        delivered,
    };
    tokio::fs::write(path, serde_json::to_vec(&record).unwrap())
        .await
        .unwrap();
}

async fn wait_for_calls(launcher: &FakeLauncher, expected: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while launcher.calls() < expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("launcher was not called in time");
}

async fn wait_for_removal(path: &Path) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while path.exists() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("outbox record was not cleared in time");
}

#[tokio::test]
async fn test_pending_record_is_reoffered_once_then_cleared() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("outbox.json");
    write_record(&path, false).await;

    let launcher = Arc::new(FakeLauncher::confirming(LaunchMethod::NewWindow));
    let outbox_path = path.clone();
    let app = TestAppBuilder::new()
        .with_launchers(vec![launcher.clone() as Arc<dyn Launcher>])
        .with_config_modifier(move |config| config.outbox.path = Some(outbox_path))
        .start()
        .await
        .unwrap();

    wait_for_calls(&launcher, 1).await;
    wait_for_removal(&path).await;
    assert_eq!(launcher.urls(), vec![LEFTOVER_URL.to_string()]);

    let response = app.client.get(app.url("/api/outbox")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    app.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn test_shutdown_during_flush_keeps_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("outbox.json");
    write_record(&path, false).await;

    let launcher = Arc::new(FakeLauncher::unconfirmed(LaunchMethod::NewWindow));
    let outbox_path = path.clone();
    let app = TestAppBuilder::new()
        .with_launchers(vec![launcher.clone() as Arc<dyn Launcher>])
        .with_config_modifier(move |config| config.outbox.path = Some(outbox_path))
        .start()
        .await
        .unwrap();

    wait_for_calls(&launcher, 1).await;
    app.shutdown(Duration::from_secs(5)).await.unwrap();

    assert!(launcher.calls() < 4);
    let on_disk: OutboxRecord = serde_json::from_slice(&tokio::fs::read(&path).await.unwrap()).unwrap();
    assert_eq!(on_disk.whatsapp_backup_url, LEFTOVER_URL);
    assert!(!on_disk.delivered);
}

#[tokio::test]
async fn test_delivered_record_is_not_reoffered() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("outbox.json");
    write_record(&path, true).await;

    let launcher = Arc::new(FakeLauncher::confirming(LaunchMethod::NewWindow));
    let outbox_path = path.clone();
    let app = TestAppBuilder::new()
        .with_launchers(vec![launcher.clone() as Arc<dyn Launcher>])
        .with_config_modifier(move |config| config.outbox.path = Some(outbox_path))
        .start()
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(launcher.calls(), 0);
    assert!(path.exists());

    app.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn test_pending_record_kept_for_client_without_launchers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("outbox.json");
    write_record(&path, false).await;

    let outbox_path = path.clone();
    let app = TestAppBuilder::new()
        .with_config_modifier(move |config| config.outbox.path = Some(outbox_path))
        .start()
        .await
        .unwrap();

    let record: OutboxRecord = app
        .client
        .get(app.url("/api/outbox"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(record.whatsapp_backup_url, LEFTOVER_URL);
    assert!(!record.delivered);
    assert!(path.exists());

    app.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn test_new_booking_overwrites_record_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("outbox.json");
    write_record(&path, false).await;

    let outbox_path = path.clone();
    let app = TestAppBuilder::new()
        .with_config_modifier(move |config| {
            config.outbox.path = Some(outbox_path);
            config.form.completion = booking_relay::dispatcher::CompletionPolicy::Handoff;
        })
        .start()
        .await
        .unwrap();

    let body: serde_json::Value = app
        .client
        .post(app.url("/api/bookings"))
        .json(&helpers::booking_form())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "handoff_pending");
    assert_eq!(body["handoff"]["delegated"], true);

    let on_disk: OutboxRecord = serde_json::from_slice(&tokio::fs::read(&path).await.unwrap()).unwrap();
    assert_eq!(on_disk.whatsapp_backup_url, body["whatsappUrl"].as_str().unwrap());

    app.shutdown(Duration::from_secs(5)).await.unwrap();
}
