//! Fakes for the service traits, shared by unit and integration tests.

use crate::core::{
    BackendFunctions, BookingPayload, DeliveryChannel, LaunchMethod, LaunchOutcome, Launcher,
    RelayRequest, WebhookPayload,
};
use crate::error::{BackendError, NotificationError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Fake backend functions that record every call.
///
/// Persist calls succeed with ids `BK-1`, `BK-2`, ... unless a failure was
/// queued with [`FakeBackend::fail_next_persist`].
#[derive(Default)]
pub struct FakeBackend {
    persisted: Arc<Mutex<Vec<BookingPayload>>>,
    relayed: Arc<Mutex<Vec<RelayRequest>>>,
    persist_failures: Arc<Mutex<VecDeque<u16>>>,
    relay_failure: Arc<Mutex<Option<u16>>>,
    issue_ids: bool,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            issue_ids: true,
            ..Default::default()
        }
    }

    /// A backend that stores bookings without issuing ids.
    pub fn without_ids() -> Self {
        Self::default()
    }

    pub fn fail_next_persist(&self, status: u16) {
        self.persist_failures.lock().unwrap().push_back(status);
    }

    pub fn fail_relay(&self, status: u16) {
        *self.relay_failure.lock().unwrap() = Some(status);
    }

    pub fn persisted(&self) -> Vec<BookingPayload> {
        self.persisted.lock().unwrap().clone()
    }

    pub fn relayed(&self) -> Vec<RelayRequest> {
        self.relayed.lock().unwrap().clone()
    }

    fn status_error(function: &str, status: u16) -> BackendError {
        BackendError::Status {
            function: function.to_string(),
            status,
            body: "fake failure".to_string(),
        }
    }
}

#[async_trait]
impl BackendFunctions for FakeBackend {
    async fn persist_booking(&self, payload: &BookingPayload) -> Result<Option<String>, BackendError> {
        if let Some(status) = self.persist_failures.lock().unwrap().pop_front() {
            return Err(Self::status_error("save-to-sheets", status));
        }
        let mut persisted = self.persisted.lock().unwrap();
        persisted.push(payload.clone());
        Ok(self.issue_ids.then(|| format!("BK-{}", persisted.len())))
    }

    async fn relay_webhook(&self, request: &RelayRequest) -> Result<(), BackendError> {
        self.relayed.lock().unwrap().push(request.clone());
        match *self.relay_failure.lock().unwrap() {
            Some(status) => Err(Self::status_error("send-appointment-email", status)),
            None => Ok(()),
        }
    }
}

/// How a [`FakeChannel`] responds to every delivery.
#[derive(Debug, Clone)]
pub enum ChannelBehavior {
    Succeed,
    FailStatus(u16),
    /// Sleep for the duration, then succeed.
    Hang(Duration),
}

pub struct FakeChannel {
    name: String,
    behavior: ChannelBehavior,
    delivered: Arc<Mutex<Vec<WebhookPayload>>>,
    calls: Arc<Mutex<usize>>,
}

impl FakeChannel {
    pub fn new(name: &str, behavior: ChannelBehavior) -> Self {
        Self {
            name: name.to_string(),
            behavior,
            delivered: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    pub fn delivered(&self) -> Vec<WebhookPayload> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeliveryChannel for FakeChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&self, payload: &WebhookPayload) -> Result<(), NotificationError> {
        *self.calls.lock().unwrap() += 1;
        match &self.behavior {
            ChannelBehavior::Succeed => {}
            ChannelBehavior::FailStatus(status) => {
                return Err(NotificationError::WebhookStatus(*status));
            }
            ChannelBehavior::Hang(duration) => tokio::time::sleep(*duration).await,
        }
        self.delivered.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

/// A launcher with scripted outcomes. `None` in the script means the launch
/// fails; once the script runs out, `fallback` is used for every call.
pub struct FakeLauncher {
    method: LaunchMethod,
    script: Mutex<VecDeque<Option<LaunchOutcome>>>,
    fallback: Option<LaunchOutcome>,
    calls: Mutex<Vec<(Instant, String)>>,
}

impl FakeLauncher {
    pub fn scripted(method: LaunchMethod, script: Vec<Option<LaunchOutcome>>) -> Self {
        Self {
            method,
            script: Mutex::new(script.into()),
            fallback: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn always(method: LaunchMethod, outcome: Option<LaunchOutcome>) -> Self {
        Self {
            fallback: outcome,
            ..Self::scripted(method, Vec::new())
        }
    }

    pub fn confirming(method: LaunchMethod) -> Self {
        Self::always(method, Some(LaunchOutcome::Confirmed))
    }

    pub fn unconfirmed(method: LaunchMethod) -> Self {
        Self::always(method, Some(LaunchOutcome::Unconfirmed))
    }

    pub fn failing(method: LaunchMethod) -> Self {
        Self::always(method, None)
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(_, url)| url.clone()).collect()
    }

    /// Time of each call relative to the first one.
    pub fn call_offsets(&self) -> Vec<Duration> {
        let calls = self.calls.lock().unwrap();
        let Some((first, _)) = calls.first() else {
            return Vec::new();
        };
        calls.iter().map(|(at, _)| at.duration_since(*first)).collect()
    }
}

#[async_trait]
impl Launcher for FakeLauncher {
    fn method(&self) -> LaunchMethod {
        self.method
    }

    async fn launch(&self, url: &str) -> Result<LaunchOutcome, NotificationError> {
        self.calls.lock().unwrap().push((Instant::now(), url.to_string()));
        let next = self.script.lock().unwrap().pop_front().unwrap_or(self.fallback);
        next.ok_or(NotificationError::Launch {
            method: self.method,
            reason: "fake launcher failure".to_string(),
        })
    }
}
