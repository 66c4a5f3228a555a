//! # Intake Server
//!
//! An `axum` server that accepts booking and contact submissions from the
//! website and reports the outcome as JSON.
//!
//! Each submission is tracked by the mobile number (bookings) or email address
//! (contact inquiries) so a duplicate submitted while the first is in flight,
//! or while its confirmation is shown, is answered with `409 Conflict`.

use crate::core::{BookingForm, ContactForm};
use crate::dispatcher::{BookingDispatcher, BookingReceipt, ContactReceipt};
use crate::error::DispatchError;
use crate::submission::{FormState, SubmissionGuard, SubmissionTracker};
use crate::task_manager::wait_for_shutdown;
use axum::{
    extract::{MatchedPath, Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{error, trace};

/// Shared state for every handler.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<BookingDispatcher>,
    pub tracker: SubmissionTracker,
    pub prometheus: Option<PrometheusHandle>,
}

#[derive(Debug, Serialize)]
struct SubmissionStatus {
    key: String,
    state: FormState,
}

/// Builds the intake routes.
pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/api/bookings", post(create_booking))
        .route("/api/contact", post(create_contact))
        .route("/api/outbox", get(latest_outbox))
        .route("/api/submissions/{key}", get(submission_state))
        .route("/health", get(|| async { "ok" }));

    if state.prometheus.is_some() {
        router = router.route("/metrics", get(render_metrics));
    }

    router
        .route_layer(middleware::from_fn(track_latency))
        .with_state(state)
}

fn begin(tracker: &SubmissionTracker, key: Option<&str>) -> Result<Option<SubmissionGuard>, DispatchError> {
    match key.map(str::trim).filter(|k| !k.is_empty()) {
        Some(key) => tracker.begin(key).map(Some),
        None => Ok(None),
    }
}

fn finish<T>(guard: Option<SubmissionGuard>, result: &Result<T, DispatchError>) {
    if let Some(guard) = guard {
        match result {
            Ok(_) => guard.succeed(),
            Err(_) => guard.fail(),
        }
    }
}

async fn create_booking(
    State(state): State<AppState>,
    Json(form): Json<BookingForm>,
) -> Result<(StatusCode, Json<BookingReceipt>), DispatchError> {
    let guard = begin(&state.tracker, form.mobile.as_deref())?;
    let result = state.dispatcher.submit_booking(&form).await;
    finish(guard, &result);
    result.map(|receipt| (StatusCode::CREATED, Json(receipt)))
}

async fn create_contact(
    State(state): State<AppState>,
    Json(form): Json<ContactForm>,
) -> Result<Json<ContactReceipt>, DispatchError> {
    let guard = begin(&state.tracker, form.email.as_deref())?;
    let result = state.dispatcher.submit_contact(&form).await;
    finish(guard, &result);
    result.map(Json)
}

async fn latest_outbox(State(state): State<AppState>) -> Response {
    match state.dispatcher.whatsapp().outbox().latest().await {
        Some(record) => Json(record).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn submission_state(State(state): State<AppState>, Path(key): Path<String>) -> Json<SubmissionStatus> {
    let form_state = state.tracker.state(&key);
    Json(SubmissionStatus { key, state: form_state })
}

async fn render_metrics(State(state): State<AppState>) -> Response {
    match &state.prometheus {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn track_latency(request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_default();
    let start = Instant::now();
    let response = next.run(request).await;
    metrics::histogram!(
        "http_request_duration_seconds",
        "route" => route,
        "status" => response.status().as_u16().to_string()
    )
    .record(start.elapsed().as_secs_f64());
    response
}

/// The intake server bound to a listener.
pub struct IntakeServer {
    listener: TcpListener,
    state: AppState,
    shutdown_rx: watch::Receiver<bool>,
}

impl IntakeServer {
    /// Creates a new `IntakeServer` but does not spawn it.
    pub fn new(listener: TcpListener, state: AppState, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            listener,
            state,
            shutdown_rx,
        }
    }

    /// Returns a future that serves requests until a shutdown signal is
    /// received, letting in-flight requests finish.
    pub fn run(self) -> impl Future<Output = ()> {
        let app = router(self.state);
        let mut shutdown_rx = self.shutdown_rx;

        async move {
            let shutdown = async move {
                wait_for_shutdown(&mut shutdown_rx).await;
                trace!("Intake server received shutdown signal.");
            };
            if let Err(e) = axum::serve(self.listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!("Intake server error: {}", e);
            }
            trace!("Intake server task finished.");
        }
    }
}
