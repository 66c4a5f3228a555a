//! Error types for the booking pipeline.
//!
//! Only `ValidationError` and `PersistenceError` (surfaced as
//! `DispatchError::Persistence`) ever reach the person filling in the form.
//! `NotificationError` is caught at the channel boundary and only logged.

use crate::core::LaunchMethod;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// A required form field was missing or blank.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please select an appointment date")]
    MissingDate,

    #[error("Please fill in all required fields ({0} is missing)")]
    MissingField(&'static str),
}

/// A backend function call failed.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("backend function '{function}' responded with status {status}: {body}")]
    Status {
        function: String,
        status: u16,
        body: String,
    },

    #[error("backend function '{function}' could not be reached: {source}")]
    Transport {
        function: String,
        #[source]
        source: reqwest::Error,
    },
}

/// A best-effort notification channel failed. Never shown to the user.
#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("webhook responded with status {0}")]
    WebhookStatus(u16),

    #[error("webhook request failed: {0}")]
    WebhookTransport(#[from] reqwest::Error),

    #[error("{channel} timed out after {timeout:?}")]
    Timeout { channel: String, timeout: Duration },

    #[error("relay through backend failed: {0}")]
    Relay(#[from] BackendError),

    #[error("{method} failed: {reason}")]
    Launch { method: LaunchMethod, reason: String },

    #[error("{method} did not confirm that the link was opened")]
    Unconfirmed { method: LaunchMethod },

    #[error("every launch method failed")]
    NoLauncher,
}

/// Reading or writing the outbox record failed.
#[derive(Error, Debug)]
pub enum OutboxError {
    #[error("outbox I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("outbox record is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// The user-visible outcome of a rejected submission.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to book appointment. Please try again.")]
    Persistence(#[source] BackendError),

    #[error("A submission is already in progress")]
    Busy,

    #[error("Failed to open WhatsApp. Please try again.")]
    Handoff,
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = match &self {
            DispatchError::Validation(_) => StatusCode::BAD_REQUEST,
            DispatchError::Busy => StatusCode::CONFLICT,
            DispatchError::Persistence(e) => {
                tracing::error!(error = %e, "Booking persistence failed");
                StatusCode::BAD_GATEWAY
            }
            DispatchError::Handoff => StatusCode::BAD_GATEWAY,
        };

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
