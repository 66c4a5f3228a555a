//! The booking pipeline.
//!
//! A booking is validated, persisted, and then announced through every
//! notification channel. Persistence is the only step whose failure reaches
//! the person submitting the form; webhooks and the WhatsApp handoff are best
//! effort and only logged.

use crate::core::{BackendFunctions, BookingForm, BookingPayload, ContactForm, WebhookPayload};
use crate::error::DispatchError;
use crate::formatting::{MessageFormatter, WhatsAppFormatter};
use crate::notification::{FallbackChain, HandoffReport, WhatsAppHandoff};
use crate::task_manager::TaskManager;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub const BOOKING_RECEIVED_MESSAGE: &str =
    "Thank you! Partial booking received. Check your email for payment to confirm your appointment.";
pub const BOOKING_CONFIRMED_MESSAGE: &str =
    "Thank you! Your booking is saved and WhatsApp has been opened with your details.";
pub const BOOKING_HANDOFF_PENDING_MESSAGE: &str =
    "Thank you! Your booking is saved. Please open WhatsApp to send us your details.";
pub const CONTACT_MESSAGE: &str = "Opening WhatsApp to send your message...";

/// When a booking is reported back as complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionPolicy {
    /// Complete once persisted; the WhatsApp handoff runs in the background.
    #[default]
    Persistence,
    /// Wait for the handoff and report whether WhatsApp was opened.
    Handoff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Persisted; the handoff was started in the background.
    Received,
    /// Persisted and a launcher confirmed WhatsApp was opened.
    Confirmed,
    /// Persisted, but the client still has to open `whatsappUrl`.
    HandoffPending,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingReceipt {
    pub status: BookingStatus,
    pub message: String,
    pub booking_id: Option<String>,
    pub whatsapp_url: String,
    pub webhook_delivered: bool,
    /// Present only when the handoff was awaited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handoff: Option<HandoffReport>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactReceipt {
    pub message: String,
    pub whatsapp_url: String,
    pub handoff: HandoffReport,
}

pub struct BookingDispatcher {
    backend: Arc<dyn BackendFunctions>,
    webhooks: FallbackChain,
    whatsapp: Arc<WhatsAppHandoff>,
    formatter: WhatsAppFormatter,
    tasks: TaskManager,
    completion: CompletionPolicy,
    require_email: bool,
}

impl BookingDispatcher {
    pub fn new(
        backend: Arc<dyn BackendFunctions>,
        webhooks: FallbackChain,
        whatsapp: Arc<WhatsAppHandoff>,
        tasks: TaskManager,
    ) -> Self {
        Self {
            backend,
            webhooks,
            whatsapp,
            formatter: WhatsAppFormatter,
            tasks,
            completion: CompletionPolicy::default(),
            require_email: false,
        }
    }

    pub fn with_completion(mut self, completion: CompletionPolicy) -> Self {
        self.completion = completion;
        self
    }

    pub fn require_email(mut self, require: bool) -> Self {
        self.require_email = require;
        self
    }

    pub fn whatsapp(&self) -> &Arc<WhatsAppHandoff> {
        &self.whatsapp
    }

    /// Validates, persists and announces a booking.
    ///
    /// # Errors
    /// * `DispatchError::Validation` before any network call is made.
    /// * `DispatchError::Persistence` when the backend rejects the booking;
    ///   no notification is attempted in that case.
    #[instrument(skip_all)]
    pub async fn submit_booking(&self, form: &BookingForm) -> Result<BookingReceipt, DispatchError> {
        let payload = form.validate(self.require_email).inspect_err(|e| {
            debug!(error = %e, "Booking rejected by validation");
            metrics::counter!("bookings_total", "outcome" => "invalid").increment(1);
        })?;

        let booking_id = self.backend.persist_booking(&payload).await.map_err(|e| {
            metrics::counter!("bookings_total", "outcome" => "persistence_failed").increment(1);
            DispatchError::Persistence(e)
        })?;
        metrics::counter!("bookings_persisted_total").increment(1);
        info!(booking_id = ?booking_id, "Booking persisted");

        let payload = payload.with_receipt(booking_id, Utc::now());
        let webhook_delivered = self.attempt_webhook(&payload).await;

        let message = self.formatter.format(&payload);
        let whatsapp_url = self.whatsapp.deep_link(&message);

        let receipt = match self.completion {
            CompletionPolicy::Persistence => {
                // Recorded before returning so the outbox never lags the receipt.
                self.whatsapp.record(&whatsapp_url).await;
                let whatsapp = self.whatsapp.clone();
                let url = whatsapp_url.clone();
                self.tasks.spawn_cancellable("whatsapp_handoff", async move {
                    whatsapp.relaunch(url).await;
                });
                BookingReceipt {
                    status: BookingStatus::Received,
                    message: BOOKING_RECEIVED_MESSAGE.to_string(),
                    booking_id: payload.booking_id.clone(),
                    whatsapp_url,
                    webhook_delivered,
                    handoff: None,
                }
            }
            CompletionPolicy::Handoff => {
                let report = self.whatsapp.open(whatsapp_url.clone()).await;
                let (status, message) = if report.confirmed {
                    (BookingStatus::Confirmed, BOOKING_CONFIRMED_MESSAGE)
                } else {
                    (BookingStatus::HandoffPending, BOOKING_HANDOFF_PENDING_MESSAGE)
                };
                BookingReceipt {
                    status,
                    message: message.to_string(),
                    booking_id: payload.booking_id.clone(),
                    whatsapp_url,
                    webhook_delivered,
                    handoff: Some(report),
                }
            }
        };

        metrics::counter!("bookings_total", "outcome" => "accepted").increment(1);
        Ok(receipt)
    }

    /// Sends the booking through the webhook chain. Returns whether any
    /// channel delivered; failures are only logged.
    pub async fn attempt_webhook(&self, payload: &BookingPayload) -> bool {
        if self.webhooks.is_empty() {
            debug!("No webhook channels configured");
            return false;
        }
        let report = self.webhooks.deliver(&WebhookPayload::new(payload.clone())).await;
        if !report.delivered() {
            warn!(failures = report.failures.len(), "Booking webhook not delivered by any channel");
        }
        report.delivered()
    }

    /// Formats the booking and hands it off to WhatsApp, waiting for the
    /// result.
    pub async fn attempt_whatsapp_handoff(&self, payload: &BookingPayload) -> HandoffReport {
        self.whatsapp.hand_off(&self.formatter.format(payload)).await
    }

    /// Validates a contact inquiry and hands it off to WhatsApp.
    ///
    /// Nothing is persisted for inquiries, so a handoff in which every launch
    /// method failed is reported as `DispatchError::Handoff`. A handoff left to
    /// the client counts as success.
    #[instrument(skip_all)]
    pub async fn submit_contact(&self, form: &ContactForm) -> Result<ContactReceipt, DispatchError> {
        let inquiry = form.validate().inspect_err(|_| {
            metrics::counter!("contact_inquiries_total", "outcome" => "invalid").increment(1);
        })?;

        let report = self.whatsapp.hand_off(&self.formatter.format(&inquiry)).await;
        if !report.delegated && !report.opened {
            metrics::counter!("contact_inquiries_total", "outcome" => "handoff_failed").increment(1);
            return Err(DispatchError::Handoff);
        }

        metrics::counter!("contact_inquiries_total", "outcome" => "accepted").increment(1);
        Ok(ContactReceipt {
            message: CONTACT_MESSAGE.to_string(),
            whatsapp_url: report.url.clone(),
            handoff: report,
        })
    }
}
