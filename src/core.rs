//! Core domain types and service traits for booking-relay
//!
//! This module defines the submission records that flow through the
//! dispatcher and the trait contracts for every external collaborator
//! (backend functions, webhook channels, deep-link launchers).

use crate::error::{BackendError, NotificationError};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The category of legal matter a booking is about.
///
/// Unknown categories are carried verbatim; the form only checks presence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CaseType {
    Criminal,
    Civil,
    Family,
    DrtLrt,
    Property,
    Consumer,
    Labour,
    Tax,
    Others,
    Other(String),
}

impl CaseType {
    pub fn as_str(&self) -> &str {
        match self {
            CaseType::Criminal => "criminal",
            CaseType::Civil => "civil",
            CaseType::Family => "family",
            CaseType::DrtLrt => "drt-lrt",
            CaseType::Property => "property",
            CaseType::Consumer => "consumer",
            CaseType::Labour => "labour",
            CaseType::Tax => "tax",
            CaseType::Others => "others",
            CaseType::Other(value) => value,
        }
    }
}

impl From<String> for CaseType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "criminal" => CaseType::Criminal,
            "civil" => CaseType::Civil,
            "family" => CaseType::Family,
            "drt-lrt" => CaseType::DrtLrt,
            "property" => CaseType::Property,
            "consumer" => CaseType::Consumer,
            "labour" => CaseType::Labour,
            "tax" => CaseType::Tax,
            "others" => CaseType::Others,
            _ => CaseType::Other(value),
        }
    }
}

impl From<CaseType> for String {
    fn from(value: CaseType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for CaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw appointment form input as submitted by the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingForm {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub case_type: Option<String>,
    pub time_slot: Option<String>,
    pub case_details: Option<String>,
    /// The calendar day picked in the form (`YYYY-MM-DD`). Blank or
    /// unparseable input reads as no date picked.
    #[serde(default, deserialize_with = "picked_date")]
    pub appointment_date: Option<NaiveDate>,
}

fn picked_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .and_then(|value| NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()))
}

/// A validated booking. Created once per submission and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPayload {
    pub full_name: String,
    pub mobile: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub case_type: CaseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_slot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_details: Option<String>,
    /// Human-readable date, e.g. "Monday, January 1, 2024".
    pub appointment_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
    /// RFC 3339 timestamp of when the booking was accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl BookingPayload {
    /// Returns a copy stamped with the backend-issued id and acceptance time.
    pub fn with_receipt(self, booking_id: Option<String>, accepted_at: DateTime<Utc>) -> Self {
        Self {
            booking_id,
            timestamp: Some(accepted_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ..self
        }
    }
}

/// Raw contact-page input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

/// A validated contact inquiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInquiry {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub message: String,
}

/// Body posted to the booking webhook: the booking plus its origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    #[serde(flatten)]
    pub booking: BookingPayload,
    pub source: String,
}

impl WebhookPayload {
    pub const SOURCE: &'static str = "website";

    pub fn new(booking: BookingPayload) -> Self {
        Self {
            booking,
            source: Self::SOURCE.to_string(),
        }
    }
}

/// Body sent to the backend relay function, which forwards the payload to
/// `webhook_url` on the client's behalf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    #[serde(flatten)]
    pub payload: WebhookPayload,
    pub webhook_target: String,
    pub webhook_url: String,
}

/// The ways a deep link can be opened, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchMethod {
    /// Open the link in a new window or tab.
    NewWindow,
    /// Activate a synthesized hyperlink pointing at the link.
    SyntheticLink,
    /// Load the link in a hidden embedded frame.
    HiddenFrame,
    /// Navigate the current page to the link.
    Navigate,
}

impl fmt::Display for LaunchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LaunchMethod::NewWindow => "new_window",
            LaunchMethod::SyntheticLink => "synthetic_link",
            LaunchMethod::HiddenFrame => "hidden_frame",
            LaunchMethod::Navigate => "navigate",
        };
        f.write_str(name)
    }
}

/// What a launcher could observe about its own attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// The link was positively opened.
    Confirmed,
    /// The attempt did not fail, but may have been silently suppressed.
    Unconfirmed,
}

// =============================================================================
// Service Traits
// =============================================================================

/// Named server-side functions the dispatcher delegates to.
#[async_trait]
pub trait BackendFunctions: Send + Sync {
    /// Stores a booking.
    ///
    /// # Returns
    /// * `Ok(Some(id))` when the backend issued a booking id
    /// * `Ok(None)` when the booking was stored without an id
    /// * `Err` when the booking was not stored
    async fn persist_booking(&self, payload: &BookingPayload) -> Result<Option<String>, BackendError>;

    /// Asks the backend to forward a webhook payload to an external endpoint.
    async fn relay_webhook(&self, request: &RelayRequest) -> Result<(), BackendError>;
}

/// A channel that can attempt delivery of a booking webhook payload.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// A short name for logs and metrics (e.g. "direct_webhook").
    fn name(&self) -> &str;

    /// Makes a single delivery attempt.
    async fn deliver(&self, payload: &WebhookPayload) -> Result<(), NotificationError>;
}

/// One mechanism for opening a deep link.
#[async_trait]
pub trait Launcher: Send + Sync {
    fn method(&self) -> LaunchMethod;

    /// Attempts to open `url`. An `Err` means the next mechanism should be tried.
    async fn launch(&self, url: &str) -> Result<LaunchOutcome, NotificationError>;
}
