//! booking-relay - booking and contact intake with best-effort notifications
//!
//! Submissions are validated, bookings are persisted through a backend
//! function, and the practice is notified through a webhook fallback chain
//! and a WhatsApp deep-link handoff.
pub mod app;
pub mod backend;
pub mod cli;
pub mod config;
pub mod core;
pub mod dispatcher;
pub mod error;
pub mod formatting;
pub mod internal_metrics;
pub mod notification;
pub mod outbox;
pub mod retry;
pub mod server;
pub mod submission;
pub mod task_manager;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export core types for convenience
pub use crate::core::*;
