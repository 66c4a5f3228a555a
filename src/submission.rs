//! Per-submission form state.
//!
//! A form moves `Idle -> Submitting -> {Submitted | Failed}`. `Submitted` is
//! shown for a fixed display window and then reads as `Idle` again. While a
//! key is `Submitting` or inside its display window a new submission for the
//! same key is refused, which is what a disabled submit button does in the
//! browser.

use crate::error::DispatchError;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// The display window used by every form variant.
pub const DEFAULT_DISPLAY_WINDOW: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormState {
    Idle,
    Submitting,
    Submitted,
    Failed,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    state: FormState,
    since: Instant,
}

#[derive(Debug, Clone)]
pub struct SubmissionTracker {
    display_window: Duration,
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl Default for SubmissionTracker {
    fn default() -> Self {
        Self::new(DEFAULT_DISPLAY_WINDOW)
    }
}

impl SubmissionTracker {
    pub fn new(display_window: Duration) -> Self {
        Self {
            display_window,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn normalize(key: &str) -> String {
        key.trim().to_lowercase()
    }

    /// Current state for `key`. Expired entries are dropped on read.
    pub fn state(&self, key: &str) -> FormState {
        let key = Self::normalize(key);
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        self.current(&mut entries, &key)
    }

    fn current(&self, entries: &mut HashMap<String, Entry>, key: &str) -> FormState {
        match entries.get(key).copied() {
            None => FormState::Idle,
            Some(entry) if self.expired(&entry) => {
                entries.remove(key);
                FormState::Idle
            }
            Some(entry) => entry.state,
        }
    }

    fn expired(&self, entry: &Entry) -> bool {
        matches!(entry.state, FormState::Submitted | FormState::Failed)
            && entry.since.elapsed() >= self.display_window
    }

    /// Starts a submission for `key`.
    ///
    /// # Returns
    /// * A guard that must be resolved with `succeed` or `fail`; dropping it
    ///   unresolved marks the submission failed.
    /// * `Err(DispatchError::Busy)` while the key is submitting or its
    ///   confirmation is still displayed.
    pub fn begin(&self, key: &str) -> Result<SubmissionGuard, DispatchError> {
        let key = Self::normalize(key);
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|_, entry| !self.expired(entry));
        match self.current(&mut entries, &key) {
            FormState::Submitting | FormState::Submitted => {
                debug!(key = %key, "Rejecting duplicate submission");
                Err(DispatchError::Busy)
            }
            FormState::Idle | FormState::Failed => {
                entries.insert(
                    key.clone(),
                    Entry {
                        state: FormState::Submitting,
                        since: Instant::now(),
                    },
                );
                Ok(SubmissionGuard {
                    key,
                    entries: self.entries.clone(),
                    resolved: false,
                })
            }
        }
    }
}

/// An in-flight submission.
#[derive(Debug)]
pub struct SubmissionGuard {
    key: String,
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    resolved: bool,
}

impl SubmissionGuard {
    pub fn succeed(mut self) {
        self.resolve(FormState::Submitted);
    }

    pub fn fail(mut self) {
        self.resolve(FormState::Failed);
    }

    fn resolve(&mut self, state: FormState) {
        self.resolved = true;
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            self.key.clone(),
            Entry {
                state,
                since: Instant::now(),
            },
        );
    }
}

impl Drop for SubmissionGuard {
    fn drop(&mut self) {
        if !self.resolved {
            self.resolve(FormState::Failed);
        }
    }
}
