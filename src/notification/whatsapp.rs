//! Hands a submission off to WhatsApp through a pre-filled deep link.
//!
//! An opener can be suppressed without reporting an error, so a single
//! attempt is not trusted. Each round walks the launchers in fixed method
//! order and stops at the first one that does not fail; the round only counts
//! as a success when that launcher positively confirmed. Unconfirmed rounds
//! are repeated according to the retry policy.

use crate::core::{LaunchMethod, LaunchOutcome, Launcher};
use crate::error::NotificationError;
use crate::formatting::whatsapp_deep_link;
use crate::outbox::Outbox;
use crate::retry::RetryPolicy;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Default delays between handoff rounds: rounds start at 0, 150, 450 and
/// 1250 ms.
pub const DEFAULT_ROUND_DELAYS_MS: [u64; 3] = [150, 300, 800];

/// The result of a handoff. Handoffs never fail past this boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffReport {
    pub url: String,
    /// Rounds actually run.
    pub rounds: usize,
    /// Some launcher accepted the link without failing.
    pub opened: bool,
    /// Some launcher positively confirmed the link was opened.
    pub confirmed: bool,
    /// The method that last accepted the link.
    pub method: Option<LaunchMethod>,
    /// No launchers are configured; the caller is expected to open `url`.
    pub delegated: bool,
}

pub struct WhatsAppHandoff {
    phone_number: String,
    launchers: Vec<Arc<dyn Launcher>>,
    policy: RetryPolicy,
    outbox: Arc<Outbox>,
}

impl WhatsAppHandoff {
    /// Launchers are sorted into method order; launchers sharing a method
    /// keep their relative order.
    pub fn new(
        phone_number: String,
        mut launchers: Vec<Arc<dyn Launcher>>,
        policy: RetryPolicy,
        outbox: Arc<Outbox>,
    ) -> Self {
        launchers.sort_by_key(|launcher| launcher.method());
        Self {
            phone_number,
            launchers,
            policy,
            outbox,
        }
    }

    pub fn has_launchers(&self) -> bool {
        !self.launchers.is_empty()
    }

    pub fn outbox(&self) -> &Arc<Outbox> {
        &self.outbox
    }

    pub fn deep_link(&self, message: &str) -> String {
        whatsapp_deep_link(&self.phone_number, message)
    }

    /// Builds the deep link for `message` and opens it.
    pub async fn hand_off(&self, message: &str) -> HandoffReport {
        self.open(self.deep_link(message)).await
    }

    /// Records `url` in the outbox, then runs launch rounds until one is
    /// confirmed or the policy is exhausted.
    #[instrument(skip_all)]
    pub async fn open(&self, url: String) -> HandoffReport {
        self.record(&url).await;
        self.relaunch(url).await
    }

    /// Makes `url` the outbox record. A write failure is only logged.
    pub async fn record(&self, url: &str) {
        if let Err(e) = self.outbox.record(url).await {
            warn!(error = %e, "Failed to record WhatsApp link in outbox");
        }
    }

    /// Runs launch rounds for `url` without recording it in the outbox.
    pub async fn relaunch(&self, url: String) -> HandoffReport {
        if self.launchers.is_empty() {
            debug!("No launchers configured, leaving the WhatsApp link to the caller");
            return HandoffReport {
                url,
                rounds: 0,
                opened: false,
                confirmed: false,
                method: None,
                delegated: true,
            };
        }

        let target = url.as_str();
        let result = self
            .policy
            .run("whatsapp_handoff", move |round| self.run_round(target, round))
            .await;

        match result {
            Ok(confirmed) => {
                metrics::counter!("handoff_rounds_total").increment(confirmed.rounds as u64);
                metrics::counter!("handoffs_total", "outcome" => "confirmed").increment(1);
                info!(method = %confirmed.value, rounds = confirmed.rounds, "WhatsApp opened");
                if let Err(e) = self.outbox.mark_delivered(&url).await {
                    warn!(error = %e, "Failed to mark outbox record delivered");
                }
                HandoffReport {
                    rounds: confirmed.rounds,
                    opened: true,
                    confirmed: true,
                    method: Some(confirmed.value),
                    delegated: false,
                    url,
                }
            }
            Err(e) => {
                let method = e.errors.iter().rev().find_map(|err| match err {
                    NotificationError::Unconfirmed { method } => Some(*method),
                    _ => None,
                });
                let outcome = if method.is_some() { "unconfirmed" } else { "failed" };
                metrics::counter!("handoff_rounds_total").increment(e.rounds() as u64);
                metrics::counter!("handoffs_total", "outcome" => outcome).increment(1);
                warn!(rounds = e.rounds(), outcome, "WhatsApp handoff not confirmed; link kept in outbox");
                HandoffReport {
                    rounds: e.rounds(),
                    opened: method.is_some(),
                    confirmed: false,
                    method,
                    delegated: false,
                    url,
                }
            }
        }
    }

    async fn run_round(&self, url: &str, round: usize) -> Result<LaunchMethod, NotificationError> {
        for launcher in &self.launchers {
            let method = launcher.method();
            match launcher.launch(url).await {
                Ok(LaunchOutcome::Confirmed) => return Ok(method),
                Ok(LaunchOutcome::Unconfirmed) => {
                    return Err(NotificationError::Unconfirmed { method });
                }
                Err(e) => {
                    debug!(round, %method, error = %e, "Launch method failed, trying next");
                }
            }
        }
        Err(NotificationError::NoLauncher)
    }
}
