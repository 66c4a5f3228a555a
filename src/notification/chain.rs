//! An ordered fallback chain of webhook delivery channels.
//!
//! Channels are tried in order until one delivers. Each channel carries its
//! own timeout and retry policy. A failing channel never aborts the chain and
//! the chain itself never fails: the caller only gets a report.

use crate::core::{DeliveryChannel, WebhookPayload};
use crate::error::NotificationError;
use crate::retry::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Timeout and retry settings for one channel in the chain.
#[derive(Debug, Clone, Default)]
pub struct ChannelPolicy {
    /// Per-attempt deadline. Expiry cancels the in-flight attempt.
    pub timeout: Option<Duration>,
    pub retry: RetryPolicy,
}

struct ChannelSlot {
    channel: Arc<dyn DeliveryChannel>,
    policy: ChannelPolicy,
}

/// What happened when a payload went through the chain.
#[derive(Debug, Default)]
pub struct ChainReport {
    /// Name of the channel that delivered, if any did.
    pub delivered_by: Option<String>,
    /// Last error of every channel that was tried and failed, in order.
    pub failures: Vec<(String, NotificationError)>,
}

impl ChainReport {
    pub fn delivered(&self) -> bool {
        self.delivered_by.is_some()
    }
}

#[derive(Default)]
pub struct FallbackChain {
    slots: Vec<ChannelSlot>,
}

impl FallbackChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a channel; it is tried after every channel added before it.
    pub fn then(mut self, channel: Arc<dyn DeliveryChannel>, policy: ChannelPolicy) -> Self {
        self.slots.push(ChannelSlot { channel, policy });
        self
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.slots.iter().map(|slot| slot.channel.name()).collect()
    }

    pub async fn deliver(&self, payload: &WebhookPayload) -> ChainReport {
        let mut report = ChainReport::default();

        for slot in &self.slots {
            let name = slot.channel.name().to_string();
            let result = slot
                .policy
                .retry
                .run(&name, move |_| Self::attempt(slot, payload))
                .await;

            match result {
                Ok(_) => {
                    metrics::counter!("webhook_deliveries_total", "channel" => name.clone(), "outcome" => "success")
                        .increment(1);
                    info!(channel = %name, "Webhook delivered");
                    report.delivered_by = Some(name);
                    return report;
                }
                Err(e) => {
                    metrics::counter!("webhook_deliveries_total", "channel" => name.clone(), "outcome" => "failure")
                        .increment(1);
                    warn!(channel = %name, rounds = e.rounds(), "Webhook channel failed, trying next channel");
                    if let Some(last) = e.errors.into_iter().last() {
                        report.failures.push((name, last));
                    }
                }
            }
        }

        report
    }

    async fn attempt(slot: &ChannelSlot, payload: &WebhookPayload) -> Result<(), NotificationError> {
        match slot.policy.timeout {
            Some(timeout) => tokio::time::timeout(timeout, slot.channel.deliver(payload))
                .await
                .unwrap_or_else(|_| {
                    Err(NotificationError::Timeout {
                        channel: slot.channel.name().to_string(),
                        timeout,
                    })
                }),
            None => slot.channel.deliver(payload).await,
        }
    }
}
