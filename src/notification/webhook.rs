//! A channel that posts the booking straight to the practice's webhook.

use crate::core::{DeliveryChannel, WebhookPayload};
use crate::error::NotificationError;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use tracing::{error, info, instrument};

/// Posts webhook payloads to a fixed URL. Any 2xx status counts as delivered.
pub struct DirectWebhook {
    client: reqwest::Client,
    url: String,
}

impl DirectWebhook {
    pub fn new(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl DeliveryChannel for DirectWebhook {
    fn name(&self) -> &str {
        "direct_webhook"
    }

    #[instrument(skip(self, payload), fields(url = %self.url))]
    async fn deliver(&self, payload: &WebhookPayload) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(&self.url)
            .header(ACCEPT, "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Direct webhook request failed");
                NotificationError::WebhookTransport(e)
            })?;

        let status = response.status();
        if status.is_success() {
            info!(status = %status, "Direct webhook called successfully");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Direct webhook responded with an error status");
            Err(NotificationError::WebhookStatus(status.as_u16()))
        }
    }
}
