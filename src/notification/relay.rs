//! A channel that asks the backend to call the webhook on our behalf.
//!
//! Used when the direct call cannot get through (TLS or network restrictions
//! on the client side); the backend function reaches the same destination.

use crate::core::{BackendFunctions, DeliveryChannel, RelayRequest, WebhookPayload};
use crate::error::NotificationError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument};

pub struct RelayWebhook {
    backend: Arc<dyn BackendFunctions>,
    target: String,
    destination_url: String,
}

impl RelayWebhook {
    pub fn new(backend: Arc<dyn BackendFunctions>, target: String, destination_url: String) -> Self {
        Self {
            backend,
            target,
            destination_url,
        }
    }
}

#[async_trait]
impl DeliveryChannel for RelayWebhook {
    fn name(&self) -> &str {
        "backend_relay"
    }

    #[instrument(skip(self, payload), fields(target = %self.target))]
    async fn deliver(&self, payload: &WebhookPayload) -> Result<(), NotificationError> {
        let request = RelayRequest {
            payload: payload.clone(),
            webhook_target: self.target.clone(),
            webhook_url: self.destination_url.clone(),
        };
        self.backend.relay_webhook(&request).await?;
        info!("Webhook relayed through backend");
        Ok(())
    }
}
