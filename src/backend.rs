//! Client for the named backend functions that store bookings and relay
//! webhooks.
//!
//! Functions are invoked as `POST {base_url}/functions/v1/{name}` with a JSON
//! body. Any non-2xx response is an error.

use crate::config::BackendConfig;
use crate::core::{BackendFunctions, BookingPayload, RelayRequest};
use crate::error::BackendError;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, instrument};

pub struct FunctionsClient {
    client: reqwest::Client,
    base_url: String,
    persist_function: String,
    relay_function: String,
}

impl FunctionsClient {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", key))?);
            headers.insert("apikey", HeaderValue::from_str(key)?);
        }
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            persist_function: config.persist_function.clone(),
            relay_function: config.relay_function.clone(),
        })
    }

    fn function_url(&self, name: &str) -> String {
        format!("{}/functions/v1/{}", self.base_url, name)
    }

    /// Invokes the function `name` and returns its JSON response, or
    /// `Value::Null` for an empty body. Non-JSON bodies come back as a string.
    #[instrument(skip(self, body))]
    pub async fn invoke<B: Serialize + ?Sized>(&self, name: &str, body: &B) -> Result<Value, BackendError> {
        let transport = |source| BackendError::Transport {
            function: name.to_string(),
            source,
        };

        let response = self
            .client
            .post(self.function_url(name))
            .json(body)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let text = response.text().await.map_err(transport)?;

        if !status.is_success() {
            error!(status = %status, body = %text, "Backend function call failed");
            return Err(BackendError::Status {
                function: name.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        debug!(status = %status, "Backend function call succeeded");
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }
}

fn booking_id_from(response: &Value) -> Option<String> {
    match response.get("bookingId")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl BackendFunctions for FunctionsClient {
    async fn persist_booking(&self, payload: &BookingPayload) -> Result<Option<String>, BackendError> {
        let response = self.invoke(&self.persist_function, payload).await?;
        Ok(booking_id_from(&response))
    }

    async fn relay_webhook(&self, request: &RelayRequest) -> Result<(), BackendError> {
        self.invoke(&self.relay_function, request).await.map(|_| ())
    }
}
