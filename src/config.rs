//! Configuration management for booking-relay
//!
//! This module defines the main `Config` struct and its sub-structs. It uses
//! the `figment` crate to layer built-in defaults, a TOML file, environment
//! variables prefixed with `BOOKING_RELAY_` and finally command-line flags.

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Cli;
use crate::dispatcher::CompletionPolicy;
use crate::notification::whatsapp::DEFAULT_ROUND_DELAYS_MS;
use crate::notification::{CommandLauncher, LauncherConfig};
use crate::retry::RetryPolicy;

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The logging level, as an `EnvFilter` directive.
    pub log_level: String,
    /// The HTTP intake server.
    pub server: ServerConfig,
    /// The backend functions used for persistence and the webhook relay.
    pub backend: BackendConfig,
    /// Webhook notification channels.
    pub webhook: WebhookConfig,
    /// WhatsApp deep-link handoff.
    pub whatsapp: WhatsAppConfig,
    /// The local outbox record.
    pub outbox: OutboxConfig,
    /// Form behaviour.
    pub form: FormConfig,
    /// Prometheus exporter.
    pub metrics: MetricsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the functions host; functions live under `/functions/v1/`.
    pub base_url: String,
    /// Sent as both a bearer token and an `apikey` header.
    pub api_key: Option<String>,
    /// Function that stores a booking and may return a `bookingId`.
    pub persist_function: String,
    /// Function that forwards a webhook payload on our behalf.
    pub relay_function: String,
    pub timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:54321".to_string(),
            api_key: None,
            persist_function: "save-to-sheets".to_string(),
            relay_function: "send-appointment-email".to_string(),
            timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct WebhookConfig {
    /// Direct webhook endpoint. Without it only the relay is tried.
    pub url: Option<String>,
    /// Destination the relay forwards to. Without it the relay is skipped.
    pub relay_destination: Option<String>,
    /// Routing tag sent to the relay function as `webhookTarget`.
    pub relay_target: String,
    /// Per-attempt deadline for the direct webhook.
    pub timeout_ms: u64,
    /// Delays between direct webhook attempts. Empty means a single attempt.
    pub retry_delays_ms: Vec<u64>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            relay_destination: None,
            relay_target: "n8n".to_string(),
            timeout_ms: 8_000,
            retry_delays_ms: Vec::new(),
        }
    }
}

impl WebhookConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_millis(&self.retry_delays_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct WhatsAppConfig {
    /// The practice's number in international format, digits only.
    pub phone_number: String,
    /// Delays between handoff rounds.
    pub retry_delays_ms: Vec<u64>,
    /// Launchers to open the deep link with. Empty hands the link back to
    /// the client in the receipt.
    pub launchers: Vec<LauncherConfig>,
    /// Add the platform's default URL opener as a `new_window` launcher.
    pub system_opener: bool,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            phone_number: "918013763607".to_string(),
            retry_delays_ms: DEFAULT_ROUND_DELAYS_MS.to_vec(),
            launchers: Vec::new(),
            system_opener: false,
        }
    }
}

impl WhatsAppConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_millis(&self.retry_delays_ms)
    }

    /// Configured launchers, plus the system opener when enabled.
    pub fn launcher_configs(&self) -> Vec<LauncherConfig> {
        let mut launchers = self.launchers.clone();
        if self.system_opener {
            launchers.push(CommandLauncher::system_opener());
        }
        launchers
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct OutboxConfig {
    /// File holding the last WhatsApp link. In memory only when unset.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct FormConfig {
    /// Require an email address on bookings.
    pub require_email: bool,
    /// How long a successful submission blocks a resubmission.
    pub display_seconds: u64,
    /// When a booking counts as complete.
    pub completion: CompletionPolicy,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            require_email: false,
            display_seconds: 5,
            completion: CompletionPolicy::Persistence,
        }
    }
}

impl FormConfig {
    pub fn display_window(&self) -> Duration {
        Duration::from_secs(self.display_seconds)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder and serve `GET /metrics`.
    pub enabled: bool,
}

impl Config {
    /// Loads the configuration.
    ///
    /// Sources are merged in increasing precedence: defaults, the TOML file
    /// named by `--config` (if any), `BOOKING_RELAY_*` environment variables
    /// with `__` separating nested keys, then command-line flags.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if let Some(path) = &cli.config {
            figment = figment.merge(Toml::file(path));
        }
        let config: Config = figment
            // e.g. BOOKING_RELAY_WEBHOOK__URL=https://hooks.example.com/booking
            .merge(Env::prefixed("BOOKING_RELAY_").split("__"))
            .merge(cli.clone())
            .extract()?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            server: ServerConfig {
                listen_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            },
            backend: BackendConfig::default(),
            webhook: WebhookConfig::default(),
            whatsapp: WhatsAppConfig::default(),
            outbox: OutboxConfig::default(),
            form: FormConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}
