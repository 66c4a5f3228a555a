//! Best-effort notification channels.
//!
//! Nothing in this module reports failure to its caller as an error. Webhook
//! channels are composed into a [`chain::FallbackChain`] and the WhatsApp
//! handoff produces a [`whatsapp::HandoffReport`]; failures are logged and
//! counted, never propagated.
pub mod chain;
pub mod launcher;
pub mod relay;
pub mod webhook;
pub mod whatsapp;

pub use chain::{ChainReport, ChannelPolicy, FallbackChain};
pub use launcher::{CommandLauncher, LauncherConfig};
pub use relay::RelayWebhook;
pub use webhook::DirectWebhook;
pub use whatsapp::{HandoffReport, WhatsAppHandoff};
