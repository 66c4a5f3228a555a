//! booking-relay - Booking and contact intake service
//!
//! Accepts appointment bookings and contact inquiries from the website,
//! persists bookings, and forwards every submission to the practice.

use anyhow::Result;
use booking_relay::{app::App, cli::Cli, config::Config};
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(err) => {
            init_tracing("error");
            error!("Failed to load configuration: {}", err);
            std::process::exit(1);
        }
    };

    init_tracing(&config.log_level);

    info!("booking-relay starting up...");
    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("Listen Address: {}", config.server.listen_addr);
    info!("Backend: {}", config.backend.base_url);
    info!(
        "Direct Webhook: {}",
        if config.webhook.url.is_some() { "Enabled" } else { "Disabled" }
    );
    info!(
        "Webhook Relay: {}",
        if config.webhook.relay_destination.is_some() { "Enabled" } else { "Disabled" }
    );
    info!("WhatsApp Launchers: {}", config.whatsapp.launcher_configs().len());
    info!("Completion Policy: {:?}", config.form.completion);
    info!("Metrics: {}", if config.metrics.enabled { "Enabled" } else { "Disabled" });
    info!("-------------------------------------------------------");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let app = App::builder(config).build(shutdown_rx).await?;
    info!(address = %app.local_addr(), "booking-relay initialized successfully.");

    let run = tokio::spawn(app.run());

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Shutting down gracefully...");
    if shutdown_tx.send(true).is_err() {
        error!("Application already stopped before the shutdown signal was sent");
    }

    match run.await {
        Ok(result) => result?,
        Err(e) => error!("Application task panicked: {:?}", e),
    }

    info!("All tasks shut down. Exiting.");
    Ok(())
}
