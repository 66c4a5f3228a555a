//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using the
//! `clap` crate. These arguments are parsed at startup and then merged on top
//! of the TOML file and environment variables.

use clap::Parser;
use figment::{
    value::{Dict, Map, Value},
    Error, Metadata, Profile, Provider,
};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Booking and contact intake service with best-effort notifications.
#[derive(Parser, Debug, Default, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Address the intake server listens on.
    #[arg(short, long, value_name = "ADDR")]
    pub listen: Option<SocketAddr>,

    /// Direct webhook URL for booking notifications.
    #[arg(long, value_name = "URL")]
    pub webhook_url: Option<String>,

    /// WhatsApp number that receives handoffs.
    #[arg(long, value_name = "NUMBER")]
    pub phone_number: Option<String>,

    /// Log level or `EnvFilter` directive.
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Serve Prometheus metrics on `/metrics`.
    #[arg(long)]
    pub metrics: bool,
}

fn nested(section: &str, key: &str, value: Value) -> (String, Value) {
    let mut inner = Dict::new();
    inner.insert(key.to_string(), value);
    (section.to_string(), Value::from(inner))
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(addr) = self.listen {
            let (k, v) = nested("server", "listen_addr", Value::from(addr.to_string()));
            dict.insert(k, v);
        }

        if let Some(url) = &self.webhook_url {
            let (k, v) = nested("webhook", "url", Value::from(url.clone()));
            dict.insert(k, v);
        }

        if let Some(phone) = &self.phone_number {
            let (k, v) = nested("whatsapp", "phone_number", Value::from(phone.clone()));
            dict.insert(k, v);
        }

        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }

        // A bare flag can only switch metrics on; leaving it off defers to
        // the file and environment.
        if self.metrics {
            let (k, v) = nested("metrics", "enabled", Value::from(true));
            dict.insert(k, v);
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
