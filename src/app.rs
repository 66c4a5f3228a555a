//! The main application logic, decoupled from the entry point.

use crate::{
    backend::FunctionsClient,
    config::{Config, WebhookConfig},
    core::{BackendFunctions, Launcher},
    dispatcher::BookingDispatcher,
    internal_metrics,
    notification::{ChannelPolicy, CommandLauncher, DirectWebhook, FallbackChain, RelayWebhook, WhatsAppHandoff},
    outbox::Outbox,
    server::{AppState, IntakeServer},
    submission::SubmissionTracker,
    task_manager::{wait_for_shutdown, TaskManager},
};
use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

/// A handle to the running application.
pub struct App {
    task_manager: TaskManager,
    local_addr: SocketAddr,
    dispatcher: Arc<BookingDispatcher>,
}

impl App {
    /// Creates a new `AppBuilder` to construct an `App`.
    pub fn builder(config: Config) -> AppBuilder {
        AppBuilder::new(config)
    }

    /// The address the intake server is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn dispatcher(&self) -> &Arc<BookingDispatcher> {
        &self.dispatcher
    }

    /// Waits for the shutdown signal and then gracefully shuts down all tasks.
    pub async fn run(self) -> Result<()> {
        let mut shutdown_rx = self.task_manager.get_shutdown_rx();
        wait_for_shutdown(&mut shutdown_rx).await;
        info!("Shutdown signal received. Waiting for tasks to complete...");

        self.task_manager.shutdown().await;

        info!("All tasks shut down.");
        Ok(())
    }
}

/// Builder for the main application.
///
/// Separates constructing the components from running them, and lets tests
/// replace the backend, the launchers and the listener.
pub struct AppBuilder {
    config: Config,
    backend_override: Option<Arc<dyn BackendFunctions>>,
    launchers_override: Option<Vec<Arc<dyn Launcher>>>,
    listener_override: Option<TcpListener>,
    prometheus_override: Option<PrometheusHandle>,
}

impl AppBuilder {
    /// Creates a new `AppBuilder` with the given configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            backend_override: None,
            launchers_override: None,
            listener_override: None,
            prometheus_override: None,
        }
    }

    /// Overrides the backend functions for testing.
    pub fn backend_override(mut self, backend: Arc<dyn BackendFunctions>) -> Self {
        self.backend_override = Some(backend);
        self
    }

    /// Overrides the configured launchers for testing.
    pub fn launchers_override(mut self, launchers: Vec<Arc<dyn Launcher>>) -> Self {
        self.launchers_override = Some(launchers);
        self
    }

    /// Serves on an already bound listener instead of `server.listen_addr`.
    pub fn listener_override(mut self, listener: TcpListener) -> Self {
        self.listener_override = Some(listener);
        self
    }

    /// Uses an existing Prometheus handle instead of installing a recorder.
    pub fn prometheus_override(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus_override = Some(handle);
        self
    }

    /// Builds and initializes all application components, returning a runnable `App`.
    #[instrument(skip_all)]
    pub async fn build(self, shutdown_rx: watch::Receiver<bool>) -> Result<App> {
        let config = self.config;
        let task_manager = TaskManager::new(shutdown_rx.clone());

        // =========================================================================
        // 1. Metrics
        // =========================================================================
        let prometheus = match self.prometheus_override {
            Some(handle) => Some(handle),
            None if config.metrics.enabled => match internal_metrics::install() {
                Ok(handle) => Some(handle),
                Err(e) => {
                    warn!(error = %e, "Failed to install Prometheus recorder, metrics disabled");
                    None
                }
            },
            None => None,
        };

        // =========================================================================
        // 2. Backend and notification channels
        // =========================================================================
        let backend = match self.backend_override {
            Some(backend) => backend,
            None => Arc::new(FunctionsClient::new(&config.backend)?) as Arc<dyn BackendFunctions>,
        };
        let client = reqwest::Client::builder().build()?;
        let webhooks = build_webhook_chain(&config.webhook, client, backend.clone());
        debug!(channels = ?webhooks.channel_names(), "Webhook chain ready");

        let launchers = match self.launchers_override {
            Some(launchers) => launchers,
            None => config
                .whatsapp
                .launcher_configs()
                .iter()
                .filter_map(|launcher| {
                    let built = CommandLauncher::from_config(launcher);
                    if built.is_none() {
                        warn!(method = %launcher.method, "Skipping launcher with an empty command");
                    }
                    built.map(|l| Arc::new(l) as Arc<dyn Launcher>)
                })
                .collect(),
        };

        let outbox = match &config.outbox.path {
            Some(path) => Outbox::open(path)
                .await
                .with_context(|| format!("failed to open outbox at {}", path.display()))?,
            None => Outbox::in_memory(),
        };

        let whatsapp = Arc::new(WhatsAppHandoff::new(
            config.whatsapp.phone_number.clone(),
            launchers,
            config.whatsapp.retry_policy(),
            Arc::new(outbox),
        ));
        flush_outbox(&whatsapp, &task_manager).await;

        let dispatcher = Arc::new(
            BookingDispatcher::new(backend, webhooks, whatsapp, task_manager.clone())
                .with_completion(config.form.completion)
                .require_email(config.form.require_email),
        );

        // =========================================================================
        // 3. Intake server
        // =========================================================================
        let listener = match self.listener_override {
            Some(listener) => listener,
            None => TcpListener::bind(config.server.listen_addr)
                .await
                .with_context(|| format!("failed to bind {}", config.server.listen_addr))?,
        };
        let local_addr = listener.local_addr()?;

        let state = AppState {
            dispatcher: dispatcher.clone(),
            tracker: SubmissionTracker::new(config.form.display_window()),
            prometheus,
        };
        task_manager.spawn("IntakeServer", IntakeServer::new(listener, state, shutdown_rx).run());
        info!(address = %local_addr, "Intake server listening");

        Ok(App {
            task_manager,
            local_addr,
            dispatcher,
        })
    }
}

/// Direct webhook first, then the backend relay. Either is left out when it
/// has no destination configured.
pub fn build_webhook_chain(
    config: &WebhookConfig,
    client: reqwest::Client,
    backend: Arc<dyn BackendFunctions>,
) -> FallbackChain {
    let mut chain = FallbackChain::new();
    if let Some(url) = &config.url {
        chain = chain.then(
            Arc::new(DirectWebhook::new(client, url.clone())),
            ChannelPolicy {
                timeout: Some(config.timeout()),
                retry: config.retry_policy(),
            },
        );
    }
    if let Some(destination) = &config.relay_destination {
        chain = chain.then(
            Arc::new(RelayWebhook::new(backend, config.relay_target.clone(), destination.clone())),
            ChannelPolicy::default(),
        );
    }
    chain
}

/// Re-offers an undelivered link left over from a previous run, once.
///
/// The record is cleared only after the rounds finish, so a flush cut short
/// by shutdown leaves it for the next start. Without launchers the record is
/// kept so a client can still fetch it.
async fn flush_outbox(whatsapp: &Arc<WhatsAppHandoff>, task_manager: &TaskManager) {
    if !whatsapp.has_launchers() {
        return;
    }
    let Some(record) = whatsapp.outbox().pending().await else {
        return;
    };
    info!(recorded_at = %record.recorded_at, "Re-offering undelivered WhatsApp link");
    metrics::counter!("outbox_flushes_total").increment(1);
    let whatsapp = whatsapp.clone();
    task_manager.spawn_cancellable("outbox_flush", async move {
        let url = record.whatsapp_backup_url;
        whatsapp.relaunch(url.clone()).await;
        if let Err(e) = whatsapp.outbox().clear(&url).await {
            warn!(error = %e, "Failed to clear re-offered outbox record");
        }
    });
}
