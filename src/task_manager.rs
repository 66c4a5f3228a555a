//! Manages the lifecycle of all spawned tasks in the application.
use futures::future::join_all;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// A centralized manager for all spawned tasks.
///
/// This struct is responsible for:
/// - Spawning tasks and keeping track of their `JoinHandle`s.
/// - Cancelling background work that is still running when shutdown is signalled.
/// - Providing a graceful shutdown mechanism by awaiting all tasks.
#[derive(Clone, Debug)]
pub struct TaskManager {
    handles: Arc<Mutex<Vec<(&'static str, JoinHandle<()>)>>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl TaskManager {
    /// Creates a new `TaskManager`.
    pub fn new(shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            handles: Arc::new(Mutex::new(Vec::new())),
            shutdown_rx,
        }
    }

    /// Spawns a new task and adds its handle to the manager.
    ///
    /// The task is expected to watch the shutdown signal itself.
    pub fn spawn<F>(&self, name: &'static str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        debug!(task_name = name, "Spawning task");
        self.track(name, tokio::spawn(future));
    }

    /// Spawns a task that is dropped at its next await point once shutdown
    /// is signalled.
    pub fn spawn_cancellable<F>(&self, name: &'static str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        debug!(task_name = name, "Spawning cancellable task");
        let mut shutdown_rx = self.shutdown_rx.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown_rx) => {
                    debug!(task_name = name, "Task cancelled by shutdown signal.");
                }
                _ = future => {}
            }
        });
        self.track(name, handle);
    }

    fn track(&self, name: &'static str, handle: JoinHandle<()>) {
        let mut handles = self.handles.lock().unwrap_or_else(|e| e.into_inner());
        handles.retain(|(_, handle)| !handle.is_finished());
        handles.push((name, handle));
    }

    /// Returns a clone of the shutdown receiver.
    pub fn get_shutdown_rx(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Number of tasks that have not finished yet.
    pub fn active(&self) -> usize {
        let handles = self.handles.lock().unwrap_or_else(|e| e.into_inner());
        handles.iter().filter(|(_, handle)| !handle.is_finished()).count()
    }

    /// Waits for all managed tasks to complete.
    pub async fn shutdown(self) {
        let handles = self
            .handles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect::<Vec<_>>();
        info!(
            "TaskManager shutting down. Waiting for {} tasks to complete...",
            handles.len()
        );

        let task_names: Vec<&'static str> = handles.iter().map(|(name, _)| *name).collect();
        debug!(tasks = ?task_names, "Awaiting all tasks.");

        let results = join_all(handles.into_iter().map(|(_, handle)| handle)).await;

        let mut panics = Vec::new();
        for (task_name, result) in task_names.into_iter().zip(results) {
            match result {
                Ok(_) => {
                    debug!(task_name, "Task shut down gracefully.");
                }
                Err(e) => {
                    error!(task_name, "Task panicked during shutdown.");
                    panics.push((task_name, e));
                }
            }
        }

        if !panics.is_empty() {
            error!(
                "{} tasks panicked during shutdown: {:?}",
                panics.len(),
                panics
            );
        } else {
            info!("All tasks shut down gracefully.");
        }
    }
}

/// Resolves once `true` is sent. A dropped sender never resolves.
pub async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}
