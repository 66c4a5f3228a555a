//! Deep-link launchers that run an operating-system command.

use crate::core::{LaunchMethod, LaunchOutcome, Launcher};
use crate::error::NotificationError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Configuration for one command-backed launcher.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LauncherConfig {
    pub method: LaunchMethod,
    /// Program and leading arguments; the URL is appended as the last argument.
    pub command: Vec<String>,
    /// Wait for the command to exit and treat a zero exit status as
    /// confirmation. When `false` the command is only spawned and the launch
    /// is reported as unconfirmed.
    #[serde(default = "default_wait")]
    pub wait: bool,
}

fn default_wait() -> bool {
    true
}

/// Opens a link by running a command such as `xdg-open <url>`.
#[derive(Debug, Clone)]
pub struct CommandLauncher {
    method: LaunchMethod,
    program: String,
    args: Vec<String>,
    wait: bool,
    timeout: Duration,
}

impl CommandLauncher {
    /// Returns `None` when the configured command is empty.
    pub fn from_config(config: &LauncherConfig) -> Option<Self> {
        let (program, args) = config.command.split_first()?;
        Some(Self {
            method: config.method,
            program: program.clone(),
            args: args.to_vec(),
            wait: config.wait,
            timeout: Duration::from_secs(5),
        })
    }

    /// The platform's default URL opener, bound to `NewWindow`.
    pub fn system_opener() -> LauncherConfig {
        let command = if cfg!(target_os = "macos") {
            vec!["open".to_string()]
        } else if cfg!(target_os = "windows") {
            vec!["explorer".to_string()]
        } else {
            vec!["xdg-open".to_string()]
        };
        LauncherConfig {
            method: LaunchMethod::NewWindow,
            command,
            wait: true,
        }
    }

    fn failure(&self, reason: impl ToString) -> NotificationError {
        NotificationError::Launch {
            method: self.method,
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl Launcher for CommandLauncher {
    fn method(&self) -> LaunchMethod {
        self.method
    }

    #[instrument(skip(self, url), fields(method = %self.method, program = %self.program))]
    async fn launch(&self, url: &str) -> Result<LaunchOutcome, NotificationError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(self.wait);

        let mut child = command.spawn().map_err(|e| self.failure(e))?;
        if !self.wait {
            debug!("Launch command spawned without waiting");
            return Ok(LaunchOutcome::Unconfirmed);
        }

        let status = tokio::time::timeout(self.timeout, child.wait())
            .await
            .map_err(|_| self.failure(format!("no exit within {:?}", self.timeout)))?
            .map_err(|e| self.failure(e))?;

        if status.success() {
            debug!("Launch command exited successfully");
            Ok(LaunchOutcome::Confirmed)
        } else {
            Err(self.failure(format!("command exited with {}", status)))
        }
    }
}
