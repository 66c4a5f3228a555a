//! The outbox holds the most recent WhatsApp deep link so it can be re-offered
//! later. There is exactly one record; every new submission overwrites it.
//!
//! When a path is configured the record is mirrored to a JSON file, written
//! via a temporary file and a rename, and any undelivered record found there
//! is flushed on the next start.

use crate::error::OutboxError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxRecord {
    pub whatsapp_backup_url: String,
    pub recorded_at: DateTime<Utc>,
    #[serde(default)]
    pub delivered: bool,
}

#[derive(Debug)]
pub struct Outbox {
    path: Option<PathBuf>,
    record: Mutex<Option<OutboxRecord>>,
}

impl Outbox {
    /// An outbox that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            record: Mutex::new(None),
        }
    }

    /// Opens the outbox file at `path`, loading any existing record.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, OutboxError> {
        let path = path.into();
        let record = match tokio::fs::read(&path).await {
            Ok(bytes) => Some(serde_json::from_slice::<OutboxRecord>(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), loaded = record.is_some(), "Opened outbox");
        Ok(Self {
            path: Some(path),
            record: Mutex::new(record),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Replaces the stored record with `url`.
    pub async fn record(&self, url: &str) -> Result<(), OutboxError> {
        let mut guard = self.record.lock().await;
        let record = OutboxRecord {
            whatsapp_backup_url: url.to_string(),
            recorded_at: Utc::now(),
            delivered: false,
        };
        self.persist(Some(&record)).await?;
        *guard = Some(record);
        Ok(())
    }

    pub async fn latest(&self) -> Option<OutboxRecord> {
        self.record.lock().await.clone()
    }

    /// Marks the record delivered if it still holds `url`.
    pub async fn mark_delivered(&self, url: &str) -> Result<(), OutboxError> {
        let mut guard = self.record.lock().await;
        if let Some(record) = guard.as_mut() {
            if record.whatsapp_backup_url == url && !record.delivered {
                record.delivered = true;
                let snapshot = record.clone();
                self.persist(Some(&snapshot)).await?;
            }
        }
        Ok(())
    }

    /// The record if it was never delivered. The record stays in place.
    pub async fn pending(&self) -> Option<OutboxRecord> {
        self.record
            .lock()
            .await
            .as_ref()
            .filter(|record| !record.delivered)
            .cloned()
    }

    /// Removes the record if it still holds `url`. Returns whether it did.
    pub async fn clear(&self, url: &str) -> Result<bool, OutboxError> {
        let mut guard = self.record.lock().await;
        match guard.as_ref() {
            Some(record) if record.whatsapp_backup_url == url => {
                self.persist(None).await?;
                *guard = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn persist(&self, record: Option<&OutboxRecord>) -> Result<(), OutboxError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        match record {
            Some(record) => {
                let tmp = path.with_extension("tmp");
                tokio::fs::write(&tmp, serde_json::to_vec_pretty(record)?).await?;
                tokio::fs::rename(&tmp, path).await?;
            }
            None => match tokio::fs::remove_file(path).await {
                Ok(()) => info!(path = %path.display(), "Cleared outbox record"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            },
        }
        Ok(())
    }
}
