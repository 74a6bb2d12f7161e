//! Library edit executor: applies [`EditAction`]s to the filesystem.

use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use core_async::task::JoinHandle;
use core_runtime::logging::file_label;
use tracing::{debug, info, warn};

use crate::action::{EditAction, EditOutcome};
use crate::download::DownloadWorker;
use crate::edit_queue::EditExecutor;
use crate::error::Result;
use crate::gate::LibraryGate;
use crate::staging;

/// Reports whether a file of the live library is being streamed.
pub trait PlaybackProbe: Send + Sync {
    fn is_active(&self) -> bool;
}

/// Result of one status refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Posted,
    Edited,
    /// Skipped by the minimum-interval guard.
    Throttled,
    /// There is no status message (yet, or any more).
    NoMessage,
}

/// Re-renders the status message. Implemented by the status publisher.
#[async_trait]
pub trait StatusRefresher: Send + Sync {
    async fn refresh(&self) -> Result<RefreshOutcome>;
}

pub struct LibraryEditExecutor {
    downloads: Arc<DownloadWorker>,
    playback: Arc<dyn PlaybackProbe>,
    gate: LibraryGate,
    status: Option<Arc<dyn StatusRefresher>>,
}

impl LibraryEditExecutor {
    /// `gate` must be the one the player holds while it opens library files.
    pub fn new(
        downloads: Arc<DownloadWorker>,
        playback: Arc<dyn PlaybackProbe>,
        gate: LibraryGate,
    ) -> Self {
        Self {
            downloads,
            playback,
            gate,
            status: None,
        }
    }

    pub fn with_status_refresher(mut self, status: Arc<dyn StatusRefresher>) -> Self {
        self.status = Some(status);
        self
    }

    async fn delete(&self, path: &Path) -> Result<EditOutcome> {
        match core_async::fs::remove_file(path).await {
            Ok(()) => {
                info!(file = %file_label(path), "Deleted");
                Ok(EditOutcome::Applied)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Ok(EditOutcome::Skipped("file already gone".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<EditOutcome> {
        match core_async::fs::rename(from, to).await {
            Ok(()) => {
                info!(from = %file_label(from), to = %file_label(to), "Renamed");
                Ok(EditOutcome::Applied)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Ok(EditOutcome::Skipped("source file missing".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn swap(&self, staging: &Path, live: &Path) -> Result<EditOutcome> {
        // Held until the new directory is in place; the player cannot start a
        // stream in between, so the check below stays true for the swap.
        let _exclusive = self.gate.write().await;
        if self.playback.is_active() {
            warn!("Playback active, leaving staged library for the next sync");
            return Ok(EditOutcome::Deferred("playback active".to_string()));
        }
        if !core_async::fs::try_exists(staging).await? {
            return Ok(EditOutcome::Skipped("staging directory missing".to_string()));
        }
        staging::swap_directories(staging, live).await?;
        Ok(EditOutcome::Applied)
    }

    async fn refresh_status(&self) -> Result<EditOutcome> {
        let Some(status) = &self.status else {
            return Ok(EditOutcome::Skipped("no status surface".to_string()));
        };
        let outcome = match status.refresh().await? {
            RefreshOutcome::Posted | RefreshOutcome::Edited => EditOutcome::Applied,
            RefreshOutcome::Throttled => {
                EditOutcome::Skipped("refreshed less than a second ago".to_string())
            }
            RefreshOutcome::NoMessage => EditOutcome::Skipped("no status message".to_string()),
        };
        debug!(?outcome, "Status refresh");
        Ok(outcome)
    }
}

#[async_trait]
impl EditExecutor for LibraryEditExecutor {
    async fn execute(&self, action: &EditAction) -> Result<EditOutcome> {
        match action {
            EditAction::Delete { path } => self.delete(path).await,
            EditAction::Rename { from, to } => self.rename(from, to).await,
            EditAction::Download { query, destination } => Ok(EditOutcome::Downloaded(
                self.downloads.download(query, destination).await,
            )),
            EditAction::SwapDirectories { staging, live } => self.swap(staging, live).await,
            EditAction::RefreshStatus => self.refresh_status().await,
        }
    }

    /// Downloads go to the pool; everything else is applied inline.
    fn dispatch(&self, action: &EditAction) -> Option<JoinHandle<Result<EditOutcome>>> {
        let EditAction::Download { query, destination } = action else {
            return None;
        };
        let downloads = Arc::clone(&self.downloads);
        let query = query.clone();
        let destination = destination.clone();
        Some(core_async::spawn(async move {
            Ok(EditOutcome::Downloaded(
                downloads.download(&query, &destination).await,
            ))
        }))
    }
}
