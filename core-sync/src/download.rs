//! # Download Worker
//!
//! Fetches one track's audio into the staging directory and post-processes
//! it. A semaphore bounds how many fetch + transcode jobs run at once.
//!
//! [`DownloadWorker::download`] never fails: the outcome is a
//! [`DownloadReport`], and a failed track simply stays missing until the next
//! sync.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bridge_traits::media::{AudioFetcher, FetchRequest};
use core_async::sync::Semaphore;
use core_runtime::config::DEFAULT_MAX_CONCURRENT_DOWNLOADS;
use core_runtime::logging::file_label;
use tracing::{info, instrument, warn};

use crate::post_process::{PostProcessOutcome, PostProcessor};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadReport {
    Downloaded {
        path: PathBuf,
        /// `None` when post-processing failed; the file is kept as fetched.
        post_process: Option<PostProcessOutcome>,
    },
    Failed {
        reason: String,
    },
}

impl DownloadReport {
    pub fn is_success(&self) -> bool {
        matches!(self, DownloadReport::Downloaded { .. })
    }
}

pub struct DownloadWorker {
    fetcher: Arc<dyn AudioFetcher>,
    post_processor: PostProcessor,
    permits: Semaphore,
    max_concurrent: usize,
}

impl DownloadWorker {
    /// `max_concurrent` is clamped to at least one.
    pub fn new(
        fetcher: Arc<dyn AudioFetcher>,
        post_processor: PostProcessor,
        max_concurrent: usize,
    ) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            fetcher,
            post_processor,
            permits: Semaphore::new(max_concurrent),
            max_concurrent,
        }
    }

    pub fn with_default_pool(fetcher: Arc<dyn AudioFetcher>, post_processor: PostProcessor) -> Self {
        Self::new(fetcher, post_processor, DEFAULT_MAX_CONCURRENT_DOWNLOADS)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Free pool slots right now.
    pub fn available_slots(&self) -> usize {
        self.permits.available_permits()
    }

    /// Downloads `query` to `destination` (no extension) and post-processes
    /// the result. Waits for a pool slot first.
    #[instrument(skip_all, fields(query = %query, destination = %file_label(destination)))]
    pub async fn download(&self, query: &str, destination: &Path) -> DownloadReport {
        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                return DownloadReport::Failed {
                    reason: "download pool closed".to_string(),
                }
            }
        };

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = core_async::fs::create_dir_all(parent).await {
                warn!(error = %e, "Could not create download directory");
                return DownloadReport::Failed {
                    reason: e.to_string(),
                };
            }
        }

        let request = FetchRequest::new(query, destination);
        let path = match self.fetcher.fetch(&request).await {
            Ok(path) => path,
            Err(e) => {
                warn!(query, error = %e, "Download failed");
                return DownloadReport::Failed {
                    reason: e.to_string(),
                };
            }
        };

        let post_process = match self.post_processor.process(&path).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!(error = %e, "Post-processing failed, keeping file as downloaded");
                None
            }
        };

        info!(query, "Downloaded track");
        DownloadReport::Downloaded { path, post_process }
    }
}
