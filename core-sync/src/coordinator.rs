//! # Sync Coordinator
//!
//! Runs one playlist mirroring cycle end to end.
//!
//! ## Workflow
//!
//! 1. Take the non-reentrant sync guard; a concurrent request is postponed.
//! 2. Postpone when a track is playing.
//! 3. Fetch every playlist page; postpone when the source is unreachable.
//! 4. Replace the [`TrackCatalog`].
//! 5. Stage a copy of the live library.
//! 6. Plan with the [`Reconciler`] and queue every staging edit in plan order.
//! 7. Once those have all resolved (downloads included), queue the directory
//!    swap and wait for it.
//! 8. Record the sync time and queue a status refresh.
//!
//! Postponements are `Ok(SyncOutcome::Postponed(_))`, never errors. Only
//! pipeline failures (staging I/O, closed queue) return `Err`, and they abort
//! the current cycle only.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{SyncCoordinator, SyncOutcome, SyncTrigger};
//!
//! match coordinator.sync(SyncTrigger::Manual).await? {
//!     SyncOutcome::Completed(report) => println!("{}", report.summary()),
//!     SyncOutcome::Postponed(reason) => println!("Sync will run later: {}", reason),
//! }
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bridge_traits::playlist::{PlaylistSource, PlaylistTrack};
use bridge_traits::time::{Clock, SystemClock};
use chrono::{DateTime, Utc};
use core_async::sync::watch;
use core_async::time::{Duration, Instant};
use core_runtime::config::LibraryLayout;
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::action::{EditAction, EditOutcome};
use crate::catalog::TrackCatalog;
use crate::download::DownloadReport;
use crate::edit_queue::{EditQueue, EditTicket};
use crate::error::{Result, SyncError};
use crate::executor::PlaybackProbe;
use crate::reconciler::Reconciler;
use crate::staging;

/// What asked for a sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    Scheduled,
    Manual,
    Startup,
}

impl SyncTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncTrigger::Scheduled => "scheduled",
            SyncTrigger::Manual => "manual",
            SyncTrigger::Startup => "startup",
        }
    }
}

/// Why a sync did not run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostponeReason {
    AlreadyRunning,
    PlaybackActive,
    SourceUnavailable(String),
}

impl fmt::Display for PostponeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostponeReason::AlreadyRunning => f.write_str("another sync is in progress"),
            PostponeReason::PlaybackActive => f.write_str("a song is playing"),
            PostponeReason::SourceUnavailable(reason) => {
                write!(f, "playlist source unavailable: {}", reason)
            }
        }
    }
}

/// What happened to the staged library at the end of a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapStatus {
    Swapped,
    /// Playback started mid-cycle; the next sync restages.
    Deferred(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub run_id: String,
    pub tracks: usize,
    pub downloaded: u32,
    pub download_failures: u32,
    pub renamed: u32,
    pub deleted: u32,
    pub swap: SwapStatus,
    pub duration: Duration,
}

impl SyncReport {
    /// One-line summary for the requester.
    pub fn summary(&self) -> String {
        let swap = match &self.swap {
            SwapStatus::Swapped => "library updated".to_string(),
            SwapStatus::Deferred(reason) => format!("swap deferred ({})", reason),
            SwapStatus::Failed(reason) => format!("swap failed ({})", reason),
        };
        format!(
            "Downloaded: {}, failed: {}, renamed: {}, deleted: {}; {}",
            self.downloaded, self.download_failures, self.renamed, self.deleted, swap
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed(SyncReport),
    Postponed(PostponeReason),
}

/// Releases the sync guard on drop.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SyncCoordinator {
    source: Arc<dyn PlaylistSource>,
    queue: EditQueue,
    playback: Arc<dyn PlaybackProbe>,
    catalog: Arc<TrackCatalog>,
    layout: LibraryLayout,
    events: EventBus,
    clock: Arc<dyn Clock>,
    running: AtomicBool,
    last_sync: watch::Sender<Option<DateTime<Utc>>>,
}

impl SyncCoordinator {
    pub fn new(
        source: Arc<dyn PlaylistSource>,
        queue: EditQueue,
        playback: Arc<dyn PlaybackProbe>,
        catalog: Arc<TrackCatalog>,
        layout: LibraryLayout,
        events: EventBus,
    ) -> Self {
        let (last_sync, _) = watch::channel(None);
        Self {
            source,
            queue,
            playback,
            catalog,
            layout,
            events,
            clock: Arc::new(SystemClock),
            running: AtomicBool::new(false),
            last_sync,
        }
    }

    /// Uses `clock` for the recorded sync time.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn catalog(&self) -> Arc<TrackCatalog> {
        Arc::clone(&self.catalog)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Completion time of the most recent finished cycle.
    pub fn last_sync(&self) -> watch::Receiver<Option<DateTime<Utc>>> {
        self.last_sync.subscribe()
    }

    /// Runs one cycle.
    #[instrument(skip_all, fields(trigger = trigger.as_str()))]
    pub async fn sync(&self, trigger: SyncTrigger) -> Result<SyncOutcome> {
        let run_id = Uuid::new_v4().to_string();

        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(self.postpone(&run_id, PostponeReason::AlreadyRunning));
        }
        let _guard = RunGuard(&self.running);

        if self.playback.is_active() {
            return Ok(self.postpone(&run_id, PostponeReason::PlaybackActive));
        }

        info!(run_id = %run_id, "Starting playlist sync");
        self.emit(SyncEvent::Started {
            run_id: run_id.clone(),
            trigger: trigger.as_str().to_string(),
        });

        let started = Instant::now();
        let tracks = match self.fetch_playlist().await {
            Ok(tracks) => tracks,
            Err(e) => {
                warn!(error = %e, "Playlist source unavailable");
                return Ok(self.postpone(&run_id, PostponeReason::SourceUnavailable(e.to_string())));
            }
        };
        self.catalog.replace(tracks.clone()).await;

        match self.run_pipeline(&run_id, &tracks, started).await {
            Ok(report) => {
                info!(
                    run_id = %run_id,
                    downloaded = report.downloaded,
                    download_failures = report.download_failures,
                    renamed = report.renamed,
                    deleted = report.deleted,
                    swap = ?report.swap,
                    "Sync finished"
                );
                self.emit(SyncEvent::Completed {
                    run_id: run_id.clone(),
                    downloaded: report.downloaded,
                    download_failures: report.download_failures,
                    renamed: report.renamed,
                    deleted: report.deleted,
                    swapped: report.swap == SwapStatus::Swapped,
                    duration_ms: report.duration.as_millis() as u64,
                });
                Ok(SyncOutcome::Completed(report))
            }
            Err(e) => {
                error!(run_id = %run_id, error = %e, "Sync pipeline failed");
                self.emit(SyncEvent::Failed {
                    run_id,
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Follows the source's cursor until it stops signaling more pages.
    async fn fetch_playlist(&self) -> Result<Vec<PlaylistTrack>> {
        let mut tracks = Vec::new();
        let mut cursor = None;
        let mut pages = 0u32;

        loop {
            pages += 1;
            let (page, next) = self
                .source
                .list_tracks(cursor)
                .await
                .map_err(|e| SyncError::Source(e.to_string()))?;
            debug!(page = pages, tracks = page.len(), "Fetched playlist page");
            tracks.extend(page);

            cursor = next;
            if cursor.is_none() {
                break;
            }
        }

        info!(tracks = tracks.len(), pages, "Fetched playlist");
        Ok(tracks)
    }

    async fn run_pipeline(
        &self,
        run_id: &str,
        tracks: &[PlaylistTrack],
        started: Instant,
    ) -> Result<SyncReport> {
        let LibraryLayout {
            songs_dir,
            staging_dir,
            ..
        } = &self.layout;

        staging::prepare_staging(songs_dir, staging_dir).await?;
        let listing = staging::list_files(staging_dir).await?;

        let plan = Reconciler::new(staging_dir, songs_dir).plan(tracks, &listing);
        info!(
            deletes = plan.deletes,
            renames = plan.renames,
            downloads = plan.downloads,
            "Planned library edits"
        );
        self.emit(SyncEvent::Planned {
            run_id: run_id.to_string(),
            tracks: tracks.len() as u32,
            deletes: plan.deletes,
            renames: plan.renames,
            downloads: plan.downloads,
        });

        // The swap is queued only once every staging edit has resolved, so
        // downloads running in the background never race it.
        let (swaps, edits): (Vec<_>, Vec<_>) = plan
            .actions
            .into_iter()
            .partition(|action| matches!(action, EditAction::SwapDirectories { .. }));

        let mut report = SyncReport {
            run_id: run_id.to_string(),
            tracks: tracks.len(),
            downloaded: 0,
            download_failures: 0,
            renamed: 0,
            deleted: 0,
            swap: SwapStatus::Failed("not applied".to_string()),
            duration: Duration::ZERO,
        };

        self.apply_and_tally(edits, &mut report).await?;
        self.apply_and_tally(swaps, &mut report).await?;

        self.last_sync.send_replace(Some(self.clock.now()));
        self.queue.enqueue(EditAction::RefreshStatus)?;

        report.duration = started.elapsed();
        Ok(report)
    }

    /// Queues `actions` in order and waits for every one of them.
    async fn apply_and_tally(
        &self,
        actions: Vec<EditAction>,
        report: &mut SyncReport,
    ) -> Result<()> {
        let tickets: Vec<(EditAction, EditTicket)> = actions
            .into_iter()
            .map(|action| {
                let ticket = self.queue.enqueue_tracked(action.clone())?;
                Ok((action, ticket))
            })
            .collect::<Result<_>>()?;

        for (action, ticket) in tickets {
            let outcome = match ticket.wait().await {
                Err(SyncError::QueueClosed) => return Err(SyncError::QueueClosed),
                other => other,
            };
            tally(report, &action, outcome);
        }
        Ok(())
    }

    fn postpone(&self, run_id: &str, reason: PostponeReason) -> SyncOutcome {
        info!(reason = %reason, "Sync postponed");
        self.emit(SyncEvent::Postponed {
            run_id: run_id.to_string(),
            reason: reason.to_string(),
        });
        SyncOutcome::Postponed(reason)
    }

    fn emit(&self, event: SyncEvent) {
        self.events.emit(CoreEvent::Sync(event)).ok();
    }
}

fn tally(report: &mut SyncReport, action: &EditAction, outcome: Result<EditOutcome>) {
    match (action, outcome) {
        (EditAction::Delete { .. }, Ok(EditOutcome::Applied)) => report.deleted += 1,
        (EditAction::Rename { .. }, Ok(EditOutcome::Applied)) => report.renamed += 1,
        (EditAction::Download { .. }, Ok(EditOutcome::Downloaded(download))) => match download {
            DownloadReport::Downloaded { .. } => report.downloaded += 1,
            DownloadReport::Failed { .. } => report.download_failures += 1,
        },
        (EditAction::Download { .. }, _) => report.download_failures += 1,
        (EditAction::SwapDirectories { .. }, Ok(EditOutcome::Applied)) => {
            report.swap = SwapStatus::Swapped
        }
        (EditAction::SwapDirectories { .. }, Ok(EditOutcome::Deferred(reason))) => {
            report.swap = SwapStatus::Deferred(reason)
        }
        (EditAction::SwapDirectories { .. }, Ok(EditOutcome::Skipped(reason))) => {
            report.swap = SwapStatus::Failed(reason)
        }
        (EditAction::SwapDirectories { .. }, Err(e)) => {
            report.swap = SwapStatus::Failed(e.to_string())
        }
        _ => {}
    }
}
