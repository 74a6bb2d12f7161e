//! Background loops owned by the bot.

use std::sync::Arc;

use core_async::sync::{watch, CancellationToken};
use core_async::time::{delayed_interval, interval, Duration, MissedTickBehavior};
use core_playback::{PlaybackSnapshot, PlayerStatus};
use core_sync::{EditAction, EditQueue, SyncCoordinator, SyncOutcome, SyncTrigger};
use tracing::{debug, error, info};

/// Syncs once at startup, then every `every`.
pub(crate) async fn run_periodic_sync(
    coordinator: Arc<SyncCoordinator>,
    every: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut trigger = SyncTrigger::Startup;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("Periodic sync stopped");
                return;
            }
            _ = ticker.tick() => {}
        }

        match coordinator.sync(trigger).await {
            Ok(SyncOutcome::Completed(report)) => {
                info!(trigger = trigger.as_str(), summary = %report.summary(), "Sync cycle done");
            }
            Ok(SyncOutcome::Postponed(reason)) => {
                info!(trigger = trigger.as_str(), reason = %reason, "Sync postponed");
            }
            Err(e) => error!(trigger = trigger.as_str(), error = %e, "Sync cycle failed"),
        }
        trigger = SyncTrigger::Scheduled;
    }
}

/// Queues a status refresh every `every` while a song is playing, so the
/// seek bar moves.
pub(crate) async fn run_seek_refresher(
    playback: watch::Receiver<PlaybackSnapshot>,
    queue: EditQueue,
    every: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = delayed_interval(every);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("Seek bar refresher stopped");
                return;
            }
            _ = ticker.tick() => {}
        }

        let playing = playback.borrow().status == PlayerStatus::Playing;
        if playing && queue.enqueue(EditAction::RefreshStatus).is_err() {
            debug!("Edit queue closed, seek bar refresher stopping");
            return;
        }
    }
}
