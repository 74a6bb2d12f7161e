//! Bot bootstrap and shutdown.

use std::sync::Arc;

use core_async::sync::CancellationToken;
use core_async::task::JoinHandle;
use core_metadata::LyricsService;
use core_playback::{PlayerController, PlayerDeps, StateStore, StatusPublisher};
use core_runtime::config::BotConfig;
use core_runtime::events::{EventBus, DEFAULT_EVENT_BUFFER_SIZE};
use core_sync::{
    DownloadWorker, EditAction, EditQueue, LibraryEditExecutor, LibraryGate, PostProcessor,
    SyncCoordinator, TrackCatalog,
};
use tracing::{info, instrument, warn};

use crate::bridges::BotBridges;
use crate::error::Result;
use crate::service::BotService;
use crate::tasks::{run_periodic_sync, run_seek_refresher};

/// A running bot: background tasks plus the command surface.
pub struct Bot {
    service: BotService,
    events: EventBus,
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Bot {
    /// Wires every component and starts the background tasks.
    ///
    /// Startup order: edit queue consumer, player (with its persisted
    /// autoplay state), status publisher (with its persisted message id),
    /// periodic sync, seek bar refresher. Then the bot joins the voice
    /// channel and queues a first status refresh. Failing to join is logged,
    /// not fatal.
    ///
    /// # Errors
    ///
    /// Invalid configuration.
    #[instrument(skip_all)]
    pub async fn start(config: BotConfig, bridges: BotBridges) -> Result<Bot> {
        config.validate()?;
        let events = EventBus::new(DEFAULT_EVENT_BUFFER_SIZE);
        let shutdown = CancellationToken::new();
        let layout = config.layout.clone();

        let (queue, consumer) = EditQueue::channel(config.edit_interval);
        let catalog = Arc::new(TrackCatalog::new());
        let state = StateStore::new(bridges.documents.clone());
        let library_gate = LibraryGate::new();

        let (mut controller, player) = PlayerController::new(PlayerDeps {
            voice: bridges.voice.clone(),
            users: bridges.users.clone(),
            catalog: catalog.clone(),
            queue: queue.clone(),
            state: state.clone(),
            events: events.clone(),
            clock: bridges.clock.clone(),
            songs_dir: layout.songs_dir.clone(),
            library_gate: library_gate.clone(),
        });
        if let Err(e) = controller.restore().await {
            warn!(error = %e, "Could not restore autoplay state");
        }

        let coordinator = Arc::new(
            SyncCoordinator::new(
                bridges.playlist.clone(),
                queue.clone(),
                Arc::new(player.clone()),
                catalog,
                layout.clone(),
                events.clone(),
            )
            .with_clock(bridges.clock.clone()),
        );

        let status = Arc::new(StatusPublisher::new(
            bridges.status.clone(),
            player.subscribe(),
            coordinator.last_sync(),
            state,
            bridges.clock.clone(),
        ));
        if let Err(e) = status.restore().await {
            warn!(error = %e, "Could not restore status message id");
        }

        let downloads = Arc::new(DownloadWorker::new(
            bridges.fetcher.clone(),
            PostProcessor::new(bridges.filter_runner.clone()),
            config.max_concurrent_downloads,
        ));
        let executor = Arc::new(
            LibraryEditExecutor::new(downloads, Arc::new(player.clone()), library_gate)
                .with_status_refresher(status),
        );

        let tasks = vec![
            core_async::spawn(
                consumer
                    .with_events(events.clone())
                    .run(executor, shutdown.clone()),
            ),
            core_async::spawn(controller.run(shutdown.clone())),
            core_async::spawn(run_periodic_sync(
                coordinator.clone(),
                config.sync_interval,
                shutdown.clone(),
            )),
            core_async::spawn(run_seek_refresher(
                player.subscribe(),
                queue.clone(),
                config.seek_refresh_interval,
                shutdown.clone(),
            )),
        ];

        if let Err(e) = player.join(config.voice_channel.clone()).await {
            warn!(channel = %config.voice_channel, error = %e, "Could not join voice channel");
        }
        if let Err(e) = queue.enqueue(EditAction::RefreshStatus) {
            warn!(error = %e, "Could not queue the initial status refresh");
        }

        let lyrics = Arc::new(LyricsService::new(
            bridges.http.clone(),
            config.genius_token.clone(),
            bridges.documents.clone(),
        ));
        info!(
            songs_dir = %layout.songs_dir.display(),
            lyrics_providers = lyrics.provider_count(),
            "Bot started"
        );

        Ok(Bot {
            service: BotService::new(player, coordinator, lyrics, layout.songs_dir),
            events,
            shutdown,
            tasks,
        })
    }

    pub fn service(&self) -> BotService {
        self.service.clone()
    }

    /// Bus carrying sync, playback and edit events.
    pub fn events(&self) -> EventBus {
        self.events.clone()
    }

    /// Stops every background task. Edits still queued are applied first.
    pub async fn shutdown(self) {
        info!("Shutting down");
        self.shutdown.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Background task ended abnormally");
            }
        }
        info!("Shutdown complete");
    }
}
