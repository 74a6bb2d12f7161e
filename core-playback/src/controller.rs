//! # Player Controller
//!
//! Single-writer actor owning all playback state.
//!
//! ## Overview
//!
//! Commands from chat handlers arrive through a [`PlayerHandle`]; the end of
//! a stream arrives from the voice client's audio thread through a
//! [`CompletionHandle`] that only pushes a message into the same queue. The
//! actor applies them one at a time and publishes a [`PlaybackSnapshot`] on a
//! `watch` channel after every change, so readers never lock anything.
//!
//! Starting a stream reads the live library, which a sync may be replacing.
//! The actor holds the shared [`LibraryGate`] for reading from the first look
//! at the library until the new snapshot is published, so a swap either
//! finishes first or sees the stream as active and defers.
//!
//! Every started stream gets a generation number. A completion carrying an
//! older generation belongs to a stream that was already replaced and is
//! ignored.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let (mut controller, player) = PlayerController::new(deps);
//! controller.restore().await?;
//! core_async::spawn(controller.run(shutdown.clone()));
//!
//! player.join("General").await?;
//! player.play("3 - Song.mp3").await?;
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bridge_traits::playlist::{UserDirectory, UserProfile};
use bridge_traits::time::Clock;
use bridge_traits::voice::{CompletionHandle, PlaybackFinished, VoiceConnection};
use core_async::sync::{mpsc, oneshot, watch, CancellationToken};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use core_sync::{
    codec, staging, EditAction, EditQueue, LibraryGate, PlaybackProbe, TrackCatalog,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, instrument, warn};

use crate::autoplay::select_next;
use crate::error::{PlaybackError, Result};
use crate::history::RecentlyPlayed;
use crate::persistence::{AutoplayState, StateStore};
use crate::state::{NowPlaying, PlaybackSnapshot, PlayerStatus};

/// Artist shown for files the catalog does not know.
pub const UNKNOWN_ARTIST: &str = "Unknown";

/// Collaborators of the player.
pub struct PlayerDeps {
    pub voice: Arc<dyn VoiceConnection>,
    pub users: Arc<dyn UserDirectory>,
    pub catalog: Arc<TrackCatalog>,
    /// Receives a `RefreshStatus` after every now-playing change.
    pub queue: EditQueue,
    pub state: StateStore,
    pub events: EventBus,
    pub clock: Arc<dyn Clock>,
    /// Live library directory.
    pub songs_dir: PathBuf,
    /// Shared with the executor that swaps `songs_dir`.
    pub library_gate: LibraryGate,
}

enum PlayerCommand {
    Join {
        channel: String,
        reply: oneshot::Sender<Result<()>>,
    },
    Play {
        filename: String,
        reply: oneshot::Sender<Result<NowPlaying>>,
    },
    Stop {
        reply: oneshot::Sender<Result<bool>>,
    },
    Skip {
        reply: oneshot::Sender<Result<Option<NowPlaying>>>,
    },
    Pause {
        reply: oneshot::Sender<Result<()>>,
    },
    Resume {
        reply: oneshot::Sender<Result<()>>,
    },
    ToggleAutoplay {
        reply: oneshot::Sender<Result<bool>>,
    },
    Finished {
        generation: u64,
        finished: PlaybackFinished,
    },
}

/// Cloneable client of the player actor.
#[derive(Clone)]
pub struct PlayerHandle {
    commands: mpsc::UnboundedSender<PlayerCommand>,
    snapshot: watch::Receiver<PlaybackSnapshot>,
}

impl PlayerHandle {
    /// Connects to (or moves into) a voice channel.
    pub async fn join(&self, channel: impl Into<String>) -> Result<()> {
        let channel = channel.into();
        self.request(|reply| PlayerCommand::Join { channel, reply })
            .await
    }

    /// Plays a file of the live library, replacing the current song.
    ///
    /// # Errors
    ///
    /// - [`PlaybackError::NotConnected`] outside a voice channel
    /// - [`PlaybackError::SongNotFound`] when the file is not in the library
    pub async fn play(&self, filename: impl Into<String>) -> Result<NowPlaying> {
        let filename = filename.into();
        self.request(|reply| PlayerCommand::Play { filename, reply })
            .await
    }

    /// Stops playback and disables autoplay. Returns whether anything was
    /// playing.
    pub async fn stop(&self) -> Result<bool> {
        self.request(|reply| PlayerCommand::Stop { reply }).await
    }

    /// Skips the current song; with autoplay on, returns the next one.
    pub async fn skip(&self) -> Result<Option<NowPlaying>> {
        self.request(|reply| PlayerCommand::Skip { reply }).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.request(|reply| PlayerCommand::Pause { reply }).await
    }

    pub async fn resume(&self) -> Result<()> {
        self.request(|reply| PlayerCommand::Resume { reply }).await
    }

    /// Flips autoplay and returns the new setting. Turning it on while idle
    /// starts a song.
    pub async fn toggle_autoplay(&self) -> Result<bool> {
        self.request(|reply| PlayerCommand::ToggleAutoplay { reply })
            .await
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshot.clone()
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<Result<T>>) -> PlayerCommand,
    ) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .map_err(|_| PlaybackError::PlayerStopped)?;
        response.await.map_err(|_| PlaybackError::PlayerStopped)?
    }
}

impl PlaybackProbe for PlayerHandle {
    fn is_active(&self) -> bool {
        self.snapshot.borrow().is_active()
    }
}

#[derive(Default)]
struct AppState {
    now_playing: Option<NowPlaying>,
    autoplay: bool,
    /// Set when a user stopped the stream; absorbs the next completion.
    manual_stop: bool,
    generation: u64,
    history: RecentlyPlayed,
    last_played: Option<String>,
}

/// The player actor.
pub struct PlayerController {
    commands: mpsc::UnboundedReceiver<PlayerCommand>,
    completions: mpsc::WeakUnboundedSender<PlayerCommand>,
    snapshot: watch::Sender<PlaybackSnapshot>,
    deps: PlayerDeps,
    state: AppState,
    rng: StdRng,
}

impl PlayerController {
    pub fn new(deps: PlayerDeps) -> (PlayerController, PlayerHandle) {
        let (sender, commands) = mpsc::unbounded_channel();
        let (snapshot, snapshot_rx) = watch::channel(PlaybackSnapshot::default());
        let controller = PlayerController {
            commands,
            completions: sender.downgrade(),
            snapshot,
            deps,
            state: AppState::default(),
            rng: StdRng::from_entropy(),
        };
        let handle = PlayerHandle {
            commands: sender,
            snapshot: snapshot_rx,
        };
        (controller, handle)
    }

    /// Makes autoplay picks reproducible.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Loads the persisted autoplay state. Playback is not resumed.
    pub async fn restore(&mut self) -> Result<AutoplayState> {
        let saved = self.deps.state.load_autoplay().await?;
        self.state.autoplay = saved.autoplay_enabled;
        self.state.last_played = saved.last_played.clone();
        info!(
            autoplay = saved.autoplay_enabled,
            last_played = saved.last_played.as_deref().unwrap_or("-"),
            "Restored autoplay state"
        );
        self.publish();
        Ok(saved)
    }

    /// Processes commands until `shutdown` fires or every handle is dropped.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("Player started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Player stopped");
                    return;
                }
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => {
                        info!("All player handles dropped, player stopping");
                        return;
                    }
                },
            }
        }
    }

    async fn handle(&mut self, command: PlayerCommand) {
        match command {
            PlayerCommand::Join { channel, reply } => {
                reply.send(self.join(&channel).await).ok();
            }
            PlayerCommand::Play { filename, reply } => {
                reply.send(self.play(filename).await).ok();
            }
            PlayerCommand::Stop { reply } => {
                reply.send(self.stop().await).ok();
            }
            PlayerCommand::Skip { reply } => {
                reply.send(self.skip().await).ok();
            }
            PlayerCommand::Pause { reply } => {
                reply.send(self.pause()).ok();
            }
            PlayerCommand::Resume { reply } => {
                reply.send(self.resume()).ok();
            }
            PlayerCommand::ToggleAutoplay { reply } => {
                reply.send(self.toggle_autoplay().await).ok();
            }
            PlayerCommand::Finished {
                generation,
                finished,
            } => self.on_finished(generation, finished).await,
        }
    }

    #[instrument(skip(self))]
    async fn join(&mut self, channel: &str) -> Result<()> {
        self.deps.voice.join(channel).await?;
        info!("Joined voice channel");
        Ok(())
    }

    async fn play(&mut self, filename: String) -> Result<NowPlaying> {
        if !self.deps.voice.is_connected() {
            return Err(PlaybackError::NotConnected);
        }
        let path = self.library_path(&filename)?;
        let _library = self.deps.library_gate.read().await;
        let exists = core_async::fs::try_exists(&path).await.unwrap_or(false);
        if !exists {
            return Err(PlaybackError::SongNotFound(filename));
        }

        self.halt_current()?;
        self.state.history.push(filename.clone());
        self.start(filename, path, false).await
    }

    async fn stop(&mut self) -> Result<bool> {
        self.set_autoplay(false).await;

        let stopped = self.state.now_playing.take();
        let was_playing = stopped.is_some() || self.deps.voice.is_playing();
        if was_playing {
            self.state.manual_stop = true;
            self.deps.voice.stop()?;
            let file = stopped.map(|np| np.filename);
            info!(file = file.as_deref().unwrap_or("-"), "Playback stopped");
            self.emit(PlaybackEvent::Stopped { file });
        }

        self.publish();
        self.request_refresh();
        Ok(was_playing)
    }

    async fn skip(&mut self) -> Result<Option<NowPlaying>> {
        if self.state.now_playing.is_none() && !self.deps.voice.is_playing() {
            return Err(PlaybackError::NothingPlaying);
        }

        self.state.manual_stop = true;
        self.deps.voice.stop()?;
        if let Some(skipped) = self.state.now_playing.take() {
            info!(file = %skipped.filename, "Skipped");
        }
        self.publish();

        if self.state.autoplay {
            return self.advance().await;
        }
        self.request_refresh();
        Ok(None)
    }

    fn pause(&mut self) -> Result<()> {
        let now = self.deps.clock.now();
        let Some(current) = self
            .state
            .now_playing
            .as_mut()
            .filter(|np| !np.is_paused())
        else {
            return Err(PlaybackError::NothingPlaying);
        };

        self.deps.voice.pause()?;
        current.pause(now);
        let file = current.filename.clone();

        self.emit(PlaybackEvent::Paused { file });
        self.publish();
        self.request_refresh();
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        let now = self.deps.clock.now();
        let Some(current) = self
            .state
            .now_playing
            .as_mut()
            .filter(|np| np.is_paused())
        else {
            return Err(PlaybackError::NothingPlaying);
        };

        self.deps.voice.resume()?;
        current.resume(now);
        let file = current.filename.clone();

        self.emit(PlaybackEvent::Resumed { file });
        self.publish();
        self.request_refresh();
        Ok(())
    }

    async fn toggle_autoplay(&mut self) -> Result<bool> {
        let enabled = !self.state.autoplay;
        self.set_autoplay(enabled).await;

        if enabled && self.state.now_playing.is_none() && !self.deps.voice.is_playing() {
            if let Err(e) = self.advance().await {
                warn!(error = %e, "Autoplay could not start a song");
            }
        }

        self.request_refresh();
        Ok(self.state.autoplay)
    }

    async fn on_finished(&mut self, generation: u64, finished: PlaybackFinished) {
        if generation != self.state.generation {
            debug!(
                generation,
                current = self.state.generation,
                "Ignoring completion of a replaced stream"
            );
            return;
        }

        let file = finished
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        match &finished.error {
            Some(error) => warn!(file = %file, error = %error, "Playback ended with an error"),
            None => debug!(file = %file, "Playback finished"),
        }
        self.emit(PlaybackEvent::Finished {
            file,
            error: finished.error,
        });

        self.state.now_playing = None;
        self.publish();

        if self.state.manual_stop {
            self.state.manual_stop = false;
            debug!("Stream stopped by a user, not advancing");
            self.request_refresh();
            return;
        }
        if !self.state.autoplay {
            self.request_refresh();
            return;
        }
        if let Err(e) = self.advance().await {
            warn!(error = %e, "Autoplay could not continue");
            self.request_refresh();
        }
    }

    /// Starts a random song, or turns autoplay off when that is impossible.
    async fn advance(&mut self) -> Result<Option<NowPlaying>> {
        if !self.deps.voice.is_connected() {
            info!("Not connected to a voice channel, disabling autoplay");
            self.set_autoplay(false).await;
            self.request_refresh();
            return Ok(None);
        }

        let _library = self.deps.library_gate.read().await;
        let library = staging::list_audio_files(&self.deps.songs_dir).await?;
        let Some(next) = select_next(&library, &self.state.history, &mut self.rng) else {
            info!("No songs to autoplay, disabling autoplay");
            self.set_autoplay(false).await;
            self.request_refresh();
            return Ok(None);
        };

        self.state.history.push(next.clone());
        let path = self.deps.songs_dir.join(&next);
        self.start(next, path, true).await.map(Some)
    }

    #[instrument(skip_all, fields(file = %filename, autoplay = autoplay))]
    async fn start(&mut self, filename: String, path: PathBuf, autoplay: bool) -> Result<NowPlaying> {
        self.state.generation += 1;
        self.state.manual_stop = false;
        let generation = self.state.generation;

        let now_playing = self.describe(&filename, path.clone()).await;
        let on_finish = self.completion_handle(generation)?;

        if let Err(e) = self.deps.voice.play(&path, on_finish).await {
            warn!(error = %e, "Could not start playback");
            self.state.now_playing = None;
            self.publish();
            self.request_refresh();
            return Err(e.into());
        }

        info!(title = %now_playing.title, "Started playback");
        self.state.now_playing = Some(now_playing.clone());
        self.state.last_played = Some(filename.clone());
        self.persist().await;
        self.publish();
        self.request_refresh();
        self.emit(PlaybackEvent::Started {
            file: filename,
            title: now_playing.title.clone(),
            autoplay,
        });
        Ok(now_playing)
    }

    /// Stops the current stream so a new one can start.
    fn halt_current(&mut self) -> Result<()> {
        if self.state.now_playing.is_some() || self.deps.voice.is_playing() {
            self.state.manual_stop = true;
            self.deps.voice.stop()?;
        }
        Ok(())
    }

    /// Track metadata for a library file, from the catalog when the file
    /// matches the track at its position.
    async fn describe(&self, filename: &str, path: PathBuf) -> NowPlaying {
        let track = match codec::decode(filename) {
            Some(decoded) => self
                .deps
                .catalog
                .by_position(decoded.position)
                .await
                .filter(|track| codec::content_key(track) == decoded.content_key),
            None => None,
        };
        let started_at = self.deps.clock.now();

        let Some(track) = track else {
            return NowPlaying {
                path,
                filename: filename.to_string(),
                title: codec::display_stem(filename).to_string(),
                artist: UNKNOWN_ARTIST.to_string(),
                art_url: None,
                added_by: None,
                duration: None,
                started_at,
                paused_at: None,
            };
        };

        let added_by = match &track.added_by {
            Some(user_id) => self.resolve_user(user_id).await,
            None => None,
        };
        NowPlaying {
            path,
            filename: filename.to_string(),
            title: track.title.clone(),
            artist: track.primary_artist().to_string(),
            art_url: track.album_art_url.clone(),
            added_by,
            duration: (track.duration_ms > 0).then(|| Duration::from_millis(track.duration_ms)),
            started_at,
            paused_at: None,
        }
    }

    async fn resolve_user(&self, user_id: &str) -> Option<UserProfile> {
        match self.deps.users.resolve(user_id).await {
            Ok(profile) => Some(profile),
            Err(e) => {
                debug!(user_id, error = %e, "Could not resolve contributor");
                None
            }
        }
    }

    /// Only plain filenames directly inside the library are playable.
    fn library_path(&self, filename: &str) -> Result<PathBuf> {
        let name = Path::new(filename);
        if name.file_name() != Some(name.as_os_str()) || !codec::is_audio_file(filename) {
            return Err(PlaybackError::SongNotFound(filename.to_string()));
        }
        Ok(self.deps.songs_dir.join(filename))
    }

    fn completion_handle(&self, generation: u64) -> Result<CompletionHandle> {
        let sender = self
            .completions
            .upgrade()
            .ok_or(PlaybackError::PlayerStopped)?;
        Ok(CompletionHandle::new(move |finished| {
            sender
                .send(PlayerCommand::Finished {
                    generation,
                    finished,
                })
                .ok();
        }))
    }

    async fn set_autoplay(&mut self, enabled: bool) {
        let changed = self.state.autoplay != enabled;
        self.state.autoplay = enabled;
        self.persist().await;
        if changed {
            info!(enabled, "Autoplay toggled");
            self.emit(PlaybackEvent::AutoplayChanged { enabled });
        }
        self.publish();
    }

    async fn persist(&self) {
        let document = AutoplayState {
            last_played: self.state.last_played.clone(),
            autoplay_enabled: self.state.autoplay,
        };
        if let Err(e) = self.deps.state.save_autoplay(&document).await {
            warn!(error = %e, "Failed to persist autoplay state");
        }
    }

    fn publish(&self) {
        let status = match &self.state.now_playing {
            None => PlayerStatus::Idle,
            Some(np) if np.is_paused() => PlayerStatus::Paused,
            Some(_) => PlayerStatus::Playing,
        };
        self.snapshot.send_replace(PlaybackSnapshot {
            status,
            now_playing: self.state.now_playing.clone(),
            autoplay: self.state.autoplay,
        });
    }

    fn request_refresh(&self) {
        if let Err(e) = self.deps.queue.enqueue(EditAction::RefreshStatus) {
            debug!(error = %e, "Status refresh not queued");
        }
    }

    fn emit(&self, event: PlaybackEvent) {
        self.deps.events.emit(CoreEvent::Playback(event)).ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::storage::MemoryDocumentStore;
    use bridge_traits::time::ManualClock;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    struct NullUsers;

    #[async_trait::async_trait]
    impl UserDirectory for NullUsers {
        async fn resolve(&self, user_id: &str) -> bridge_traits::error::Result<UserProfile> {
            Err(bridge_traits::BridgeError::NotFound(user_id.to_string()))
        }
    }

    #[derive(Default)]
    struct StubVoice {
        connected: AtomicBool,
        playing: Mutex<Vec<PathBuf>>,
    }

    #[async_trait::async_trait]
    impl VoiceConnection for StubVoice {
        async fn join(&self, _channel: &str) -> bridge_traits::error::Result<()> {
            self.connected.store(true, Ordering::SeqCst);
            Ok(())
        }
        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }
        fn is_playing(&self) -> bool {
            false
        }
        async fn play(
            &self,
            path: &Path,
            _on_finish: CompletionHandle,
        ) -> bridge_traits::error::Result<()> {
            self.playing.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }
        fn stop(&self) -> bridge_traits::error::Result<()> {
            Ok(())
        }
        fn pause(&self) -> bridge_traits::error::Result<()> {
            Ok(())
        }
        fn resume(&self) -> bridge_traits::error::Result<()> {
            Ok(())
        }
    }

    fn controller(songs_dir: PathBuf) -> (PlayerController, PlayerHandle, Arc<StubVoice>) {
        let voice = Arc::new(StubVoice::default());
        let (queue, _consumer) = EditQueue::with_default_interval();
        let deps = PlayerDeps {
            voice: voice.clone(),
            users: Arc::new(NullUsers),
            catalog: Arc::new(TrackCatalog::new()),
            queue,
            state: StateStore::new(Arc::new(MemoryDocumentStore::new())),
            events: EventBus::new(16),
            clock: Arc::new(ManualClock::new(
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            )),
            songs_dir,
            library_gate: LibraryGate::new(),
        };
        let (controller, handle) = PlayerController::new(deps);
        (controller, handle, voice)
    }

    #[test]
    fn test_library_path_rejects_traversal() {
        let (controller, _handle, _) = controller(PathBuf::from("songs"));

        assert_eq!(
            controller.library_path("1 - A.mp3").unwrap(),
            PathBuf::from("songs/1 - A.mp3")
        );
        for bad in ["../secret.mp3", "sub/1 - A.mp3", "..", "", "notes.txt"] {
            assert!(matches!(
                controller.library_path(bad),
                Err(PlaybackError::SongNotFound(_))
            ));
        }
    }

    #[core_async::test]
    async fn test_describe_falls_back_to_file_stem() {
        let (controller, _handle, _) = controller(PathBuf::from("songs"));

        let np = controller
            .describe("7 - Mystery.mp3", PathBuf::from("songs/7 - Mystery.mp3"))
            .await;

        assert_eq!(np.title, "7 - Mystery");
        assert_eq!(np.artist, UNKNOWN_ARTIST);
        assert_eq!(np.duration, None);
    }

    #[core_async::test]
    async fn test_describe_ignores_catalog_track_with_other_title() {
        let (controller, _handle, _) = controller(PathBuf::from("songs"));
        controller
            .deps
            .catalog
            .replace(vec![bridge_traits::PlaylistTrack {
                title: "Other".to_string(),
                artists: vec!["Band".to_string()],
                duration_ms: 1000,
                album_art_url: None,
                added_by: None,
                position: 7,
            }])
            .await;

        let np = controller
            .describe("7 - Mystery.mp3", PathBuf::from("songs/7 - Mystery.mp3"))
            .await;

        assert_eq!(np.title, "7 - Mystery");
    }

    #[core_async::test]
    async fn test_restore_publishes_autoplay() {
        let (mut controller, handle, _) = controller(PathBuf::from("songs"));
        controller
            .deps
            .state
            .save_autoplay(&AutoplayState {
                last_played: Some("1 - A.mp3".to_string()),
                autoplay_enabled: true,
            })
            .await
            .unwrap();

        let restored = controller.restore().await.unwrap();

        assert!(restored.autoplay_enabled);
        assert!(handle.snapshot().autoplay);
        assert!(!handle.is_active());
    }

    #[core_async::test]
    async fn test_handle_reports_stopped_player() {
        let (controller, handle, _) = controller(PathBuf::from("songs"));
        drop(controller);

        assert!(matches!(
            handle.stop().await,
            Err(PlaybackError::PlayerStopped)
        ));
    }
}
