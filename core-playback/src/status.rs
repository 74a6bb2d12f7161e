//! # Status Publisher
//!
//! Keeps one "now playing" message up to date in the status channel.
//!
//! ## Overview
//!
//! [`StatusPublisher`] implements [`StatusRefresher`], so it only ever runs
//! from the edit queue consumer. Each refresh renders a [`StatusCard`] from
//! the latest [`PlaybackSnapshot`] and the last sync time, then edits the
//! known message or posts a new one. Refreshes less than a second apart are
//! dropped. A message deleted by someone is forgotten and recreated on the
//! next refresh.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bridge_traits::error::BridgeError;
use bridge_traits::status::{ControlState, MessageId, StatusCard, StatusSurface};
use bridge_traits::time::Clock;
use chrono::{DateTime, Utc};
use core_async::sync::{watch, Mutex};
use core_sync::{RefreshOutcome, StatusRefresher};
use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::persistence::StateStore;
use crate::state::{NowPlaying, PlaybackSnapshot, PlayerStatus};

pub const STATUS_FOOTER: &str = "Hikari Melody";
pub const IDLE_HEADLINE: &str = "Playback Paused";
pub const IDLE_DESCRIPTION: &str = "Ready to play music. Use /play to start.";
pub const IDLE_PRESENCE: &str = "your playlist";

/// Blocks in the seek bar.
pub const SEEK_BAR_BLOCKS: usize = 12;

/// Minimum time between two refreshes.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

const PRESENCE_MAX_CHARS: usize = 128;

#[derive(Default)]
struct PublisherState {
    message_id: Option<MessageId>,
    last_refresh: Option<DateTime<Utc>>,
}

pub struct StatusPublisher {
    surface: Arc<dyn StatusSurface>,
    playback: watch::Receiver<PlaybackSnapshot>,
    last_sync: watch::Receiver<Option<DateTime<Utc>>>,
    store: StateStore,
    clock: Arc<dyn Clock>,
    state: Mutex<PublisherState>,
}

impl StatusPublisher {
    pub fn new(
        surface: Arc<dyn StatusSurface>,
        playback: watch::Receiver<PlaybackSnapshot>,
        last_sync: watch::Receiver<Option<DateTime<Utc>>>,
        store: StateStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            surface,
            playback,
            last_sync,
            store,
            clock,
            state: Mutex::new(PublisherState::default()),
        }
    }

    /// Adopts the message id persisted by a previous run.
    pub async fn restore(&self) -> Result<Option<MessageId>> {
        let id = self.store.load_status_message_id().await?;
        if let Some(id) = id {
            info!(message_id = id.0, "Restored status message id");
        }
        self.state.lock().await.message_id = id;
        Ok(id)
    }

    pub async fn message_id(&self) -> Option<MessageId> {
        self.state.lock().await.message_id
    }

    /// The card a refresh at `now` would publish.
    pub fn render(&self, now: DateTime<Utc>) -> StatusCard {
        let snapshot = self.playback.borrow().clone();
        let last_sync = *self.last_sync.borrow();
        render_card(&snapshot, last_sync, now)
    }

    async fn forget_message(&self, state: &mut PublisherState) {
        state.message_id = None;
        if let Err(e) = self.store.clear_status_message_id().await {
            warn!(error = %e, "Failed to clear status message id");
        }
    }
}

#[async_trait]
impl StatusRefresher for StatusPublisher {
    #[instrument(skip(self))]
    async fn refresh(&self) -> core_sync::Result<RefreshOutcome> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;

        if let Some(last) = state.last_refresh {
            let since = (now - last).to_std().unwrap_or(Duration::ZERO);
            if since < MIN_REFRESH_INTERVAL {
                debug!(since_ms = since.as_millis() as u64, "Status refresh throttled");
                return Ok(RefreshOutcome::Throttled);
            }
        }
        state.last_refresh = Some(now);

        let card = self.render(now);
        let Some(id) = state.message_id else {
            let id = self.surface.post(&card).await?;
            info!(message_id = id.0, "Posted status message");
            state.message_id = Some(id);
            if let Err(e) = self.store.save_status_message_id(id).await {
                warn!(error = %e, "Failed to persist status message id");
            }
            return Ok(RefreshOutcome::Posted);
        };

        match self.surface.edit(id, &card).await {
            Ok(()) => Ok(RefreshOutcome::Edited),
            Err(BridgeError::NotFound(_)) => {
                warn!(message_id = id.0, "Status message was deleted, it will be recreated");
                self.forget_message(&mut state).await;
                Ok(RefreshOutcome::NoMessage)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Renders the status card for `snapshot`.
pub fn render_card(
    snapshot: &PlaybackSnapshot,
    last_sync: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> StatusCard {
    let sync_line = last_sync
        .map(|at| format!("\n\nLast synced: {}", at.format("%Y-%m-%d %H:%M UTC")))
        .unwrap_or_default();

    let Some(current) = &snapshot.now_playing else {
        return StatusCard {
            headline: IDLE_HEADLINE.to_string(),
            description: format!("{}{}", IDLE_DESCRIPTION, sync_line),
            thumbnail_url: None,
            footer: STATUS_FOOTER.to_string(),
            presence: Some(IDLE_PRESENCE.to_string()),
            controls: ControlState {
                skip_enabled: false,
                stop_enabled: false,
                autoplay_on: snapshot.autoplay,
            },
        };
    };

    let headline = match snapshot.status {
        PlayerStatus::Paused => "Paused",
        _ => "Now Playing",
    };
    StatusCard {
        headline: headline.to_string(),
        description: format!("{}{}", describe(current, now), sync_line),
        thumbnail_url: current.art_url.clone(),
        footer: STATUS_FOOTER.to_string(),
        presence: Some(current.title.chars().take(PRESENCE_MAX_CHARS).collect()),
        controls: ControlState {
            skip_enabled: true,
            stop_enabled: true,
            autoplay_on: snapshot.autoplay,
        },
    }
}

fn describe(current: &NowPlaying, now: DateTime<Utc>) -> String {
    let mut text = format!("{}\nby {}", current.title, current.artist);
    if let Some(user) = &current.added_by {
        text.push_str(&format!("\nAdded by {} ({})", user.display_name, user.profile_url));
    }
    if let Some(duration) = current.duration.filter(|d| !d.is_zero()) {
        text.push('\n');
        text.push_str(&seek_bar(current.elapsed(now), duration));
    }
    text
}

/// `"▓▓▓▒▒▒▒▒▒▒▒▒ 00:45 / 03:00"`.
pub fn seek_bar(elapsed: Duration, duration: Duration) -> String {
    let elapsed = elapsed.min(duration);
    let filled = if duration.is_zero() {
        0
    } else {
        ((elapsed.as_secs_f64() / duration.as_secs_f64()) * SEEK_BAR_BLOCKS as f64) as usize
    }
    .min(SEEK_BAR_BLOCKS);

    format!(
        "{}{} {} / {}",
        "▓".repeat(filled),
        "▒".repeat(SEEK_BAR_BLOCKS - filled),
        format_time(elapsed),
        format_time(duration)
    )
}

/// `mm:ss`, minutes unbounded.
pub fn format_time(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
