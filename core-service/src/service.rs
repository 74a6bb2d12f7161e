//! Command surface used by the chat adapter.

use std::path::PathBuf;
use std::sync::Arc;

use core_async::sync::oneshot;
use core_metadata::{chunk_lyrics, LyricsQuery, LyricsService, LYRICS_CHUNK_SIZE};
use core_playback::{NowPlaying, PlaybackError, PlaybackSnapshot, PlayerHandle};
use core_sync::{codec, staging, SyncCoordinator, SyncOutcome, SyncTrigger};
use tracing::{info, instrument, warn};

use crate::error::{Result, ServiceError};

/// Most suggestions a chat client accepts for one autocomplete request.
pub const MAX_AUTOCOMPLETE_CHOICES: usize = 25;

/// One autocomplete suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongChoice {
    /// Shown to the user: the filename without extension.
    pub name: String,
    /// Sent back with `/play`: the library filename.
    pub value: String,
}

/// Lyrics of the current song, split for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricsReply {
    pub title: String,
    pub artist: String,
    pub chunks: Vec<String>,
}

impl LyricsReply {
    /// Chat messages, the first one headed with the song.
    pub fn messages(&self) -> Vec<String> {
        let total = self.chunks.len();
        self.chunks
            .iter()
            .enumerate()
            .map(|(index, chunk)| {
                if index == 0 {
                    format!(
                        "Lyrics for {} - {} (part 1/{})\n\n{}",
                        self.title, self.artist, total, chunk
                    )
                } else {
                    chunk.clone()
                }
            })
            .collect()
    }
}

/// Pending result of a manual sync running in the background.
pub struct SyncHandle {
    receiver: oneshot::Receiver<core_sync::Result<SyncOutcome>>,
}

impl SyncHandle {
    pub async fn outcome(self) -> Result<SyncOutcome> {
        let outcome = self
            .receiver
            .await
            .map_err(|_| ServiceError::SyncAborted)?;
        Ok(outcome?)
    }
}

/// Cloneable handle to the running bot's commands.
#[derive(Clone)]
pub struct BotService {
    player: PlayerHandle,
    coordinator: Arc<SyncCoordinator>,
    lyrics: Arc<LyricsService>,
    songs_dir: PathBuf,
}

impl BotService {
    pub(crate) fn new(
        player: PlayerHandle,
        coordinator: Arc<SyncCoordinator>,
        lyrics: Arc<LyricsService>,
        songs_dir: PathBuf,
    ) -> Self {
        Self {
            player,
            coordinator,
            lyrics,
            songs_dir,
        }
    }

    pub fn player(&self) -> &PlayerHandle {
        &self.player
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.player.snapshot()
    }

    pub async fn play(&self, filename: &str) -> Result<NowPlaying> {
        Ok(self.player.play(filename).await?)
    }

    /// Library songs whose filename contains `partial`, ignoring case,
    /// ordered by playlist position.
    pub async fn autocomplete(&self, partial: &str) -> Result<Vec<SongChoice>> {
        let needle = partial.to_lowercase();
        let files = staging::list_audio_files(&self.songs_dir).await?;
        Ok(files
            .into_iter()
            .filter(|name| name.to_lowercase().contains(&needle))
            .take(MAX_AUTOCOMPLETE_CHOICES)
            .map(|name| SongChoice {
                name: codec::display_stem(&name).to_string(),
                value: name,
            })
            .collect())
    }

    pub async fn join(&self, channel: &str) -> Result<()> {
        Ok(self.player.join(channel).await?)
    }

    /// Starts a sync in the background and returns at once.
    pub fn sync(&self) -> SyncHandle {
        let (sender, receiver) = oneshot::channel();
        let coordinator = Arc::clone(&self.coordinator);
        core_async::spawn(async move {
            let outcome = coordinator.sync(SyncTrigger::Manual).await;
            if let Ok(SyncOutcome::Postponed(reason)) = &outcome {
                info!(reason = %reason, "Manual sync postponed");
            }
            sender.send(outcome).ok();
        });
        SyncHandle { receiver }
    }

    pub async fn toggle_autoplay(&self) -> Result<bool> {
        Ok(self.player.toggle_autoplay().await?)
    }

    pub async fn stop(&self) -> Result<bool> {
        Ok(self.player.stop().await?)
    }

    pub async fn skip(&self) -> Result<Option<NowPlaying>> {
        Ok(self.player.skip().await?)
    }

    pub async fn pause(&self) -> Result<()> {
        Ok(self.player.pause().await?)
    }

    pub async fn resume(&self) -> Result<()> {
        Ok(self.player.resume().await?)
    }

    /// Lyrics of the current song, `None` when no provider has them.
    #[instrument(skip(self))]
    pub async fn lyrics(&self) -> Result<Option<LyricsReply>> {
        let Some(current) = self.player.snapshot().now_playing else {
            return Err(PlaybackError::NothingPlaying.into());
        };

        let mut query = LyricsQuery::new(&current.title, &current.artist);
        if let Some(duration) = current.duration {
            query = query.with_duration_secs(duration.as_secs() as u32);
        }

        let text = match self.lyrics.fetch_lyrics(&query).await? {
            Some(text) => text,
            None => {
                warn!(title = %current.title, "No lyrics found");
                return Ok(None);
            }
        };

        Ok(Some(LyricsReply {
            chunks: chunk_lyrics(&text, LYRICS_CHUNK_SIZE),
            title: current.title,
            artist: current.artist,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lyrics_messages_head_first_chunk() {
        let reply = LyricsReply {
            title: "Song".to_string(),
            artist: "Artist".to_string(),
            chunks: vec!["one".to_string(), "two".to_string()],
        };

        assert_eq!(
            reply.messages(),
            vec![
                "Lyrics for Song - Artist (part 1/2)\n\none".to_string(),
                "two".to_string()
            ]
        );
    }
}
