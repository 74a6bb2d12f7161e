//! # Playback Error Types

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Errors returned by player commands.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// The bot is not in a voice channel.
    #[error("Not connected to a voice channel")]
    NotConnected,

    /// The requested file is not in the live library.
    #[error("Song not found: {0}")]
    SongNotFound(String),

    /// The command needs a current song.
    #[error("Nothing is playing")]
    NothingPlaying,

    /// The player task is gone; the bot is shutting down.
    #[error("Player stopped")]
    PlayerStopped,

    /// Voice client, status surface or document store failure.
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// Autoplay state or status id could not be (de)serialized.
    #[error("State persistence error: {0}")]
    Persistence(String),

    #[error("Library error: {0}")]
    Library(#[from] core_sync::SyncError),
}

impl PlaybackError {
    /// True for errors caused by the request rather than the bot.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::NotConnected
                | PlaybackError::SongNotFound(_)
                | PlaybackError::NothingPlaying
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
