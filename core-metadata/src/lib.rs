//! Lyrics lookup for the currently playing song.
//!
//! [`LyricsService`] checks the on-disk cache, then asks each configured
//! provider in turn and caches the first hit.

pub mod error;
pub mod lyrics;
pub mod providers;

pub use error::{MetadataError, Result};
pub use lyrics::{
    chunk_lyrics, LyricsProvider, LyricsQuery, LyricsService, LyricsSource, RetryConfig,
    LYRICS_CHUNK_SIZE,
};
pub use providers::{GeniusProvider, LrcLibProvider};
