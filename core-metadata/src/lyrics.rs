//! # Lyrics Module
//!
//! Fetches plain-text lyrics for the current song and caches them on disk.
//!
//! ## Features
//!
//! - Provider fallback (Genius when a token is configured, then LRCLib)
//! - Read-through cache in a [`DocumentStore`] under `lyrics_cache/`
//! - Retry logic with exponential backoff
//! - Splitting into message-sized chunks
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_metadata::lyrics::{chunk_lyrics, LyricsService, LYRICS_CHUNK_SIZE};
//!
//! let service = LyricsService::new(http_client, genius_token, store);
//!
//! if let Some(text) = service.lyrics_for("Song", "Artist").await? {
//!     for chunk in chunk_lyrics(&text, LYRICS_CHUNK_SIZE) {
//!         send(chunk).await;
//!     }
//! }
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bridge_traits::http::HttpClient;
use bridge_traits::storage::DocumentStore;
use core_sync::codec::sanitize;
use tracing::{debug, info, instrument, warn};

use crate::error::{MetadataError, Result};
use crate::providers::{GeniusProvider, LrcLibProvider};

/// Cache documents live under this prefix.
pub const LYRICS_CACHE_DIR: &str = "lyrics_cache";

/// Largest chunk that fits one chat message with a header.
pub const LYRICS_CHUNK_SIZE: usize = 1900;

// =============================================================================
// Core Types
// =============================================================================

/// Lyrics search parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricsQuery {
    pub title: String,
    pub artist: String,
    /// Track length, helps LRCLib pick the right recording
    pub duration_secs: Option<u32>,
}

impl LyricsQuery {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            duration_secs: None,
        }
    }

    pub fn with_duration_secs(mut self, duration_secs: u32) -> Self {
        self.duration_secs = Some(duration_secs);
        self
    }

    /// Cache key: `sanitize("{title} - {artist}")`
    pub fn cache_key(&self) -> String {
        sanitize(&format!("{} - {}", self.title, self.artist))
    }

    /// Document path of the cached text.
    pub fn cache_path(&self) -> String {
        format!("{}/{}.txt", LYRICS_CACHE_DIR, self.cache_key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LyricsSource {
    Genius,
    LrcLib,
}

impl LyricsSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Genius => "genius",
            Self::LrcLib => "lrclib",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Genius => "Genius",
            Self::LrcLib => "LRCLib",
        }
    }
}

impl fmt::Display for LyricsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// =============================================================================
// Provider Trait
// =============================================================================

/// Trait for lyrics provider implementations
#[async_trait]
pub trait LyricsProvider: Send + Sync {
    /// Fetch lyrics for a track
    ///
    /// # Returns
    /// * `Ok(Some(text))` if lyrics found
    /// * `Ok(None)` if the provider has no lyrics for the track
    /// * `Err` on API error or network failure
    async fn fetch(&self, query: &LyricsQuery) -> Result<Option<String>>;

    fn source(&self) -> LyricsSource;
}

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum attempts per provider
    pub max_attempts: usize,
    /// Base delay for exponential backoff
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 250,
        }
    }
}

impl RetryConfig {
    fn backoff_duration(&self, attempt: usize) -> Duration {
        let delay_ms = self.base_delay_ms.saturating_mul(2u64.pow(attempt as u32));
        Duration::from_millis(delay_ms.min(10_000))
    }
}

// =============================================================================
// Lyrics Service
// =============================================================================

pub struct LyricsService {
    providers: Vec<Box<dyn LyricsProvider>>,
    store: Arc<dyn DocumentStore>,
    retry_config: RetryConfig,
}

impl LyricsService {
    /// Genius first when `genius_token` is set, LRCLib always.
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        genius_token: Option<String>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        let mut providers: Vec<Box<dyn LyricsProvider>> = Vec::new();

        match genius_token.filter(|token| !token.trim().is_empty()) {
            Some(token) => providers.push(Box::new(GeniusProvider::new(
                http_client.clone(),
                token,
            ))),
            None => debug!("Genius token not configured, provider disabled"),
        }
        providers.push(Box::new(LrcLibProvider::new(http_client)));

        Self::with_providers(providers, store)
    }

    pub fn with_providers(
        providers: Vec<Box<dyn LyricsProvider>>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            providers,
            store,
            retry_config: RetryConfig::default(),
        }
    }

    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Lyrics for `title` by `artist`.
    pub async fn lyrics_for(&self, title: &str, artist: &str) -> Result<Option<String>> {
        self.fetch_lyrics(&LyricsQuery::new(title, artist)).await
    }

    /// Cache first, then each provider in order; a hit is written back to
    /// the cache.
    ///
    /// # Errors
    ///
    /// [`MetadataError::LyricsFetchFailed`] when every provider failed. A
    /// provider that answered "not found" makes the result `Ok(None)`.
    #[instrument(skip_all, fields(title = %query.title, artist = %query.artist))]
    pub async fn fetch_lyrics(&self, query: &LyricsQuery) -> Result<Option<String>> {
        let cache_path = query.cache_path();
        match self.store.load(&cache_path).await {
            Ok(Some(cached)) => {
                debug!(path = %cache_path, "Found cached lyrics");
                return Ok(Some(cached));
            }
            Ok(None) => {}
            Err(e) => warn!(path = %cache_path, error = %e, "Failed to read lyrics cache"),
        }

        let mut errors = Vec::new();
        for provider in &self.providers {
            let source = provider.source();
            match self.fetch_with_retry(provider.as_ref(), query).await {
                Ok(Some(text)) => {
                    info!(source = source.as_str(), "Fetched lyrics");
                    if let Err(e) = self.store.save(&cache_path, &text).await {
                        warn!(path = %cache_path, error = %e, "Failed to cache lyrics");
                    }
                    return Ok(Some(text));
                }
                Ok(None) => {
                    debug!(source = source.as_str(), "Lyrics not found at provider");
                }
                Err(e) => {
                    warn!(source = source.as_str(), error = %e, "Provider fetch failed");
                    errors.push(format!("{}: {}", source, e));
                }
            }
        }

        if !errors.is_empty() && errors.len() == self.providers.len() {
            return Err(MetadataError::LyricsFetchFailed(errors.join("; ")));
        }
        info!("No lyrics found from any provider");
        Ok(None)
    }

    async fn fetch_with_retry(
        &self,
        provider: &dyn LyricsProvider,
        query: &LyricsQuery,
    ) -> Result<Option<String>> {
        let mut attempts = 0;
        loop {
            match provider.fetch(query).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    attempts += 1;
                    if attempts >= self.retry_config.max_attempts.max(1) {
                        return Err(e);
                    }
                    let delay = self.retry_config.backoff_duration(attempts);
                    debug!(
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying after failure"
                    );
                    core_async::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Splits `text` into pieces of at most `max_chars` characters.
pub fn chunk_lyrics(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Removes Genius' trailing `"<digits>Embed..."` marker from every line and
/// trims the result.
pub fn strip_embed_marker(text: &str) -> String {
    let cleaned: Vec<&str> = text
        .split('\n')
        .map(|line| match line.find("Embed") {
            Some(index) => line[..index].trim_end_matches(|c: char| c.is_ascii_digit()),
            None => line,
        })
        .collect();
    cleaned.join("\n").trim().to_string()
}
