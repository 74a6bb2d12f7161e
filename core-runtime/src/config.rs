//! # Bot Configuration
//!
//! Settings for the playlist mirror bot: credentials, library directories,
//! scheduler intervals and external tool locations.
//!
//! ## Overview
//!
//! [`BotConfig`] is constructed either through [`BotConfig::builder`] or from
//! environment variables with [`BotConfig::from_env`]. Both paths end in
//! [`BotConfigBuilder::build`], which validates eagerly so the process refuses
//! to start with missing credentials.
//!
//! ## Environment
//!
//! | Variable | Required | Default |
//! |----------|----------|---------|
//! | `DISCORD_TOKEN` | yes | |
//! | `SPOTIPY_CLIENT_ID` | yes | |
//! | `SPOTIPY_CLIENT_SECRET` | yes | |
//! | `SPOTIFY_PLAYLIST` | yes | |
//! | `GENIUS_API_TOKEN` | no | lyrics from LRCLib only |
//! | `SONGS_DIR` | no | `songs` |
//! | `SONGS_TEMP_DIR` | no | `songs_temp` |
//! | `STATE_DIR` | no | `.` |
//! | `STATUS_CHANNEL` | no | `hikari` |
//! | `VOICE_CHANNEL` | no | `General` |
//! | `YTDLP_PATH` | no | `yt-dlp` on `PATH` |
//! | `FFMPEG_PATH` | no | `ffmpeg` on `PATH` |
//! | `SYNC_INTERVAL_SECS` | no | `300` |
//! | `EDIT_INTERVAL_SECS` | no | `5` |
//! | `SEEK_REFRESH_SECS` | no | `15` |
//! | `MAX_CONCURRENT_DOWNLOADS` | no | `4` |
//!
//! ## Usage
//!
//! ```
//! use core_runtime::config::BotConfig;
//!
//! let config = BotConfig::builder()
//!     .discord_token("discord-token")
//!     .spotify_credentials("client-id", "client-secret")
//!     .playlist("37i9dQZF1DXcBWIGoYBM5M")
//!     .build()
//!     .expect("valid config");
//!
//! assert_eq!(config.max_concurrent_downloads, 4);
//! ```

use crate::error::{Error, Result};
use crate::logging::redact_if_sensitive;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_SONGS_DIR: &str = "songs";
pub const DEFAULT_SONGS_TEMP_DIR: &str = "songs_temp";
pub const DEFAULT_STATUS_CHANNEL: &str = "hikari";
pub const DEFAULT_VOICE_CHANNEL: &str = "General";
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(300);
pub const DEFAULT_EDIT_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_SEEK_REFRESH_INTERVAL: Duration = Duration::from_secs(15);
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 4;

const MAX_CONCURRENT_DOWNLOADS_LIMIT: usize = 32;

/// Spotify client-credentials pair.
#[derive(Clone, PartialEq, Eq)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for SpotifyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpotifyCredentials")
            .field("client_id", &redact_if_sensitive("client_id", &self.client_id))
            .field(
                "client_secret",
                &redact_if_sensitive("client_secret", &self.client_secret),
            )
            .finish()
    }
}

/// Local directories the bot reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryLayout {
    /// Live library the player streams from.
    pub songs_dir: PathBuf,
    /// Staging copy the sync pipeline mutates before the swap.
    pub staging_dir: PathBuf,
    /// Where autoplay state, the status message id and the lyrics cache live.
    pub state_dir: PathBuf,
}

impl Default for LibraryLayout {
    fn default() -> Self {
        Self {
            songs_dir: PathBuf::from(DEFAULT_SONGS_DIR),
            staging_dir: PathBuf::from(DEFAULT_SONGS_TEMP_DIR),
            state_dir: PathBuf::from("."),
        }
    }
}

/// Complete bot configuration.
#[derive(Clone)]
pub struct BotConfig {
    pub discord_token: String,
    pub spotify: SpotifyCredentials,
    /// Playlist id or `open.spotify.com/playlist/...` URL.
    pub playlist: String,
    pub genius_token: Option<String>,
    pub layout: LibraryLayout,
    /// Text channel that hosts the status message.
    pub status_channel: String,
    /// Voice channel joined at startup.
    pub voice_channel: String,
    pub ytdlp_path: Option<PathBuf>,
    pub ffmpeg_path: Option<PathBuf>,
    pub sync_interval: Duration,
    /// Pause between edit queue drains.
    pub edit_interval: Duration,
    pub seek_refresh_interval: Duration,
    pub max_concurrent_downloads: usize,
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field(
                "discord_token",
                &redact_if_sensitive("discord_token", &self.discord_token),
            )
            .field("spotify", &self.spotify)
            .field("playlist", &self.playlist)
            .field(
                "genius_token",
                &self
                    .genius_token
                    .as_deref()
                    .map(|token| redact_if_sensitive("genius_token", token)),
            )
            .field("layout", &self.layout)
            .field("status_channel", &self.status_channel)
            .field("voice_channel", &self.voice_channel)
            .field("ytdlp_path", &self.ytdlp_path)
            .field("ffmpeg_path", &self.ffmpeg_path)
            .field("sync_interval", &self.sync_interval)
            .field("edit_interval", &self.edit_interval)
            .field("seek_refresh_interval", &self.seek_refresh_interval)
            .field("max_concurrent_downloads", &self.max_concurrent_downloads)
            .finish()
    }
}

impl BotConfig {
    /// Creates a new builder for constructing a `BotConfig`.
    pub fn builder() -> BotConfigBuilder {
        BotConfigBuilder::default()
    }

    /// Loads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration from an arbitrary variable source.
    ///
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| {
                Error::Config(format!(
                    "{} is required. Set it in the environment before starting the bot.",
                    key
                ))
            })
        };

        let mut builder = Self::builder()
            .discord_token(require("DISCORD_TOKEN")?)
            .spotify_credentials(
                require("SPOTIPY_CLIENT_ID")?,
                require("SPOTIPY_CLIENT_SECRET")?,
            )
            .playlist(require("SPOTIFY_PLAYLIST")?);

        if let Some(token) = get("GENIUS_API_TOKEN") {
            builder = builder.genius_token(token);
        }
        if let Some(dir) = get("SONGS_DIR") {
            builder = builder.songs_dir(dir);
        }
        if let Some(dir) = get("SONGS_TEMP_DIR") {
            builder = builder.staging_dir(dir);
        }
        if let Some(dir) = get("STATE_DIR") {
            builder = builder.state_dir(dir);
        }
        if let Some(channel) = get("STATUS_CHANNEL") {
            builder = builder.status_channel(channel);
        }
        if let Some(channel) = get("VOICE_CHANNEL") {
            builder = builder.voice_channel(channel);
        }
        if let Some(path) = get("YTDLP_PATH") {
            builder = builder.ytdlp_path(path);
        }
        if let Some(path) = get("FFMPEG_PATH") {
            builder = builder.ffmpeg_path(path);
        }
        if let Some(secs) = get("SYNC_INTERVAL_SECS") {
            builder = builder.sync_interval(Duration::from_secs(parse_var("SYNC_INTERVAL_SECS", &secs)?));
        }
        if let Some(secs) = get("EDIT_INTERVAL_SECS") {
            builder = builder.edit_interval(Duration::from_secs(parse_var("EDIT_INTERVAL_SECS", &secs)?));
        }
        if let Some(secs) = get("SEEK_REFRESH_SECS") {
            builder = builder
                .seek_refresh_interval(Duration::from_secs(parse_var("SEEK_REFRESH_SECS", &secs)?));
        }
        if let Some(count) = get("MAX_CONCURRENT_DOWNLOADS") {
            builder = builder.max_concurrent_downloads(parse_var("MAX_CONCURRENT_DOWNLOADS", &count)?);
        }

        builder.build()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.discord_token.trim().is_empty() {
            return Err(Error::Config("Discord token cannot be empty".to_string()));
        }

        if self.spotify.client_id.trim().is_empty() || self.spotify.client_secret.trim().is_empty()
        {
            return Err(Error::Config(
                "Spotify client id and secret cannot be empty".to_string(),
            ));
        }

        if self.playlist.trim().is_empty() {
            return Err(Error::Config("Playlist cannot be empty".to_string()));
        }

        if self.layout.songs_dir.as_os_str().is_empty()
            || self.layout.staging_dir.as_os_str().is_empty()
        {
            return Err(Error::Config(
                "Library directories cannot be empty".to_string(),
            ));
        }

        if self.layout.songs_dir == self.layout.staging_dir {
            return Err(Error::Config(
                "Songs directory and staging directory must differ".to_string(),
            ));
        }

        for (name, interval) in [
            ("Sync interval", self.sync_interval),
            ("Edit interval", self.edit_interval),
            ("Seek refresh interval", self.seek_refresh_interval),
        ] {
            if interval.is_zero() {
                return Err(Error::Config(format!("{} must be greater than 0", name)));
            }
        }

        if self.max_concurrent_downloads == 0 {
            return Err(Error::Config(
                "Max concurrent downloads must be greater than 0".to_string(),
            ));
        }

        if self.max_concurrent_downloads > MAX_CONCURRENT_DOWNLOADS_LIMIT {
            return Err(Error::Config(format!(
                "Max concurrent downloads exceeds maximum of {}",
                MAX_CONCURRENT_DOWNLOADS_LIMIT
            )));
        }

        Ok(())
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} has an invalid value '{}'", key, value)))
}

/// Builder for constructing [`BotConfig`] instances.
#[derive(Default)]
pub struct BotConfigBuilder {
    discord_token: Option<String>,
    spotify: Option<SpotifyCredentials>,
    playlist: Option<String>,
    genius_token: Option<String>,
    layout: LibraryLayout,
    status_channel: Option<String>,
    voice_channel: Option<String>,
    ytdlp_path: Option<PathBuf>,
    ffmpeg_path: Option<PathBuf>,
    sync_interval: Option<Duration>,
    edit_interval: Option<Duration>,
    seek_refresh_interval: Option<Duration>,
    max_concurrent_downloads: Option<usize>,
}

impl BotConfigBuilder {
    /// Sets the Discord bot token (required).
    pub fn discord_token(mut self, token: impl Into<String>) -> Self {
        self.discord_token = Some(token.into());
        self
    }

    /// Sets the Spotify client-credentials pair (required).
    pub fn spotify_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.spotify = Some(SpotifyCredentials {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        });
        self
    }

    /// Sets the mirrored playlist, as an id or a share URL (required).
    pub fn playlist(mut self, playlist: impl Into<String>) -> Self {
        self.playlist = Some(playlist.into());
        self
    }

    /// Enables the Genius lyrics provider.
    pub fn genius_token(mut self, token: impl Into<String>) -> Self {
        self.genius_token = Some(token.into());
        self
    }

    pub fn songs_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.layout.songs_dir = path.into();
        self
    }

    pub fn staging_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.layout.staging_dir = path.into();
        self
    }

    pub fn state_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.layout.state_dir = path.into();
        self
    }

    pub fn status_channel(mut self, channel: impl Into<String>) -> Self {
        self.status_channel = Some(channel.into());
        self
    }

    pub fn voice_channel(mut self, channel: impl Into<String>) -> Self {
        self.voice_channel = Some(channel.into());
        self
    }

    /// Overrides the `yt-dlp` executable.
    pub fn ytdlp_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.ytdlp_path = Some(path.into());
        self
    }

    /// Overrides the `ffmpeg` executable.
    pub fn ffmpeg_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.ffmpeg_path = Some(path.into());
        self
    }

    /// Sets the periodic sync interval.
    ///
    /// Default: 5 minutes
    pub fn sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = Some(interval);
        self
    }

    /// Sets the edit queue drain interval.
    ///
    /// Default: 5 seconds
    pub fn edit_interval(mut self, interval: Duration) -> Self {
        self.edit_interval = Some(interval);
        self
    }

    /// Sets how often the seek bar is refreshed while playing.
    ///
    /// Default: 15 seconds
    pub fn seek_refresh_interval(mut self, interval: Duration) -> Self {
        self.seek_refresh_interval = Some(interval);
        self
    }

    /// Sets the download pool size.
    ///
    /// Default: 4
    pub fn max_concurrent_downloads(mut self, count: usize) -> Self {
        self.max_concurrent_downloads = Some(count);
        self
    }

    /// Builds the final `BotConfig` instance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] with an actionable message when a required
    /// value is missing or a value is out of range.
    pub fn build(self) -> Result<BotConfig> {
        let discord_token = self.discord_token.ok_or_else(|| {
            Error::Config(
                "Discord token is required. Use .discord_token() to set it.".to_string(),
            )
        })?;

        let spotify = self.spotify.ok_or_else(|| {
            Error::Config(
                "Spotify credentials are required. Use .spotify_credentials() to set them."
                    .to_string(),
            )
        })?;

        let playlist = self.playlist.ok_or_else(|| {
            Error::Config("Playlist is required. Use .playlist() to set it.".to_string())
        })?;

        let config = BotConfig {
            discord_token,
            spotify,
            playlist,
            genius_token: self.genius_token,
            layout: self.layout,
            status_channel: self
                .status_channel
                .unwrap_or_else(|| DEFAULT_STATUS_CHANNEL.to_string()),
            voice_channel: self
                .voice_channel
                .unwrap_or_else(|| DEFAULT_VOICE_CHANNEL.to_string()),
            ytdlp_path: self.ytdlp_path,
            ffmpeg_path: self.ffmpeg_path,
            sync_interval: self.sync_interval.unwrap_or(DEFAULT_SYNC_INTERVAL),
            edit_interval: self.edit_interval.unwrap_or(DEFAULT_EDIT_INTERVAL),
            seek_refresh_interval: self
                .seek_refresh_interval
                .unwrap_or(DEFAULT_SEEK_REFRESH_INTERVAL),
            max_concurrent_downloads: self
                .max_concurrent_downloads
                .unwrap_or(DEFAULT_MAX_CONCURRENT_DOWNLOADS),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn minimal() -> BotConfigBuilder {
        BotConfig::builder()
            .discord_token("discord")
            .spotify_credentials("id", "secret")
            .playlist("playlist-id")
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("DISCORD_TOKEN", "discord"),
        ("SPOTIPY_CLIENT_ID", "id"),
        ("SPOTIPY_CLIENT_SECRET", "secret"),
        ("SPOTIFY_PLAYLIST", "https://open.spotify.com/playlist/abc?si=1"),
    ];

    #[test]
    fn test_builder_defaults() {
        let config = minimal().build().unwrap();

        assert_eq!(config.layout.songs_dir, PathBuf::from("songs"));
        assert_eq!(config.layout.staging_dir, PathBuf::from("songs_temp"));
        assert_eq!(config.status_channel, "hikari");
        assert_eq!(config.voice_channel, "General");
        assert_eq!(config.sync_interval, Duration::from_secs(300));
        assert_eq!(config.edit_interval, Duration::from_secs(5));
        assert_eq!(config.seek_refresh_interval, Duration::from_secs(15));
        assert_eq!(config.max_concurrent_downloads, 4);
        assert!(config.genius_token.is_none());
    }

    #[test]
    fn test_builder_requires_discord_token() {
        let result = BotConfig::builder()
            .spotify_credentials("id", "secret")
            .playlist("p")
            .build();

        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Discord token is required"));
    }

    #[test]
    fn test_builder_requires_spotify_credentials() {
        let result = BotConfig::builder()
            .discord_token("discord")
            .playlist("p")
            .build();

        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Spotify credentials are required"));
    }

    #[test]
    fn test_builder_requires_playlist() {
        let result = BotConfig::builder()
            .discord_token("discord")
            .spotify_credentials("id", "secret")
            .build();

        assert!(result.unwrap_err().to_string().contains("Playlist is required"));
    }

    #[test]
    fn test_validate_rejects_same_directories() {
        let result = minimal().songs_dir("lib").staging_dir("lib").build();
        assert!(result.unwrap_err().to_string().contains("must differ"));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let result = minimal().edit_interval(Duration::ZERO).build();
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Edit interval must be greater than 0"));
    }

    #[test]
    fn test_validate_rejects_download_pool_bounds() {
        assert!(minimal().max_concurrent_downloads(0).build().is_err());
        assert!(minimal().max_concurrent_downloads(33).build().is_err());
        assert!(minimal().max_concurrent_downloads(8).build().is_ok());
    }

    #[test]
    fn test_from_lookup_required_only() {
        let config = BotConfig::from_lookup(lookup(REQUIRED)).unwrap();

        assert_eq!(config.discord_token, "discord");
        assert_eq!(config.spotify.client_id, "id");
        assert_eq!(
            config.playlist,
            "https://open.spotify.com/playlist/abc?si=1"
        );
        assert_eq!(config.max_concurrent_downloads, 4);
    }

    #[test]
    fn test_from_lookup_missing_credential_fails_fast() {
        let vars: Vec<_> = REQUIRED
            .iter()
            .copied()
            .filter(|(k, _)| *k != "SPOTIPY_CLIENT_SECRET")
            .collect();

        let err = BotConfig::from_lookup(lookup(&vars)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("SPOTIPY_CLIENT_SECRET is required"));
    }

    #[test]
    fn test_from_lookup_blank_counts_as_missing() {
        let mut vars = REQUIRED.to_vec();
        vars[0] = ("DISCORD_TOKEN", "   ");

        let err = BotConfig::from_lookup(lookup(&vars)).unwrap_err();
        assert!(err.to_string().contains("DISCORD_TOKEN is required"));
    }

    #[test]
    fn test_from_lookup_optional_values() {
        let mut vars = REQUIRED.to_vec();
        vars.extend_from_slice(&[
            ("GENIUS_API_TOKEN", "genius"),
            ("SONGS_DIR", "/srv/songs"),
            ("SONGS_TEMP_DIR", "/srv/songs_temp"),
            ("STATE_DIR", "/srv/state"),
            ("VOICE_CHANNEL", "Lounge"),
            ("FFMPEG_PATH", "/opt/ffmpeg/bin/ffmpeg"),
            ("SYNC_INTERVAL_SECS", "600"),
            ("MAX_CONCURRENT_DOWNLOADS", "2"),
        ]);

        let config = BotConfig::from_lookup(lookup(&vars)).unwrap();

        assert_eq!(config.genius_token.as_deref(), Some("genius"));
        assert_eq!(config.layout.songs_dir, PathBuf::from("/srv/songs"));
        assert_eq!(config.layout.state_dir, PathBuf::from("/srv/state"));
        assert_eq!(config.voice_channel, "Lounge");
        assert_eq!(
            config.ffmpeg_path,
            Some(PathBuf::from("/opt/ffmpeg/bin/ffmpeg"))
        );
        assert_eq!(config.sync_interval, Duration::from_secs(600));
        assert_eq!(config.max_concurrent_downloads, 2);
    }

    #[test]
    fn test_from_lookup_rejects_non_numeric() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("EDIT_INTERVAL_SECS", "soon"));

        let err = BotConfig::from_lookup(lookup(&vars)).unwrap_err();
        assert!(err.to_string().contains("EDIT_INTERVAL_SECS"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = minimal().genius_token("genius-secret").build().unwrap();
        let rendered = format!("{:?}", config);

        assert!(!rendered.contains("discord\""));
        assert!(!rendered.contains("genius-secret"));
        assert!(!rendered.contains("\"secret\""));
        assert!(!rendered.contains("\"id\""));
        assert!(rendered.contains("[REDACTED]"));
        assert!(rendered.contains("playlist-id"));
    }

    #[test]
    fn test_config_is_cloneable() {
        let config = minimal().build().unwrap();
        let cloned = config.clone();
        assert_eq!(cloned.playlist, config.playlist);
    }
}
