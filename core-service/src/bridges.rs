//! Host capabilities the bot is built from.

use std::sync::Arc;

use bridge_traits::{
    AudioFetcher, AudioFilterRunner, Clock, DocumentStore, HttpClient, PlaylistSource,
    StatusSurface, UserDirectory, VoiceConnection,
};

/// Every outside-world dependency of the bot.
///
/// The chat adapter always provides `voice` and `status`; the rest comes from
/// [`desktop_bridges`] unless a test swaps in fakes.
#[derive(Clone)]
pub struct BotBridges {
    pub http: Arc<dyn HttpClient>,
    pub playlist: Arc<dyn PlaylistSource>,
    pub users: Arc<dyn UserDirectory>,
    pub fetcher: Arc<dyn AudioFetcher>,
    pub filter_runner: Arc<dyn AudioFilterRunner>,
    pub voice: Arc<dyn VoiceConnection>,
    pub status: Arc<dyn StatusSurface>,
    pub documents: Arc<dyn DocumentStore>,
    pub clock: Arc<dyn Clock>,
}

#[cfg(feature = "desktop-shims")]
pub use desktop::desktop_bridges;

#[cfg(feature = "desktop-shims")]
mod desktop {
    use std::sync::Arc;

    use bridge_desktop::{FfmpegFilterRunner, FileDocumentStore, ReqwestHttpClient, YtDlpFetcher};
    use bridge_traits::{StatusSurface, SystemClock, VoiceConnection};
    use core_runtime::config::BotConfig;
    use provider_spotify::SpotifyConnector;
    use tracing::info;

    use super::BotBridges;
    use crate::error::{Result, ServiceError};

    /// Builds the reqwest/yt-dlp/ffmpeg/file-store adapters and the Spotify
    /// connector from `config`.
    pub fn desktop_bridges(
        config: &BotConfig,
        voice: Arc<dyn VoiceConnection>,
        status: Arc<dyn StatusSurface>,
    ) -> Result<BotBridges> {
        let http = Arc::new(ReqwestHttpClient::new()?);
        let spotify = Arc::new(
            SpotifyConnector::new(
                http.clone(),
                config.spotify.client_id.clone(),
                config.spotify.client_secret.clone(),
                &config.playlist,
            )
            .map_err(|e| ServiceError::InitializationFailed(e.to_string()))?,
        );
        info!(playlist_id = spotify.playlist_id(), "Spotify connector ready");

        let mut fetcher = match &config.ytdlp_path {
            Some(program) => YtDlpFetcher::with_program(program.clone()),
            None => YtDlpFetcher::new(),
        };
        if let Some(ffmpeg) = &config.ffmpeg_path {
            fetcher = fetcher.with_ffmpeg_location(ffmpeg.clone());
        }
        let filter_runner = match &config.ffmpeg_path {
            Some(program) => FfmpegFilterRunner::with_program(program.clone()),
            None => FfmpegFilterRunner::new(),
        };

        Ok(BotBridges {
            http,
            playlist: spotify.clone(),
            users: spotify,
            fetcher: Arc::new(fetcher),
            filter_runner: Arc::new(filter_runner),
            voice,
            status,
            documents: Arc::new(FileDocumentStore::new(config.layout.state_dir.clone())),
            clock: Arc::new(SystemClock),
        })
    }
}
