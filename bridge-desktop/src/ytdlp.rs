//! Audio downloader backed by the `yt-dlp` executable.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    media::{AudioFetcher, FetchRequest},
};
use core_async::fs;
use core_async::process::{stderr_tail, Command, Stdio};
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::{debug, info, instrument, warn};

/// Runs `yt-dlp` as a child process, one process per download.
///
/// The first search hit is downloaded as best available audio, converted to
/// 192 kbps mp3 and stripped of sponsor segments.
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    program: PathBuf,
    ffmpeg_location: Option<PathBuf>,
}

impl YtDlpFetcher {
    /// Uses `yt-dlp` from `PATH`.
    pub fn new() -> Self {
        Self::with_program("yt-dlp")
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ffmpeg_location: None,
        }
    }

    /// Points yt-dlp at a specific ffmpeg build for the mp3 conversion.
    pub fn with_ffmpeg_location(mut self, ffmpeg: impl Into<PathBuf>) -> Self {
        self.ffmpeg_location = Some(ffmpeg.into());
        self
    }

    fn arguments(&self, request: &FetchRequest) -> Vec<OsString> {
        let mut template = request.destination.as_os_str().to_owned();
        template.push(".%(ext)s");

        let mut args: Vec<OsString> = [
            "--no-update",
            "--no-playlist",
            "--quiet",
            "--no-warnings",
            "-f",
            "bestaudio/best",
            "-x",
            "--audio-format",
            "mp3",
            "--audio-quality",
            "192K",
        ]
        .iter()
        .map(OsString::from)
        .collect();

        if !request.remove_segments.is_empty() {
            args.push("--sponsorblock-remove".into());
            args.push(request.segment_list().into());
        }
        if let Some(ffmpeg) = &self.ffmpeg_location {
            args.push("--ffmpeg-location".into());
            args.push(ffmpeg.as_os_str().to_owned());
        }

        args.push("-o".into());
        args.push(template);
        args.push(format!("ytsearch1:{}", request.query).into());
        args
    }
}

impl Default for YtDlpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioFetcher for YtDlpFetcher {
    #[instrument(skip(self, request), fields(query = %request.query))]
    async fn fetch(&self, request: &FetchRequest) -> Result<PathBuf> {
        if let Some(parent) = request.destination.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        debug!(program = ?self.program, "Spawning downloader");
        let output = Command::new(&self.program)
            .args(self.arguments(request))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                BridgeError::NotAvailable(format!(
                    "Failed to launch {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let detail = stderr_tail(&output, 5);
            warn!(status = ?output.status, "Downloader exited unsuccessfully");
            return Err(BridgeError::OperationFailed(format!(
                "yt-dlp failed ({}): {}",
                output.status, detail
            )));
        }

        let path = request.output_path();
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(BridgeError::OperationFailed(format!(
                "yt-dlp produced no file at {}",
                path.display()
            )));
        }

        info!(file = ?path.file_name(), "Download finished");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_arguments_match_download_profile() {
        let fetcher = YtDlpFetcher::new();
        let request = FetchRequest::new("Song by Artist audio", "songs_temp/4 - Song");

        let args = as_strings(fetcher.arguments(&request));

        assert!(args.windows(2).any(|w| w == ["-f", "bestaudio/best"]));
        assert!(args.windows(2).any(|w| w == ["--audio-format", "mp3"]));
        assert!(args.windows(2).any(|w| w == ["--audio-quality", "192K"]));
        assert!(args
            .windows(2)
            .any(|w| w == ["--sponsorblock-remove", "sponsor,selfpromo,intro,outro,music_offtopic"]));
        assert!(args
            .windows(2)
            .any(|w| w == ["-o", "songs_temp/4 - Song.%(ext)s"]));
        assert_eq!(args.last().unwrap(), "ytsearch1:Song by Artist audio");
        assert!(!args.iter().any(|a| a == "--ffmpeg-location"));
    }

    #[test]
    fn test_arguments_with_ffmpeg_location_and_no_segments() {
        let fetcher = YtDlpFetcher::with_program("/opt/yt-dlp").with_ffmpeg_location("/opt/ffmpeg");
        let mut request = FetchRequest::new("q", "out/1 - A");
        request.remove_segments.clear();

        let args = as_strings(fetcher.arguments(&request));

        assert!(args.windows(2).any(|w| w == ["--ffmpeg-location", "/opt/ffmpeg"]));
        assert!(!args.iter().any(|a| a == "--sponsorblock-remove"));
    }

    #[tokio::test]
    async fn test_missing_program_is_not_available() {
        let dir = std::env::temp_dir().join(format!("ytdlp-missing-{}", std::process::id()));
        let fetcher = YtDlpFetcher::with_program("/nonexistent/yt-dlp-binary");
        let request = FetchRequest::new("q", dir.join("1 - A"));

        let err = fetcher.fetch(&request).await.unwrap_err();
        assert!(matches!(err, BridgeError::NotAvailable(_)));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_success_without_output_file_is_an_error() {
        let dir = std::env::temp_dir().join(format!("ytdlp-noout-{}", std::process::id()));
        let fetcher = YtDlpFetcher::with_program("true");
        let request = FetchRequest::new("q", dir.join("1 - A"));

        let err = fetcher.fetch(&request).await.unwrap_err();
        assert!(err.to_string().contains("produced no file"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_operation_failed() {
        let dir = std::env::temp_dir().join(format!("ytdlp-fail-{}", std::process::id()));
        let fetcher = YtDlpFetcher::with_program("false");
        let request = FetchRequest::new("q", dir.join("1 - A"));

        let err = fetcher.fetch(&request).await.unwrap_err();
        assert!(matches!(err, BridgeError::OperationFailed(_)));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
