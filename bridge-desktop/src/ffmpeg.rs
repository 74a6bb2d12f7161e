//! Audio filter runner backed by the `ffmpeg` executable.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    media::{AudioFilterRunner, FilterInvocation},
};
use core_async::process::{stderr_tail, Command, Stdio};
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::{debug, instrument};

/// Runs `ffmpeg -af <filter>` as a child process.
#[derive(Debug, Clone)]
pub struct FfmpegFilterRunner {
    program: PathBuf,
}

impl FfmpegFilterRunner {
    /// Uses `ffmpeg` from `PATH`.
    pub fn new() -> Self {
        Self::with_program("ffmpeg")
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn arguments(invocation: &FilterInvocation) -> Vec<OsString> {
        vec![
            "-y".into(),
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-i".into(),
            invocation.input.as_os_str().to_owned(),
            "-af".into(),
            invocation.filter.as_str().into(),
            "-ar".into(),
            invocation.sample_rate.to_string().into(),
            invocation.output.as_os_str().to_owned(),
        ]
    }
}

impl Default for FfmpegFilterRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioFilterRunner for FfmpegFilterRunner {
    #[instrument(skip(self, invocation), fields(input = ?invocation.input.file_name()))]
    async fn run(&self, invocation: &FilterInvocation) -> Result<()> {
        debug!(filter = %invocation.filter, "Running ffmpeg");

        let output = Command::new(&self.program)
            .args(Self::arguments(invocation))
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

        if output.status.success() {
            Ok(())
        } else {
            Err(BridgeError::OperationFailed(format!(
                "ffmpeg failed ({}): {}",
                output.status,
                stderr_tail(&output, 5)
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation() -> FilterInvocation {
        FilterInvocation {
            input: PathBuf::from("songs_temp/2 - B.mp3"),
            output: PathBuf::from("songs_temp/2 - B.mp3.processing.mp3"),
            filter: "loudnorm=I=-14.0:TP=-1.5:LRA=11.0".to_string(),
            sample_rate: 44100,
        }
    }

    #[test]
    fn test_arguments_layout() {
        let args: Vec<String> = FfmpegFilterRunner::arguments(&invocation())
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(
            args,
            vec![
                "-y",
                "-hide_banner",
                "-loglevel",
                "error",
                "-i",
                "songs_temp/2 - B.mp3",
                "-af",
                "loudnorm=I=-14.0:TP=-1.5:LRA=11.0",
                "-ar",
                "44100",
                "songs_temp/2 - B.mp3.processing.mp3",
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_status_is_reported() {
        assert!(FfmpegFilterRunner::with_program("true")
            .run(&invocation())
            .await
            .is_ok());

        let err = FfmpegFilterRunner::with_program("false")
            .run(&invocation())
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::OperationFailed(_)));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let err = FfmpegFilterRunner::with_program("/nonexistent/ffmpeg-binary")
            .run(&invocation())
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::NotAvailable(_)));
    }
}
