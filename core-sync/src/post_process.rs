//! # Audio Post-Processor
//!
//! Trims leading and trailing near-silence and normalizes loudness of a
//! downloaded file through an external transcoder.
//!
//! The combined trim + normalize chain runs first. If the transcoder fails on
//! it, a normalization-only pass is tried. The original file is replaced only
//! after a pass succeeds, so a failing filter never loses audio.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bridge_traits::media::{AudioFilterRunner, FilterInvocation};
use core_async::time::Duration;
use core_runtime::logging::file_label;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SyncError};

const COMBINED_SUFFIX: &str = ".processing.mp3";
const FALLBACK_SUFFIX: &str = ".processing2.mp3";

/// EBU R128 loudness targets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessTarget {
    /// Integrated loudness in LUFS.
    pub integrated: f64,
    /// True-peak ceiling in dBTP.
    pub true_peak: f64,
    /// Loudness range in LU.
    pub range: f64,
}

impl Default for LoudnessTarget {
    fn default() -> Self {
        Self {
            integrated: -14.0,
            true_peak: -1.5,
            range: 11.0,
        }
    }
}

impl LoudnessTarget {
    pub fn filter(&self) -> String {
        format!(
            "loudnorm=I={:.1}:TP={:.1}:LRA={:.1}",
            self.integrated, self.true_peak, self.range
        )
    }
}

/// Silence detection for trimming.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SilenceTrim {
    /// Level below which audio counts as silence, in dB.
    pub threshold_db: i32,
    /// Minimum silence length that gets removed.
    pub min_silence: Duration,
}

impl Default for SilenceTrim {
    fn default() -> Self {
        Self {
            threshold_db: -50,
            min_silence: Duration::from_millis(200),
        }
    }
}

impl SilenceTrim {
    /// Removes silence at the start of the stream only; trailing silence is
    /// handled by reversing around a second pass.
    pub fn filter(&self) -> String {
        format!(
            "silenceremove=start_periods=1:start_threshold={}dB:start_silence={}",
            self.threshold_db,
            self.min_silence.as_secs_f64()
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostProcessConfig {
    pub loudness: LoudnessTarget,
    pub silence: SilenceTrim,
    pub sample_rate: u32,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            loudness: LoudnessTarget::default(),
            silence: SilenceTrim::default(),
            sample_rate: 44_100,
        }
    }
}

impl PostProcessConfig {
    /// Trim head, trim tail, then normalize.
    pub fn combined_filter(&self) -> String {
        let trim = self.silence.filter();
        format!(
            "{trim},areverse,{trim},areverse,{}",
            self.loudness.filter()
        )
    }

    pub fn normalize_filter(&self) -> String {
        self.loudness.filter()
    }
}

/// Which pass produced the final file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostProcessOutcome {
    TrimmedAndNormalized,
    NormalizedOnly,
}

impl fmt::Display for PostProcessOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostProcessOutcome::TrimmedAndNormalized => f.write_str("trimmed and normalized"),
            PostProcessOutcome::NormalizedOnly => f.write_str("normalized only"),
        }
    }
}

pub struct PostProcessor {
    runner: Arc<dyn AudioFilterRunner>,
    config: PostProcessConfig,
}

impl PostProcessor {
    pub fn new(runner: Arc<dyn AudioFilterRunner>) -> Self {
        Self::with_config(runner, PostProcessConfig::default())
    }

    pub fn with_config(runner: Arc<dyn AudioFilterRunner>, config: PostProcessConfig) -> Self {
        Self { runner, config }
    }

    pub fn config(&self) -> &PostProcessConfig {
        &self.config
    }

    /// Processes `path` in place.
    ///
    /// # Errors
    ///
    /// [`SyncError::PostProcess`] when both passes fail; the original file is
    /// left untouched and no temp file remains.
    #[instrument(skip(self), fields(file = %file_label(path)))]
    pub async fn process(&self, path: &Path) -> Result<PostProcessOutcome> {
        let combined = self
            .apply(path, COMBINED_SUFFIX, self.config.combined_filter())
            .await;
        let first_error = match combined {
            Ok(()) => {
                info!("Trimmed and normalized audio");
                return Ok(PostProcessOutcome::TrimmedAndNormalized);
            }
            Err(e) => e,
        };
        warn!(error = %first_error, "Combined filter failed, retrying with normalization only");

        match self
            .apply(path, FALLBACK_SUFFIX, self.config.normalize_filter())
            .await
        {
            Ok(()) => {
                info!("Normalized audio without trimming");
                Ok(PostProcessOutcome::NormalizedOnly)
            }
            Err(e) => Err(SyncError::PostProcess {
                file: file_label(path),
                reason: format!("{}; fallback: {}", first_error, e),
            }),
        }
    }

    /// Runs one pass into `<path><suffix>` and moves the result over `path`.
    /// The temp file is removed on any failure.
    async fn apply(&self, path: &Path, suffix: &str, filter: String) -> Result<()> {
        let output = with_suffix(path, suffix);
        let invocation = FilterInvocation {
            input: path.to_path_buf(),
            output: output.clone(),
            filter,
            sample_rate: self.config.sample_rate,
        };

        let result = match self.runner.run(&invocation).await {
            Ok(()) => core_async::fs::rename(&output, path)
                .await
                .map_err(SyncError::from),
            Err(e) => Err(SyncError::from(e)),
        };

        if result.is_err() {
            remove_quietly(&output).await;
        }
        result
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = core_async::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            debug!(file = %file_label(path), error = %e, "Could not remove temp file");
        }
    }
}
