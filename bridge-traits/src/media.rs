//! Audio Acquisition Abstractions
//!
//! External programs the sync pipeline shells out to: a downloader that
//! turns a search query into an mp3 file ([`AudioFetcher`]) and a transcoder
//! that applies an audio filter graph ([`AudioFilterRunner`]).

use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Sponsor-segment categories cut out of downloaded audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentLabel {
    Sponsor,
    SelfPromo,
    Intro,
    Outro,
    MusicOffTopic,
}

impl SegmentLabel {
    /// Every category the bot strips by default.
    pub const ALL: [SegmentLabel; 5] = [
        SegmentLabel::Sponsor,
        SegmentLabel::SelfPromo,
        SegmentLabel::Intro,
        SegmentLabel::Outro,
        SegmentLabel::MusicOffTopic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentLabel::Sponsor => "sponsor",
            SegmentLabel::SelfPromo => "selfpromo",
            SegmentLabel::Intro => "intro",
            SegmentLabel::Outro => "outro",
            SegmentLabel::MusicOffTopic => "music_offtopic",
        }
    }
}

impl fmt::Display for SegmentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One search-and-download job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Free-text search, e.g. `"Song by Artist audio"`.
    pub query: String,
    /// Output path without extension; the fetcher appends `.mp3`.
    pub destination: PathBuf,
    pub remove_segments: Vec<SegmentLabel>,
}

impl FetchRequest {
    pub fn new(query: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            query: query.into(),
            destination: destination.into(),
            remove_segments: SegmentLabel::ALL.to_vec(),
        }
    }

    /// Comma-separated segment list, as downloader CLIs expect it.
    pub fn segment_list(&self) -> String {
        self.remove_segments
            .iter()
            .map(SegmentLabel::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Final file location.
    pub fn output_path(&self) -> PathBuf {
        with_mp3_extension(&self.destination)
    }
}

fn with_mp3_extension(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(".mp3");
    PathBuf::from(name)
}

/// Search-and-download capability (yt-dlp on desktop).
#[async_trait]
pub trait AudioFetcher: Send + Sync {
    /// Downloads the best audio match and returns the written mp3 path.
    async fn fetch(&self, request: &FetchRequest) -> Result<PathBuf>;
}

/// One transcoder run: read `input`, apply `filter`, write `output`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterInvocation {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Audio filter graph, e.g. `loudnorm=I=-14.0:TP=-1.5:LRA=11.0`.
    pub filter: String,
    pub sample_rate: u32,
}

/// Audio filter capability (ffmpeg on desktop).
#[async_trait]
pub trait AudioFilterRunner: Send + Sync {
    /// Fails when the transcoder exits unsuccessfully.
    async fn run(&self, invocation: &FilterInvocation) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_request_defaults() {
        let request = FetchRequest::new("Song by Artist audio", "songs_temp/3 - Song");

        assert_eq!(
            request.segment_list(),
            "sponsor,selfpromo,intro,outro,music_offtopic"
        );
        assert_eq!(
            request.output_path(),
            PathBuf::from("songs_temp/3 - Song.mp3")
        );
    }

    #[test]
    fn test_output_path_keeps_dots_in_title() {
        let request = FetchRequest::new("q", "lib/7 - Mr. Blue Sky");
        assert_eq!(request.output_path(), PathBuf::from("lib/7 - Mr. Blue Sky.mp3"));
    }
}
