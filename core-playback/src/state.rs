//! Playback state published by the player.

use std::path::PathBuf;
use std::time::Duration;

use bridge_traits::playlist::UserProfile;
use chrono::{DateTime, Utc};

/// Coarse player state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerStatus {
    #[default]
    Idle,
    Playing,
    Paused,
}

/// The song currently streaming (or paused).
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlaying {
    /// Full path inside the live library.
    pub path: PathBuf,
    /// Library filename, e.g. `"3 - Song.mp3"`.
    pub filename: String,
    pub title: String,
    pub artist: String,
    pub art_url: Option<String>,
    pub added_by: Option<UserProfile>,
    pub duration: Option<Duration>,
    /// Start of playback, shifted forward by the time spent paused.
    pub started_at: DateTime<Utc>,
    pub paused_at: Option<DateTime<Utc>>,
}

impl NowPlaying {
    /// Position in the song at `now`, clamped to `[0, duration]`.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        let reference = self.paused_at.unwrap_or(now);
        let elapsed = (reference - self.started_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        match self.duration {
            Some(duration) => elapsed.min(duration),
            None => elapsed,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    pub(crate) fn pause(&mut self, now: DateTime<Utc>) {
        if self.paused_at.is_none() {
            self.paused_at = Some(now);
        }
    }

    pub(crate) fn resume(&mut self, now: DateTime<Utc>) {
        if let Some(paused_at) = self.paused_at.take() {
            self.started_at += now - paused_at;
        }
    }
}

/// Read-only view of the player, published through a `watch` channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackSnapshot {
    pub status: PlayerStatus,
    pub now_playing: Option<NowPlaying>,
    pub autoplay: bool,
}

impl PlaybackSnapshot {
    /// A song is loaded, playing or paused.
    pub fn is_active(&self) -> bool {
        self.now_playing.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn song(duration_secs: Option<u64>) -> NowPlaying {
        NowPlaying {
            path: PathBuf::from("songs/1 - Song.mp3"),
            filename: "1 - Song.mp3".to_string(),
            title: "Song".to_string(),
            artist: "Artist".to_string(),
            art_url: None,
            added_by: None,
            duration: duration_secs.map(Duration::from_secs),
            started_at: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
            paused_at: None,
        }
    }

    #[test]
    fn test_elapsed_is_clamped() {
        let np = song(Some(100));
        let start = np.started_at;

        assert_eq!(np.elapsed(start + chrono::Duration::seconds(30)), Duration::from_secs(30));
        assert_eq!(np.elapsed(start + chrono::Duration::seconds(500)), Duration::from_secs(100));
        assert_eq!(np.elapsed(start - chrono::Duration::seconds(5)), Duration::ZERO);
        assert_eq!(
            song(None).elapsed(start + chrono::Duration::seconds(500)),
            Duration::from_secs(500)
        );
    }

    #[test]
    fn test_pause_freezes_elapsed() {
        let mut np = song(Some(300));
        let start = np.started_at;

        np.pause(start + chrono::Duration::seconds(10));
        assert!(np.is_paused());
        assert_eq!(np.elapsed(start + chrono::Duration::seconds(60)), Duration::from_secs(10));

        np.resume(start + chrono::Duration::seconds(60));
        assert!(!np.is_paused());
        assert_eq!(np.elapsed(start + chrono::Duration::seconds(65)), Duration::from_secs(15));
    }

    #[test]
    fn test_snapshot_activity() {
        let mut snapshot = PlaybackSnapshot::default();
        assert!(!snapshot.is_active());
        snapshot.now_playing = Some(song(None));
        assert!(snapshot.is_active());
    }
}
