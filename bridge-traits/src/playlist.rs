//! Remote Playlist Abstractions
//!
//! The mirrored playlist is read page by page through [`PlaylistSource`];
//! the person who added each track is resolved through [`UserDirectory`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One playable item of the remote playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistTrack {
    pub title: String,
    /// Credited artists, primary first.
    pub artists: Vec<String>,
    pub duration_ms: u64,
    pub album_art_url: Option<String>,
    /// Remote user id of whoever added the track.
    pub added_by: Option<String>,
    /// 1-based position in the playlist, counting unavailable items too.
    pub position: u32,
}

impl PlaylistTrack {
    /// First credited artist, or `"Unknown"` when none is listed.
    pub fn primary_artist(&self) -> &str {
        self.artists
            .first()
            .map(String::as_str)
            .unwrap_or("Unknown")
    }
}

/// Public identity of a playlist contributor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub display_name: String,
    pub profile_url: String,
}

/// Paginated read access to the mirrored playlist.
///
/// # Example
///
/// ```ignore
/// let mut cursor = None;
/// loop {
///     let (page, next) = source.list_tracks(cursor).await?;
///     tracks.extend(page);
///     cursor = next;
///     if cursor.is_none() {
///         break;
///     }
/// }
/// ```
#[async_trait]
pub trait PlaylistSource: Send + Sync {
    /// Fetches one page.
    ///
    /// `cursor` is `None` for the first page; the returned cursor is `None`
    /// after the last page.
    async fn list_tracks(
        &self,
        cursor: Option<String>,
    ) -> Result<(Vec<PlaylistTrack>, Option<String>)>;
}

/// Resolves remote user ids to displayable profiles.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn resolve(&self, user_id: &str) -> Result<UserProfile>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(artists: &[&str]) -> PlaylistTrack {
        PlaylistTrack {
            title: "Song".to_string(),
            artists: artists.iter().map(|a| a.to_string()).collect(),
            duration_ms: 1000,
            album_art_url: None,
            added_by: None,
            position: 1,
        }
    }

    #[test]
    fn test_primary_artist() {
        assert_eq!(track(&["A", "B"]).primary_artist(), "A");
        assert_eq!(track(&[]).primary_artist(), "Unknown");
    }
}
