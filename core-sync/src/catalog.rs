//! Track catalog: the playlist as seen by the last sync.
//!
//! Written only by the sync coordinator, which replaces it wholesale; read by
//! the player to turn a library filename back into track metadata.

use std::sync::Arc;

use bridge_traits::playlist::PlaylistTrack;
use core_async::sync::RwLock;

#[derive(Default)]
pub struct TrackCatalog {
    tracks: RwLock<Arc<Vec<PlaylistTrack>>>,
}

impl TrackCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole catalog. Tracks are kept ordered by position.
    pub async fn replace(&self, mut tracks: Vec<PlaylistTrack>) {
        tracks.sort_by_key(|t| t.position);
        *self.tracks.write().await = Arc::new(tracks);
    }

    pub async fn snapshot(&self) -> Arc<Vec<PlaylistTrack>> {
        Arc::clone(&*self.tracks.read().await)
    }

    pub async fn by_position(&self, position: u32) -> Option<PlaylistTrack> {
        let tracks = self.tracks.read().await;
        tracks
            .binary_search_by_key(&position, |t| t.position)
            .ok()
            .map(|index| tracks[index].clone())
    }

    pub async fn len(&self) -> usize {
        self.tracks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tracks.read().await.is_empty()
    }
}
