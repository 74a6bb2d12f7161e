//! Document Storage Abstraction
//!
//! Small text documents the bot keeps across restarts: the autoplay state,
//! the status message id and cached lyrics. Keys are relative paths such as
//! `autoplay_state.json` or `lyrics_cache/Song - Artist.txt`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::Result;

/// Whole-document key/value storage.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::DocumentStore;
///
/// async fn remember(store: &dyn DocumentStore, id: u64) -> Result<()> {
///     store.save("status_message_id.txt", &id.to_string()).await
/// }
/// ```
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns `Ok(None)` when the document does not exist.
    async fn load(&self, key: &str) -> Result<Option<String>>;

    /// Replaces the whole document. Readers never observe a partial write.
    async fn save(&self, key: &str, contents: &str) -> Result<()>;

    /// Deleting a missing document is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Process-local [`DocumentStore`], handy for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<HashMap<String, String>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.documents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    async fn save(&self, key: &str, contents: &str) -> Result<()> {
        self.lock().insert(key.to_string(), contents.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[core_async::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryDocumentStore::new();
        assert!(store.load("autoplay_state.json").await.unwrap().is_none());

        store.save("autoplay_state.json", "{}").await.unwrap();
        assert_eq!(
            store.load("autoplay_state.json").await.unwrap().as_deref(),
            Some("{}")
        );

        store.remove("autoplay_state.json").await.unwrap();
        store.remove("autoplay_state.json").await.unwrap();
        assert!(store.is_empty());
    }
}
