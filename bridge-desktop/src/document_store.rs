//! File-backed document store rooted at the bot's state directory.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::DocumentStore,
};
use core_async::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Stores each document as a UTF-8 file below `root`.
///
/// Writes go to a sibling `.tmp` file first and are renamed into place.
#[derive(Debug, Clone)]
pub struct FileDocumentStore {
    root: PathBuf,
}

impl FileDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(BridgeError::OperationFailed(format!(
                "Invalid document key '{}'",
                key
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        let path = self.resolve(key)?;
        match fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BridgeError::Io(e)),
        }
    }

    async fn save(&self, key: &str, contents: &str) -> Result<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, contents.as_bytes()).await?;
        fs::rename(&tmp, &path).await?;

        debug!(key, bytes = contents.len(), "Saved document");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BridgeError::Io(e)),
        }
    }
}
