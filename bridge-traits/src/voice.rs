//! Voice Channel Abstraction
//!
//! The chat platform's voice client streams a local file and reports the end
//! of the stream from its own audio thread. That thread may not touch bot
//! state; it only fires the [`CompletionHandle`] it was given.

use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Result;

/// End-of-stream report delivered by the audio thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackFinished {
    pub path: PathBuf,
    /// Player error, when the stream ended abnormally.
    pub error: Option<String>,
}

/// Thread-safe callback handed to [`VoiceConnection::play`].
///
/// Cloning is cheap. Calling [`notify`](CompletionHandle::notify) from any
/// thread is allowed and must not block.
#[derive(Clone)]
pub struct CompletionHandle {
    callback: Arc<dyn Fn(PlaybackFinished) + Send + Sync>,
}

impl CompletionHandle {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(PlaybackFinished) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }

    pub fn notify(&self, finished: PlaybackFinished) {
        (self.callback)(finished)
    }
}

impl fmt::Debug for CompletionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionHandle").finish_non_exhaustive()
    }
}

/// Connection to one guild voice channel.
#[async_trait]
pub trait VoiceConnection: Send + Sync {
    /// Connects to (or moves into) the named channel.
    async fn join(&self, channel: &str) -> Result<()>;

    fn is_connected(&self) -> bool;

    fn is_playing(&self) -> bool;

    /// Starts streaming `path`. `on_finish` fires exactly once when the
    /// stream ends, whether naturally, by [`stop`](VoiceConnection::stop)
    /// or on error.
    async fn play(&self, path: &Path, on_finish: CompletionHandle) -> Result<()>;

    fn stop(&self) -> Result<()>;

    fn pause(&self) -> Result<()>;

    fn resume(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_completion_handle_forwards_report() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handle = CompletionHandle::new(move |finished| sink.lock().unwrap().push(finished));

        let clone = handle.clone();
        std::thread::spawn(move || {
            clone.notify(PlaybackFinished {
                path: PathBuf::from("songs/1 - A.mp3"),
                error: None,
            })
        })
        .join()
        .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].path, PathBuf::from("songs/1 - A.mp3"));
    }
}
