use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Playlist source error: {0}")]
    Source(String),

    #[error("Staging failed: {0}")]
    Staging(String),

    #[error("Post-processing failed for {file}: {reason}")]
    PostProcess { file: String, reason: String },

    #[error("Edit queue is closed")]
    QueueClosed,

    #[error("Background edit did not finish: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, SyncError>;
