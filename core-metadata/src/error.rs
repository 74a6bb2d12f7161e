use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Lyrics fetch failed: {0}")]
    LyricsFetchFailed(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::error::BridgeError),
}

pub type Result<T> = std::result::Result<T, MetadataError>;
