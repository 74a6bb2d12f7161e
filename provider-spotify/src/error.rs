//! Error types for the Spotify provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Spotify provider errors
#[derive(Error, Debug)]
pub enum SpotifyError {
    /// Client credentials were rejected
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// API request returned an error
    #[error("Spotify API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Playlist id or URL could not be understood
    #[error("Invalid playlist reference: {0}")]
    InvalidPlaylist(String),

    /// Playlist does not exist or is private
    #[error("Playlist not found: {playlist_id}")]
    PlaylistNotFound { playlist_id: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for Spotify operations
pub type Result<T> = std::result::Result<T, SpotifyError>;

impl From<SpotifyError> for BridgeError {
    fn from(error: SpotifyError) -> Self {
        match error {
            SpotifyError::PlaylistNotFound { playlist_id } => {
                BridgeError::NotFound(format!("playlist {}", playlist_id))
            }
            SpotifyError::InvalidPlaylist(raw) => {
                BridgeError::NotAvailable(format!("Invalid playlist reference: {}", raw))
            }
            SpotifyError::BridgeError(e) => e,
            other => BridgeError::OperationFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = SpotifyError::ApiError {
            status_code: 502,
            message: "Bad gateway".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Spotify API error (status 502): Bad gateway"
        );
    }

    #[test]
    fn test_error_conversion() {
        let missing: BridgeError = SpotifyError::PlaylistNotFound {
            playlist_id: "abc".to_string(),
        }
        .into();
        assert!(matches!(missing, BridgeError::NotFound(_)));

        let auth: BridgeError =
            SpotifyError::AuthenticationFailed("invalid_client".to_string()).into();
        assert!(matches!(auth, BridgeError::OperationFailed(_)));
    }
}
