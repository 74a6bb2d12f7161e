//! # Spotify Provider
//!
//! Reads the mirrored playlist and its contributors from the Spotify Web API.
//!
//! ## Overview
//!
//! This crate provides:
//! - Client-credentials authentication with a cached token
//! - Paginated playlist reads as [`PlaylistSource`](bridge_traits::PlaylistSource)
//! - Contributor lookup as [`UserDirectory`](bridge_traits::UserDirectory),
//!   cached for the process lifetime with a profile-URL fallback
//! - Playlist id parsing from raw ids, share URLs and `spotify:` URIs
//!
//! ## Usage
//!
//! ```ignore
//! use provider_spotify::SpotifyConnector;
//!
//! let connector = SpotifyConnector::new(http, client_id, client_secret, "https://open.spotify.com/playlist/...")?;
//! ```

pub mod connector;
pub mod error;
pub mod types;

pub use connector::{parse_playlist_id, SpotifyConnector};
pub use error::{Result, SpotifyError};
