//! # Host Bridge Traits
//!
//! Capabilities the bot core needs from the outside world, expressed as
//! `Send + Sync` traits so the core can be driven by real adapters in
//! production and by fakes in tests.
//!
//! ## Traits
//!
//! ### Remote services
//! - [`HttpClient`](http::HttpClient) - Async HTTP with retry
//! - [`PlaylistSource`](playlist::PlaylistSource) - Paginated playlist reads
//! - [`UserDirectory`](playlist::UserDirectory) - Contributor profile lookup
//!
//! ### External tools
//! - [`AudioFetcher`](media::AudioFetcher) - Search and download audio as mp3
//! - [`AudioFilterRunner`](media::AudioFilterRunner) - Apply an audio filter graph
//!
//! ### Chat platform
//! - [`VoiceConnection`](voice::VoiceConnection) - Stream a file into a voice channel
//! - [`StatusSurface`](status::StatusSurface) - Post and edit the status message
//!
//! ### Utilities
//! - [`DocumentStore`](storage::DocumentStore) - Persist small text documents
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//!
//! ## Implementations
//!
//! | Capability | Crate |
//! |------------|-------|
//! | HTTP, yt-dlp, ffmpeg, file store | `bridge-desktop` |
//! | Playlist, users | `provider-spotify` |
//! | Voice, status | host chat adapter |
//!
//! ## Error Handling
//!
//! Every trait returns [`BridgeError`](error::BridgeError). Adapters convert
//! their native errors and keep enough context (file name, HTTP status) for
//! the log line.

pub mod error;
pub mod http;
pub mod media;
pub mod playlist;
pub mod status;
pub mod storage;
pub mod time;
pub mod voice;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use media::{AudioFetcher, AudioFilterRunner, FetchRequest, FilterInvocation, SegmentLabel};
pub use playlist::{PlaylistSource, PlaylistTrack, UserDirectory, UserProfile};
pub use status::{ControlState, MessageId, StatusCard, StatusSurface};
pub use storage::{DocumentStore, MemoryDocumentStore};
pub use time::{Clock, ManualClock, SystemClock};
pub use voice::{CompletionHandle, PlaybackFinished, VoiceConnection};
