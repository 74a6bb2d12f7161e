//! # Desktop Bridge Implementations
//!
//! Default implementations of the bridge traits for a bot running on a
//! regular server or desktop host.
//!
//! ## Overview
//!
//! - [`ReqwestHttpClient`]: `HttpClient` on `reqwest` with retry and backoff
//! - [`YtDlpFetcher`]: `AudioFetcher` shelling out to `yt-dlp`
//! - [`FfmpegFilterRunner`]: `AudioFilterRunner` shelling out to `ffmpeg`
//! - [`FileDocumentStore`]: `DocumentStore` on plain files with atomic replace
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{FfmpegFilterRunner, FileDocumentStore, ReqwestHttpClient, YtDlpFetcher};
//!
//! let http = ReqwestHttpClient::new()?;
//! let fetcher = YtDlpFetcher::new();
//! let filters = FfmpegFilterRunner::with_program("/usr/local/bin/ffmpeg");
//! let store = FileDocumentStore::new(".");
//! ```

mod document_store;
mod ffmpeg;
mod http;
mod ytdlp;

pub use document_store::FileDocumentStore;
pub use ffmpeg::FfmpegFilterRunner;
pub use http::ReqwestHttpClient;
pub use ytdlp::YtDlpFetcher;
