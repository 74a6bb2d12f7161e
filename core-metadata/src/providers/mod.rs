//! Lyrics providers
//!
//! - Genius - search API plus song page scraping, needs an access token
//! - LRCLib - open lyrics database, no key

pub mod genius;
pub mod lrclib;

pub use genius::GeniusProvider;
pub use lrclib::LrcLibProvider;
