//! Workspace facade crate.
//!
//! Exposes the individual workspace crates behind feature flags so a host
//! binary (the Discord adapter) can depend on `playlist-mirror` alone and pick
//! the surface it needs.

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop as desktop;
#[cfg(feature = "desktop-shims")]
pub use core_service as service;
#[cfg(feature = "desktop-shims")]
pub use provider_spotify as spotify;

#[cfg(feature = "lyrics")]
pub use core_metadata as metadata;
#[cfg(feature = "playback")]
pub use core_playback as playback;
#[cfg(feature = "sync-core")]
pub use core_sync as sync;
