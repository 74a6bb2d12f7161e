//! # Playback Module
//!
//! Voice playback, autoplay and the status message.
//!
//! ## Overview
//!
//! - **Player** (`controller`): actor owning the playback state; chat commands
//!   and stream completions are messages to it
//! - **Autoplay** (`autoplay`, `history`): random next-song selection that
//!   avoids the last 20 songs
//! - **Persistence** (`persistence`): `autoplay_state.json` and
//!   `status_message_id.txt`
//! - **Status** (`status`): renders and posts/edits the status card, at most
//!   once per second
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_playback::{PlayerController, PlayerDeps, StatusPublisher};
//!
//! let (mut controller, player) = PlayerController::new(deps);
//! controller.restore().await?;
//! core_async::spawn(controller.run(shutdown.clone()));
//!
//! let status = StatusPublisher::new(surface, player.subscribe(), last_sync, store, clock);
//! ```

pub mod autoplay;
pub mod controller;
pub mod error;
pub mod history;
pub mod persistence;
pub mod state;
pub mod status;

pub use autoplay::{select_next, MAX_PICK_ATTEMPTS};
pub use controller::{PlayerController, PlayerDeps, PlayerHandle, UNKNOWN_ARTIST};
pub use error::{PlaybackError, Result};
pub use history::{RecentlyPlayed, DEFAULT_HISTORY_CAPACITY};
pub use persistence::{AutoplayState, StateStore, AUTOPLAY_STATE_KEY, STATUS_MESSAGE_ID_KEY};
pub use state::{NowPlaying, PlaybackSnapshot, PlayerStatus};
pub use status::{format_time, render_card, seek_bar, StatusPublisher};
