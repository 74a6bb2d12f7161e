//! # Bot Service
//!
//! Wires the playlist sync, the player, the status message and lyrics into
//! one running bot.
//!
//! ## Overview
//!
//! The chat adapter builds a [`BotBridges`] (voice client and status channel
//! of its own, everything else from [`desktop_bridges`] when the
//! `desktop-shims` feature is on) and calls [`Bot::start`]. Slash commands
//! and buttons map onto [`BotService`] methods.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_runtime::config::BotConfig;
//! use core_service::{desktop_bridges, Bot};
//!
//! let config = BotConfig::from_env()?;
//! let bridges = desktop_bridges(&config, voice, status_channel)?;
//! let bot = Bot::start(config, bridges).await?;
//!
//! let service = bot.service();
//! service.play("3 - Song.mp3").await?;
//! let outcome = service.sync().outcome().await?;
//!
//! bot.shutdown().await;
//! ```

pub mod bot;
pub mod bridges;
pub mod error;
pub mod service;
mod tasks;

pub use bot::Bot;
#[cfg(feature = "desktop-shims")]
pub use bridges::desktop_bridges;
pub use bridges::BotBridges;
pub use error::{Result, ServiceError};
pub use service::{BotService, LyricsReply, SongChoice, SyncHandle, MAX_AUTOCOMPLETE_CHOICES};
