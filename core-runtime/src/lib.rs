//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the playlist mirror bot:
//! - Logging and tracing infrastructure
//! - Configuration loading and validation
//! - Event bus system
//!
//! ## Overview
//!
//! Every other crate in the workspace logs through the subscriber installed
//! by [`logging::init_logging`], reads its settings from [`config::BotConfig`]
//! and reports progress on the [`events::EventBus`].

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
