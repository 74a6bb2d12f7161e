//! Status Message Surface
//!
//! The bot keeps one "now playing" message alive in a text channel and edits
//! it in place. Layout is the host's business; the core hands over a
//! [`StatusCard`] with plain strings.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Identifier of a posted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

/// Enabled state of the interactive controls under the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ControlState {
    pub skip_enabled: bool,
    pub stop_enabled: bool,
    pub autoplay_on: bool,
}

/// Rendered status content.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusCard {
    pub headline: String,
    pub description: String,
    pub thumbnail_url: Option<String>,
    pub footer: String,
    /// Bot presence text ("listening to ...").
    pub presence: Option<String>,
    pub controls: ControlState,
}

/// Post/edit access to the status channel.
#[async_trait]
pub trait StatusSurface: Send + Sync {
    /// Posts a new message and returns its id.
    async fn post(&self, card: &StatusCard) -> Result<MessageId>;

    /// Edits an existing message.
    ///
    /// # Errors
    ///
    /// [`BridgeError::NotFound`](crate::BridgeError::NotFound) when the
    /// message was deleted out from under the bot.
    async fn edit(&self, id: MessageId, card: &StatusCard) -> Result<()>;
}
