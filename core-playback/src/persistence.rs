//! Player state that survives restarts: the autoplay document and the id of
//! the status message.

use std::sync::Arc;

use bridge_traits::status::MessageId;
use bridge_traits::storage::DocumentStore;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{PlaybackError, Result};

pub const AUTOPLAY_STATE_KEY: &str = "autoplay_state.json";
pub const STATUS_MESSAGE_ID_KEY: &str = "status_message_id.txt";

/// Persisted autoplay document. Missing fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoplayState {
    pub last_played: Option<String>,
    pub autoplay_enabled: bool,
}

/// Typed access to the player's documents.
#[derive(Clone)]
pub struct StateStore {
    store: Arc<dyn DocumentStore>,
}

impl StateStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Loads the autoplay document. A missing or unreadable document yields
    /// the default state.
    pub async fn load_autoplay(&self) -> Result<AutoplayState> {
        let Some(raw) = self.store.load(AUTOPLAY_STATE_KEY).await? else {
            return Ok(AutoplayState::default());
        };
        match serde_json::from_str(&raw) {
            Ok(state) => Ok(state),
            Err(e) => {
                warn!(error = %e, "Ignoring malformed autoplay state");
                Ok(AutoplayState::default())
            }
        }
    }

    /// Rewrites the whole autoplay document.
    pub async fn save_autoplay(&self, state: &AutoplayState) -> Result<()> {
        let json = serde_json::to_string(state)
            .map_err(|e| PlaybackError::Persistence(e.to_string()))?;
        self.store.save(AUTOPLAY_STATE_KEY, &json).await?;
        Ok(())
    }

    pub async fn load_status_message_id(&self) -> Result<Option<MessageId>> {
        let Some(raw) = self.store.load(STATUS_MESSAGE_ID_KEY).await? else {
            return Ok(None);
        };
        match raw.trim().parse::<u64>() {
            Ok(id) => Ok(Some(MessageId(id))),
            Err(e) => {
                warn!(error = %e, "Ignoring malformed status message id");
                Ok(None)
            }
        }
    }

    pub async fn save_status_message_id(&self, id: MessageId) -> Result<()> {
        self.store
            .save(STATUS_MESSAGE_ID_KEY, &id.0.to_string())
            .await?;
        Ok(())
    }

    pub async fn clear_status_message_id(&self) -> Result<()> {
        self.store.remove(STATUS_MESSAGE_ID_KEY).await?;
        Ok(())
    }
}
