//! WebSocket transport configuration.

use super::defaults::{
    default_batch_interval_ms, default_batch_size, default_enable_batching,
    default_max_message_size,
};
use serde::{Deserialize, Serialize};

/// WebSocket send-side and framing configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebSocketConfig {
    /// Batch outbound messages instead of sending each one immediately.
    #[serde(default = "default_enable_batching")]
    pub enable_batching: bool,
    /// Maximum number of messages to batch before flushing.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Maximum time in milliseconds to wait before flushing a partial batch.
    #[serde(default = "default_batch_interval_ms")]
    pub batch_interval_ms: u64,
    /// Maximum accepted inbound frame size, in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            enable_batching: default_enable_batching(),
            batch_size: default_batch_size(),
            batch_interval_ms: default_batch_interval_ms(),
            max_message_size: default_max_message_size(),
        }
    }
}

impl WebSocketConfig {
    /// Validate websocket configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.batch_size == 0 {
            anyhow::bail!("websocket.batch_size must be at least 1");
        }
        if self.max_message_size == 0 {
            anyhow::bail!("websocket.max_message_size must be greater than 0");
        }
        Ok(())
    }
}
