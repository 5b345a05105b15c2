//! Root configuration type.

use super::defaults::default_cors_origins;
use super::engine::EngineConfig;
use super::logging::LoggingConfig;
use super::protocol::PlayerNameConfig;
use super::room::RoomConfig;
use super::server::ServerConfig;
use super::websocket::WebSocketConfig;
use serde::{Deserialize, Serialize};

/// Root configuration for the room server process.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub room: RoomConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub player_name: PlayerNameConfig,
    #[serde(default)]
    pub websocket: WebSocketConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Comma-separated list of allowed CORS origins.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            room: RoomConfig::default(),
            engine: EngineConfig::default(),
            player_name: PlayerNameConfig::default(),
            websocket: WebSocketConfig::default(),
            logging: LoggingConfig::default(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl Config {
    /// Parsed, deduplicated list of CORS origins.
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect()
    }
}
