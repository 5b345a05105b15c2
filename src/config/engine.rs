//! External analysis-engine process configuration.

use super::defaults::{
    default_engine_args, default_engine_command, default_engine_search_depth,
    default_engine_startup_timeout_secs,
};
use serde::{Deserialize, Serialize};

/// How to spawn and talk to the move-selection subprocess.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EngineConfig {
    /// Path or name of the engine executable.
    #[serde(default = "default_engine_command")]
    pub command: String,
    /// Extra arguments passed to the engine process.
    #[serde(default = "default_engine_args")]
    pub args: Vec<String>,
    /// Search depth passed on every `go depth <N> searchmoves ...` command.
    #[serde(default = "default_engine_search_depth")]
    pub search_depth: u32,
    /// How long to wait for the engine to respond to the initial `uci` handshake.
    #[serde(default = "default_engine_startup_timeout_secs")]
    pub startup_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: default_engine_command(),
            args: default_engine_args(),
            search_depth: default_engine_search_depth(),
            startup_timeout_secs: default_engine_startup_timeout_secs(),
        }
    }
}
