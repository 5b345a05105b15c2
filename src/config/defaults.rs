//! Default value functions for configuration fields.
//!
//! Organized by section so each `#[serde(default = ...)]` attribute has an
//! obvious home.

use super::logging::LogFormat;

// =============================================================================
// Server
// =============================================================================

pub const fn default_listen_port() -> u16 {
    8080
}

// =============================================================================
// Room
// =============================================================================

pub const fn default_clock_seconds() -> u32 {
    600
}

pub const fn default_team_vote_duration_secs() -> u64 {
    30
}

pub const fn default_kick_vote_duration_secs() -> u64 {
    60
}

pub const fn default_reset_vote_duration_secs() -> u64 {
    60
}

pub const fn default_reconnect_grace_secs() -> u64 {
    20
}

pub const fn default_low_time_increment_threshold_secs() -> u32 {
    60
}

pub const fn default_low_time_increment_secs() -> u32 {
    10
}

// =============================================================================
// Engine
// =============================================================================

pub fn default_engine_command() -> String {
    "stockfish".to_string()
}

pub fn default_engine_args() -> Vec<String> {
    Vec::new()
}

pub const fn default_engine_search_depth() -> u32 {
    15
}

pub const fn default_engine_startup_timeout_secs() -> u64 {
    10
}

// =============================================================================
// Player name
// =============================================================================

pub const fn default_max_player_name_length() -> usize {
    30
}

// =============================================================================
// WebSocket
// =============================================================================

pub const fn default_enable_batching() -> bool {
    true
}

pub const fn default_batch_size() -> usize {
    10
}

pub const fn default_batch_interval_ms() -> u64 {
    16
}

pub const fn default_max_message_size() -> usize {
    65536
}

// =============================================================================
// Logging
// =============================================================================

pub fn default_log_dir() -> String {
    "logs".to_string()
}

pub fn default_log_filename() -> String {
    "server.log".to_string()
}

pub fn default_rotation() -> String {
    "daily".to_string()
}

pub const fn default_enable_file_logging() -> bool {
    true
}

pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

// =============================================================================
// CORS
// =============================================================================

pub fn default_cors_origins() -> String {
    "http://localhost:3000,http://localhost:5173".to_string()
}
