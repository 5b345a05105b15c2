//! Configuration for the room server.
//!
//! Supports layered loading (defaults, config file, environment overrides) and
//! up-front validation so a misconfigured process fails fast instead of
//! misbehaving silently.
//!
//! # Module Structure
//!
//! - [`types`]: root `Config` struct
//! - [`server`]: listen-socket configuration
//! - [`room`]: clock/vote-duration/reconnect-grace timing
//! - [`engine`]: analysis-engine subprocess configuration
//! - [`protocol`]: player-name validation
//! - [`websocket`]: transport batching/framing
//! - [`logging`]: logging configuration
//! - [`loader`]: configuration loading functions
//! - [`validation`]: configuration validation functions
//! - [`defaults`]: default value functions

pub mod defaults;
pub mod engine;
pub mod loader;
pub mod logging;
pub mod protocol;
pub mod room;
pub mod server;
pub mod types;
pub mod validation;
pub mod websocket;

pub use engine::EngineConfig;
pub use loader::load;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use protocol::PlayerNameConfig;
pub use room::RoomConfig;
pub use server::ServerConfig;
pub use types::Config;
pub use validation::validate_config;
pub use websocket::WebSocketConfig;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();

        assert_eq!(config.server.listen_port, 8080);
        assert_eq!(config.room.default_clock_seconds, 600);
        assert_eq!(config.room.team_vote_duration_secs, 30);
        assert_eq!(config.room.kick_vote_duration_secs, 60);
        assert_eq!(config.room.reset_vote_duration_secs, 60);
        assert_eq!(config.room.reconnect_grace_secs, 20);
        assert_eq!(config.room.low_time_increment_threshold_secs, 60);
        assert_eq!(config.room.low_time_increment_secs, 10);
        assert_eq!(config.engine.search_depth, 15);
        assert_eq!(config.player_name.max_length, 30);

        assert_eq!(config.logging.dir, "logs");
        assert_eq!(config.logging.filename, "server.log");
        assert_eq!(config.logging.rotation, "daily");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let deserialized: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(config.server.listen_port, deserialized.server.listen_port);
        assert_eq!(
            config.room.default_clock_seconds,
            deserialized.room.default_clock_seconds
        );
        assert_eq!(config.engine.command, deserialized.engine.command);
    }

    #[test]
    fn test_log_level_display() {
        assert_eq!(LogLevel::Trace.to_string(), "trace");
        assert_eq!(LogLevel::Debug.to_string(), "debug");
        assert_eq!(LogLevel::Info.to_string(), "info");
        assert_eq!(LogLevel::Warn.to_string(), "warn");
        assert_eq!(LogLevel::Error.to_string(), "error");
    }

    #[test]
    fn test_log_level_as_str() {
        assert_eq!(LogLevel::Trace.as_str(), "trace");
        assert_eq!(LogLevel::Debug.as_str(), "debug");
        assert_eq!(LogLevel::Info.as_str(), "info");
        assert_eq!(LogLevel::Warn.as_str(), "warn");
        assert_eq!(LogLevel::Error.as_str(), "error");
    }
}
