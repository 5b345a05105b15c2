//! Configuration validation functions.

use super::Config;

/// Validate the loaded configuration, returning an error describing the
/// first problem found.
pub fn validate_config(config: &Config) -> anyhow::Result<()> {
    if config.room.default_clock_seconds == 0 {
        anyhow::bail!("room.default_clock_seconds must be greater than 0");
    }
    if config.room.team_vote_duration_secs == 0 {
        anyhow::bail!("room.team_vote_duration_secs must be greater than 0");
    }
    if config.room.kick_vote_duration_secs == 0 {
        anyhow::bail!("room.kick_vote_duration_secs must be greater than 0");
    }
    if config.room.reset_vote_duration_secs == 0 {
        anyhow::bail!("room.reset_vote_duration_secs must be greater than 0");
    }
    if config.room.reconnect_grace_secs == 0 {
        anyhow::bail!("room.reconnect_grace_secs must be greater than 0");
    }

    if config.engine.command.trim().is_empty() {
        anyhow::bail!("engine.command must not be empty");
    }
    if config.engine.search_depth == 0 {
        anyhow::bail!("engine.search_depth must be at least 1");
    }
    if config.engine.startup_timeout_secs == 0 {
        anyhow::bail!("engine.startup_timeout_secs must be greater than 0");
    }

    if config.player_name.max_length == 0 {
        anyhow::bail!("player_name.max_length must be at least 1");
    }

    config.websocket.validate()?;

    if config.cors_origin_list().is_empty() {
        anyhow::bail!("cors_origins must contain at least one origin");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn rejects_zero_clock() {
        let mut config = Config::default();
        config.room.default_clock_seconds = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_empty_engine_command() {
        let mut config = Config::default();
        config.engine.command = "   ".to_string();
        assert!(validate_config(&config).is_err());
    }
}
