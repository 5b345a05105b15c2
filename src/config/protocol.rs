//! Player-name validation configuration.

use super::defaults::default_max_player_name_length;
use serde::{Deserialize, Serialize};

/// Rules applied to the `set_name` event (spec §4.6).
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PlayerNameConfig {
    /// Names are trimmed then truncated to this many characters.
    #[serde(default = "default_max_player_name_length")]
    pub max_length: usize,
}

impl Default for PlayerNameConfig {
    fn default() -> Self {
        Self {
            max_length: default_max_player_name_length(),
        }
    }
}

impl PlayerNameConfig {
    /// Trim whitespace and cap length; returns `None` if nothing is left.
    pub fn normalize(&self, raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let capped: String = trimmed.chars().take(self.max_length).collect();
        if capped.is_empty() {
            None
        } else {
            Some(capped)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_names() {
        let cfg = PlayerNameConfig::default();
        assert_eq!(cfg.normalize("   "), None);
        assert_eq!(cfg.normalize(""), None);
    }

    #[test]
    fn trims_and_caps() {
        let cfg = PlayerNameConfig::default();
        assert_eq!(cfg.normalize("  Magnus  "), Some("Magnus".to_string()));
        let long = "x".repeat(50);
        assert_eq!(cfg.normalize(&long).unwrap().len(), 30);
    }
}
