//! Room timing configuration: clocks, vote deadlines, reconnect grace.

use super::defaults::{
    default_clock_seconds, default_kick_vote_duration_secs, default_low_time_increment_secs,
    default_low_time_increment_threshold_secs, default_reconnect_grace_secs,
    default_reset_vote_duration_secs, default_team_vote_duration_secs,
};
use serde::{Deserialize, Serialize};

/// Timing knobs for a single room instance.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RoomConfig {
    /// Starting clock for each side, in seconds.
    #[serde(default = "default_clock_seconds")]
    pub default_clock_seconds: u32,
    /// Deadline for a team-scoped vote (resign / offer-draw / accept-draw).
    #[serde(default = "default_team_vote_duration_secs")]
    pub team_vote_duration_secs: u64,
    /// Deadline for a process-wide kick vote.
    #[serde(default = "default_kick_vote_duration_secs")]
    pub kick_vote_duration_secs: u64,
    /// Deadline for a process-wide reset vote.
    #[serde(default = "default_reset_vote_duration_secs")]
    pub reset_vote_duration_secs: u64,
    /// Grace period given to a disconnected player before their session is dropped.
    #[serde(default = "default_reconnect_grace_secs")]
    pub reconnect_grace_secs: u64,
    /// Remaining-time threshold (seconds) at or below which a finalized move earns an increment.
    #[serde(default = "default_low_time_increment_threshold_secs")]
    pub low_time_increment_threshold_secs: u32,
    /// Increment credited to a side whose remaining time is at or below the threshold.
    #[serde(default = "default_low_time_increment_secs")]
    pub low_time_increment_secs: u32,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            default_clock_seconds: default_clock_seconds(),
            team_vote_duration_secs: default_team_vote_duration_secs(),
            kick_vote_duration_secs: default_kick_vote_duration_secs(),
            reset_vote_duration_secs: default_reset_vote_duration_secs(),
            reconnect_grace_secs: default_reconnect_grace_secs(),
            low_time_increment_threshold_secs: default_low_time_increment_threshold_secs(),
            low_time_increment_secs: default_low_time_increment_secs(),
        }
    }
}
