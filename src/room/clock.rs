//! Pure clock arithmetic (spec §4.2, §4.1 step 5, §8 boundary cases).
//!
//! The actual per-second tick is driven by a [`crate::room::timer`] interval
//! owned by the room actor; this module only decides what the numbers do.

use crate::protocol::PlayerSide;

/// Decrement the side-to-move's clock by one second. Returns the new value;
/// callers compare against zero themselves so a timeout can be raised for
/// the tick that crosses it (spec §8 scenario 3).
pub fn decrement(remaining: i32) -> i32 {
    remaining - 1
}

/// How much time (seconds) to credit the side that just moved, given their
/// remaining time *after* the move was applied. Above the threshold: 0,
/// per the resolved Open Question (spec §9 item 1, SPEC_FULL §12.1).
pub fn low_time_increment(remaining_after_move: i32, threshold_secs: u32, increment_secs: u32) -> i32 {
    if remaining_after_move <= threshold_secs as i32 {
        increment_secs as i32
    } else {
        0
    }
}

/// Snapshot of both clocks as broadcast in `clock_update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSnapshot {
    pub white_time: i32,
    pub black_time: i32,
}

impl ClockSnapshot {
    pub fn remaining(&self, side: PlayerSide) -> Option<i32> {
        match side {
            PlayerSide::White => Some(self.white_time),
            PlayerSide::Black => Some(self.black_time),
            PlayerSide::Spectator => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_threshold_boundary() {
        assert_eq!(low_time_increment(60, 60, 10), 10);
        assert_eq!(low_time_increment(61, 60, 10), 0);
    }

    #[test]
    fn decrement_can_go_negative_on_crossing_tick() {
        assert_eq!(decrement(0), -1);
    }
}
