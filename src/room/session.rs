//! Player session bookkeeping (spec §3, §4.6).

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::protocol::{PlayerId, PlayerSide};

/// One known player identity. Created on first connection, removed either
/// immediately (kick) or after the disconnect grace period elapses.
#[derive(Debug, Clone)]
pub struct Session {
    pub pid: PlayerId,
    pub name: String,
    pub side: PlayerSide,
    pub connected: bool,
    /// Set when the player disconnects; cleared on reconnect. The actor's
    /// timer registry owns the actual grace-period timer keyed by this pid.
    pub disconnect_grace_deadline: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(pid: PlayerId, name: String) -> Self {
        Self {
            pid,
            name,
            side: PlayerSide::Spectator,
            connected: true,
            disconnect_grace_deadline: None,
        }
    }

    pub fn roster_entry(&self) -> crate::protocol::RosterEntry {
        crate::protocol::RosterEntry {
            id: self.pid.clone(),
            name: self.name.clone(),
            connected: self.connected,
        }
    }
}

/// All known sessions, keyed by pid.
#[derive(Debug, Default)]
pub struct Sessions {
    by_pid: HashMap<PlayerId, Session>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, pid: &PlayerId) -> Option<&Session> {
        self.by_pid.get(pid)
    }

    pub fn get_mut(&mut self, pid: &PlayerId) -> Option<&mut Session> {
        self.by_pid.get_mut(pid)
    }

    pub fn insert(&mut self, session: Session) {
        self.by_pid.insert(session.pid.clone(), session);
    }

    pub fn remove(&mut self, pid: &PlayerId) -> Option<Session> {
        self.by_pid.remove(pid)
    }

    pub fn contains(&self, pid: &PlayerId) -> bool {
        self.by_pid.contains_key(pid)
    }

    pub fn connected_pids(&self) -> Vec<PlayerId> {
        self.by_pid
            .values()
            .filter(|s| s.connected)
            .map(|s| s.pid.clone())
            .collect()
    }

    pub fn connected_on_side(&self, side: PlayerSide) -> Vec<PlayerId> {
        self.by_pid
            .values()
            .filter(|s| s.connected && s.side == side)
            .map(|s| s.pid.clone())
            .collect()
    }

    pub fn roster(&self, side: PlayerSide) -> Vec<crate::protocol::RosterEntry> {
        let mut entries: Vec<_> = self
            .by_pid
            .values()
            .filter(|s| s.side == side)
            .map(Session::roster_entry)
            .collect();
        entries.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.by_pid.values()
    }

    pub fn len(&self) -> usize {
        self.by_pid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_pid.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connected_on_side_filters_disconnected() {
        let mut sessions = Sessions::new();
        let mut a = Session::new(PlayerId("a".into()), "A".into());
        a.side = PlayerSide::White;
        let mut b = Session::new(PlayerId("b".into()), "B".into());
        b.side = PlayerSide::White;
        b.connected = false;
        sessions.insert(a);
        sessions.insert(b);

        assert_eq!(
            sessions.connected_on_side(PlayerSide::White),
            vec![PlayerId("a".into())]
        );
    }
}
