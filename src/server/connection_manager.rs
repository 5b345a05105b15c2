//! Registry of connected sockets for the one room this process serves.
//!
//! One player id has at most one live outbound sender at a time; a reconnect
//! overwrites the previous entry outright, and the old connection's send loop
//! then dies on its next write (the channel it holds is gone) and unregisters
//! itself.

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::broadcast::BroadcastMessage;
use crate::protocol::{PlayerId, PlayerSide};

struct ClientConnection {
    sender: mpsc::Sender<BroadcastMessage>,
    side: PlayerSide,
}

#[derive(Default)]
pub struct ConnectionManager {
    clients: DashMap<PlayerId, ClientConnection>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, pid: PlayerId, sender: mpsc::Sender<BroadcastMessage>) {
        self.clients.insert(
            pid,
            ClientConnection {
                sender,
                side: PlayerSide::Spectator,
            },
        );
    }

    pub fn unregister(&self, pid: &PlayerId) {
        self.clients.remove(pid);
    }

    /// Record which side a connection belongs to. The connection manager
    /// never reads room state directly; it learns this from `Players`
    /// broadcasts passing through [`super::dispatch::deliver`], which is how
    /// `Recipient::Team` gets resolved without smuggling session data out of
    /// the room actor.
    pub fn set_side(&self, pid: &PlayerId, side: PlayerSide) {
        if let Some(mut conn) = self.clients.get_mut(pid) {
            conn.side = side;
        }
    }

    pub async fn send_to(&self, pid: &PlayerId, message: BroadcastMessage) {
        let Some(sender) = self.clients.get(pid).map(|conn| conn.sender.clone()) else {
            return;
        };
        if sender.send(message).await.is_err() {
            self.clients.remove(pid);
        }
    }

    pub async fn broadcast_all(&self, message: BroadcastMessage) {
        self.broadcast_to(message, |_| true).await;
    }

    pub async fn broadcast_team(&self, side: PlayerSide, message: BroadcastMessage) {
        self.broadcast_to(message, |conn_side| conn_side == side)
            .await;
    }

    async fn broadcast_to(
        &self,
        message: BroadcastMessage,
        predicate: impl Fn(PlayerSide) -> bool,
    ) {
        // Snapshot senders before awaiting anything: holding a DashMap shard
        // guard across an `.await` risks deadlocking against a concurrent
        // register/unregister on the same shard.
        let targets: Vec<(PlayerId, mpsc::Sender<BroadcastMessage>)> = self
            .clients
            .iter()
            .filter(|entry| predicate(entry.side))
            .map(|entry| (entry.key().clone(), entry.sender.clone()))
            .collect();

        for (pid, sender) in targets {
            if sender.send(message.clone()).await.is_err() {
                self.clients.remove(&pid);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ServerMessage;

    #[tokio::test]
    async fn send_to_unknown_player_is_a_no_op() {
        let manager = ConnectionManager::new();
        manager
            .send_to(&PlayerId("ghost".into()), BroadcastMessage::new(ServerMessage::Pong))
            .await;
    }

    #[tokio::test]
    async fn broadcast_team_only_reaches_matching_side() {
        let manager = ConnectionManager::new();
        let (white_tx, mut white_rx) = mpsc::channel(4);
        let (black_tx, mut black_rx) = mpsc::channel(4);
        manager.register(PlayerId("w".into()), white_tx);
        manager.register(PlayerId("b".into()), black_tx);
        manager.set_side(&PlayerId("w".into()), PlayerSide::White);
        manager.set_side(&PlayerId("b".into()), PlayerSide::Black);

        manager
            .broadcast_team(PlayerSide::White, BroadcastMessage::new(ServerMessage::Pong))
            .await;

        assert!(white_rx.try_recv().is_ok());
        assert!(black_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn dead_receiver_is_pruned_on_send() {
        let manager = ConnectionManager::new();
        let (tx, rx) = mpsc::channel(4);
        manager.register(PlayerId("p".into()), tx);
        drop(rx);

        manager
            .broadcast_all(BroadcastMessage::new(ServerMessage::Pong))
            .await;
        assert!(manager.is_empty());
    }
}
