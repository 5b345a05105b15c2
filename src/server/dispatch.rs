//! Delivery of a room handler's `Vec<Emit>` to concrete sockets (spec.md §9
//! design note: the room decides *what changed*, this module decides *how to
//! emit it*).

use crate::broadcast::BroadcastMessage;
use crate::protocol::{PlayerSide, ServerMessage};
use crate::room::{Emit, Recipient};

use super::ConnectionManager;

/// Deliver every emit to its resolved recipients. `Players` broadcasts are
/// also used to keep the connection manager's side index current, since only
/// the room actor's session table otherwise knows which pid plays which side.
/// Wrapping each emit in a [`BroadcastMessage`] means a `Recipient::All`/`Team`
/// fan-out to many sockets serializes the JSON body once, not once per socket.
pub async fn deliver(connections: &ConnectionManager, emits: Vec<Emit>) {
    for emit in emits {
        index_side(connections, &emit.message);

        let message = BroadcastMessage::new(emit.message);
        match emit.to {
            Recipient::All => connections.broadcast_all(message).await,
            Recipient::Team(side) => connections.broadcast_team(side, message).await,
            Recipient::Only(pid) => connections.send_to(&pid, message).await,
        }
    }
}

fn index_side(connections: &ConnectionManager, message: &ServerMessage) {
    let ServerMessage::Players {
        spectators,
        white_players,
        black_players,
    } = message
    else {
        return;
    };

    for entry in spectators {
        connections.set_side(&entry.id, PlayerSide::Spectator);
    }
    for entry in white_players {
        connections.set_side(&entry.id, PlayerSide::White);
    }
    for entry in black_players {
        connections.set_side(&entry.id, PlayerSide::Black);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{PlayerId, RosterEntry};
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn players_broadcast_indexes_side_before_delivery() {
        let connections = ConnectionManager::new();
        let (tx, mut rx) = mpsc::channel(4);
        connections.register(PlayerId("w".into()), tx);

        let players = ServerMessage::Players {
            spectators: vec![],
            white_players: vec![RosterEntry {
                id: PlayerId("w".into()),
                name: "Ada".into(),
                connected: true,
            }],
            black_players: vec![],
        };
        deliver(&connections, vec![Emit::all(players)]).await;
        assert!(rx.try_recv().is_ok());

        deliver(
            &connections,
            vec![Emit::team(PlayerSide::White, ServerMessage::Pong)],
        )
        .await;
        assert!(rx.try_recv().is_ok());
    }
}
