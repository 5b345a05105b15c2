use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::response::Response;
use serde::Deserialize;

use crate::protocol::PlayerId;
use crate::server::AppState;

use super::connection::handle_socket;

/// Query parameters accepted on the `/ws` upgrade. `id` lets a reconnecting
/// client hand back the identity it was assigned on its first connect (spec
/// §4.6 "Reconnection"); both are optional for a first-time visitor.
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub id: Option<String>,
    pub name: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<ConnectQuery>,
    State(state): State<AppState>,
) -> Response {
    let requested_id = query.id.map(PlayerId);
    ws.on_upgrade(move |socket| handle_socket(socket, state, requested_id, query.name))
}
