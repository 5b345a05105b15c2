use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;

use crate::broadcast::BroadcastMessage;
use crate::protocol::ServerMessage;

/// Used before a connection is registered, e.g. to report a rejected connect.
pub(super) async fn send_immediate_server_message(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> Result<(), axum::Error> {
    let payload = match serde_json::to_string(message) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::error!(error = %err, "failed to serialize server message");
            "{\"type\":\"Error\",\"data\":{\"code\":\"INTERNAL_ERROR\",\"message\":\"internal error\"}}".to_string()
        }
    };

    sender.send(Message::Text(payload.into())).await
}

/// Steady-state per-connection send loop. Takes a `BroadcastMessage` rather
/// than a raw `ServerMessage` so a fan-out to many sockets serializes the
/// JSON body once, via the shared cache, instead of once per socket.
pub(super) async fn send_text_message(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &BroadcastMessage,
) -> Result<(), ()> {
    let json = match message.json_bytes() {
        Ok(json) => json,
        Err(err) => {
            tracing::error!(error = %err, "failed to serialize server message");
            return Ok(());
        }
    };
    // `json_bytes` always comes from `serde_json::to_vec`, so this is valid UTF-8.
    let text = String::from_utf8(json.to_vec()).unwrap_or_default();

    sender.send(Message::Text(text.into())).await.map_err(|err| {
        tracing::debug!(error = %err, "failed to send message, connection closed");
    })
}
