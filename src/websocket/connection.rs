use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::broadcast::BroadcastMessage;
use crate::protocol::{ClientMessage, PlayerId, ServerMessage};
use crate::server::{dispatch, AppState};

use super::batching::{send_batch, MessageBatcher};
use super::sending::{send_immediate_server_message, send_text_message};

pub(super) async fn handle_socket(
    socket: WebSocket,
    state: AppState,
    requested_id: Option<PlayerId>,
    requested_name: Option<String>,
) {
    let (mut sender, receiver) = socket.split();

    let emits = match state.room.connect(requested_id, requested_name).await {
        Ok(emits) => emits,
        Err(code) => {
            let _ = send_immediate_server_message(&mut sender, &ServerMessage::error(code)).await;
            let _ = sender.close().await;
            return;
        }
    };

    let pid = match emits.first() {
        Some(crate::room::Emit {
            message: ServerMessage::Session { id, .. },
            ..
        }) => id.clone(),
        _ => {
            tracing::error!("room actor did not answer connect with a Session message");
            let _ = sender.close().await;
            return;
        }
    };

    let queue_capacity = state.config.websocket.batch_size.max(1) * 4;
    let (tx, rx) = mpsc::channel::<BroadcastMessage>(queue_capacity);
    state.connections.register(pid.clone(), tx);
    state.metrics.record_connect();
    tracing::info!(%pid, "connection established");

    dispatch::deliver(&state.connections, emits).await;

    let send_task = spawn_send_task(sender, rx, &state);
    let receive_task = spawn_receive_task(receiver, pid.clone(), state.clone());

    tokio::select! {
        _ = send_task => {}
        _ = receive_task => {}
    }

    state.connections.unregister(&pid);
    state.metrics.record_disconnect();
    let _ = state.room.dispatch(pid.clone(), ClientMessage::Disconnect).await;
    tracing::info!(%pid, "connection closed");
}

fn spawn_send_task(
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<BroadcastMessage>,
    state: &AppState,
) -> tokio::task::JoinHandle<()> {
    let websocket_config = state.config.websocket.clone();
    tokio::spawn(async move {
        if websocket_config.enable_batching {
            let mut batcher =
                MessageBatcher::new(websocket_config.batch_size, websocket_config.batch_interval_ms);
            let mut flush_interval =
                tokio::time::interval(Duration::from_millis(websocket_config.batch_interval_ms));
            flush_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    message_opt = rx.recv() => {
                        match message_opt {
                            Some(message) => {
                                batcher.queue(message);
                                if batcher.should_flush() && send_batch(&mut sender, &mut batcher).await.is_err() {
                                    break;
                                }
                            }
                            None => {
                                if !batcher.is_empty() {
                                    let _ = send_batch(&mut sender, &mut batcher).await;
                                }
                                break;
                            }
                        }
                    }
                    _ = flush_interval.tick() => {
                        if !batcher.is_empty() && send_batch(&mut sender, &mut batcher).await.is_err() {
                            break;
                        }
                    }
                }
            }
        } else {
            while let Some(message) = rx.recv().await {
                if send_text_message(&mut sender, &message).await.is_err() {
                    break;
                }
            }
        }
    })
}

fn spawn_receive_task(
    mut receiver: futures_util::stream::SplitStream<WebSocket>,
    pid: PlayerId,
    state: AppState,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let max_size = state.config.websocket.max_message_size;

        loop {
            let msg = match receiver.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(err)) => {
                    tracing::debug!(%pid, error = %err, "websocket error");
                    break;
                }
                None => break,
            };

            match msg {
                Message::Text(text) => {
                    if text.len() > max_size {
                        tracing::debug!(%pid, size = text.len(), max = max_size, "frame exceeds size limit, dropping");
                        continue;
                    }

                    let client_message: ClientMessage = match serde_json::from_str(&text) {
                        Ok(message) => message,
                        Err(err) => {
                            tracing::debug!(%pid, error = %err, "rejected malformed client frame");
                            continue;
                        }
                    };

                    match state.room.dispatch(pid.clone(), client_message).await {
                        Ok(emits) => dispatch::deliver(&state.connections, emits).await,
                        Err(code) => {
                            state
                                .connections
                                .send_to(&pid, BroadcastMessage::new(ServerMessage::error(code)))
                                .await;
                        }
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    })
}
