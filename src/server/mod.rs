//! Bridges the room actor to live sockets: a shared [`AppState`], the
//! connection registry, and the delivery loop that resolves every
//! [`crate::room::Recipient`] to concrete sends.

pub mod connection_manager;
pub mod dispatch;

use std::sync::Arc;

pub use connection_manager::ConnectionManager;
pub use dispatch::deliver;

use crate::config::Config;
use crate::metrics::ServerMetrics;
use crate::room::RoomHandle;

/// Everything an axum handler needs to talk to the room and its sockets.
#[derive(Clone)]
pub struct AppState {
    pub room: RoomHandle,
    pub connections: Arc<ConnectionManager>,
    pub metrics: Arc<ServerMetrics>,
    pub config: Arc<Config>,
}
