//! Server/transport-level configuration.

use super::defaults::default_listen_port;
use serde::{Deserialize, Serialize};

/// Listen-socket configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// TCP port the HTTP/websocket listener binds to.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_port: default_listen_port(),
        }
    }
}
