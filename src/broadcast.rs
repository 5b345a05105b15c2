//! Arc-wrapped outbound message with a cached JSON encoding, so fanning the
//! same [`ServerMessage`] out to many sockets serializes it once.

use std::sync::{Arc, OnceLock};

use bytes::Bytes;

use crate::protocol::ServerMessage;

/// A message queued for delivery to one or more connections.
#[derive(Debug, Clone)]
pub struct BroadcastMessage {
    inner: Arc<ServerMessage>,
    json: Arc<OnceLock<Bytes>>,
}

impl BroadcastMessage {
    pub fn new(message: ServerMessage) -> Self {
        Self {
            inner: Arc::new(message),
            json: Arc::new(OnceLock::new()),
        }
    }

    pub fn message(&self) -> &ServerMessage {
        &self.inner
    }

    pub fn arc_clone(&self) -> Arc<ServerMessage> {
        self.inner.clone()
    }

    /// Serialize to JSON on first call; later clones of this `BroadcastMessage`
    /// share the cached bytes via the `Arc<OnceLock<_>>`.
    pub fn json_bytes(&self) -> Result<Bytes, serde_json::Error> {
        if let Some(cached) = self.json.get() {
            return Ok(cached.clone());
        }
        let bytes = Bytes::from(serde_json::to_vec(&*self.inner)?);
        // Another clone may have raced us into the OnceLock; either value is
        // identical, so ignore the set() outcome and read back what's there.
        let _ = self.json.set(bytes.clone());
        Ok(self.json.get().cloned().unwrap_or(bytes))
    }
}

impl From<ServerMessage> for BroadcastMessage {
    fn from(message: ServerMessage) -> Self {
        Self::new(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PlayerId;

    #[test]
    fn json_bytes_cached_across_clones() {
        let msg = BroadcastMessage::new(ServerMessage::Session {
            id: PlayerId("p1".into()),
            name: "Ada".into(),
        });
        let clone = msg.clone();

        let first = msg.json_bytes().unwrap();
        let second = clone.json_bytes().unwrap();
        assert_eq!(first, second);
        assert!(String::from_utf8_lossy(&first).contains("\"Session\""));
    }

    #[test]
    fn arc_clone_shares_allocation() {
        let msg = BroadcastMessage::new(ServerMessage::Pong);
        let a = msg.arc_clone();
        let b = msg.arc_clone();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
