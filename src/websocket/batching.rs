use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use tokio::time::Instant;

use crate::broadcast::BroadcastMessage;

use super::sending::send_text_message;

/// Batches multiple outbound messages together to reduce syscall overhead
/// (spec.md §11, gated by `config::WebSocketConfig::enable_batching`).
pub(super) struct MessageBatcher {
    pending: Vec<BroadcastMessage>,
    batch_size: usize,
    batch_interval: Duration,
    last_flush: Instant,
}

impl MessageBatcher {
    pub(super) fn new(batch_size: usize, batch_interval_ms: u64) -> Self {
        Self {
            pending: Vec::with_capacity(batch_size),
            batch_size,
            batch_interval: Duration::from_millis(batch_interval_ms),
            last_flush: Instant::now(),
        }
    }

    pub(super) fn queue(&mut self, message: BroadcastMessage) {
        self.pending.push(message);
    }

    pub(super) fn should_flush(&self) -> bool {
        self.pending.len() >= self.batch_size
            || (!self.pending.is_empty() && self.last_flush.elapsed() >= self.batch_interval)
    }

    pub(super) fn flush(&mut self) -> Vec<BroadcastMessage> {
        self.last_flush = Instant::now();
        std::mem::take(&mut self.pending)
    }

    #[cfg(test)]
    pub(super) fn len(&self) -> usize {
        self.pending.len()
    }

    pub(super) fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

pub(super) async fn send_batch(
    sender: &mut SplitSink<WebSocket, Message>,
    batcher: &mut MessageBatcher,
) -> Result<(), ()> {
    let messages = batcher.flush();
    if messages.is_empty() {
        return Ok(());
    }

    let batch_size = messages.len();
    for message in messages {
        send_text_message(sender, &message).await?;
    }
    tracing::trace!(batch_size, "flushed message batch");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{PlayerId, ServerMessage};

    fn sample() -> BroadcastMessage {
        BroadcastMessage::new(ServerMessage::Session {
            id: PlayerId("p".into()),
            name: "Ada".into(),
        })
    }

    #[test]
    fn new_batcher_is_empty() {
        let batcher = MessageBatcher::new(10, 16);
        assert_eq!(batcher.len(), 0);
        assert!(batcher.is_empty());
        assert!(!batcher.should_flush());
    }

    #[test]
    fn queue_tracks_pending_count() {
        let mut batcher = MessageBatcher::new(10, 16);
        batcher.queue(sample());
        assert_eq!(batcher.len(), 1);
        assert!(!batcher.is_empty());
    }

    #[test]
    fn flushes_on_size() {
        let mut batcher = MessageBatcher::new(3, 1000);
        for _ in 0..2 {
            batcher.queue(sample());
        }
        assert!(!batcher.should_flush());
        batcher.queue(sample());
        assert!(batcher.should_flush());

        let messages = batcher.flush();
        assert_eq!(messages.len(), 3);
        assert!(batcher.is_empty());
    }

    #[test]
    fn flushes_on_time() {
        use std::thread;

        let mut batcher = MessageBatcher::new(100, 50);
        batcher.queue(sample());
        assert!(!batcher.should_flush());

        thread::sleep(Duration::from_millis(60));
        assert!(batcher.should_flush());

        let messages = batcher.flush();
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn multiple_flushes_reset_pending() {
        let mut batcher = MessageBatcher::new(2, 1000);
        for _ in 0..2 {
            batcher.queue(sample());
        }
        assert_eq!(batcher.flush().len(), 2);
        assert_eq!(batcher.len(), 0);

        for _ in 0..2 {
            batcher.queue(sample());
        }
        assert_eq!(batcher.flush().len(), 2);
    }

    #[test]
    fn empty_flush_yields_nothing() {
        let mut batcher = MessageBatcher::new(10, 16);
        assert!(batcher.flush().is_empty());
    }
}
