//! Cancellable timer handles (spec §9 design note: "model as cancellable
//! handles returned by a clock abstraction so tests can inject a virtual
//! clock and drive time deterministically").
//!
//! Every timer fires by sending a command back into the owning actor's own
//! channel, keeping all state mutation on the single executor (spec §5).

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A cancellable handle to a spawned timer task. Dropping the handle does
/// *not* cancel the timer — callers must call [`TimerHandle::cancel`]
/// explicitly, mirroring the source's "walk every timer field and clear it"
/// cancellation procedure (spec §5).
#[derive(Debug)]
pub struct TimerHandle {
    cancel: CancellationToken,
}

impl TimerHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

/// Fire `make_command()` once, after `duration`, unless cancelled first.
pub fn spawn_deadline<T, F>(duration: Duration, sender: mpsc::Sender<T>, make_command: F) -> TimerHandle
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let cancel = CancellationToken::new();
    let child = cancel.clone();
    tokio::spawn(async move {
        tokio::select! {
            () = tokio::time::sleep(duration) => {
                let _ = sender.send(make_command()).await;
            }
            () = child.cancelled() => {}
        }
    });
    TimerHandle { cancel }
}

/// Fire `make_command()` on every tick of `period` until cancelled, used for
/// the clock's per-second decrement (spec §4.2).
pub fn spawn_interval<T, F>(period: Duration, sender: mpsc::Sender<T>, mut make_command: F) -> TimerHandle
where
    T: Send + 'static,
    F: FnMut() -> T + Send + 'static,
{
    let cancel = CancellationToken::new();
    let child = cancel.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await; // first tick fires immediately; discard it
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if sender.send(make_command()).await.is_err() {
                        break;
                    }
                }
                () = child.cancelled() => break,
            }
        }
    });
    TimerHandle { cancel }
}
