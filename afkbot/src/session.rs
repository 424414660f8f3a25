//! One connection attempt and everything it owns.

use afkbot_sdk::client::ClientHandle;
use afkbot_sdk::event::Event;
use tokio::sync::mpsc;

use crate::controller::{SessionId, Signal};
use crate::timers::TimerSet;

pub struct Session {
    pub id: SessionId,
    pub handle: ClientHandle,
    pub timers: TimerSet,
    ready: bool,
}

impl Session {
    /// Wrap a fresh connection. Its events are forwarded, tagged with `id`,
    /// into the controller's signal queue until the connection's event stream
    /// ends. A stream that ends without `Disconnected` is reported as a fault.
    pub fn new(
        id: SessionId,
        handle: ClientHandle,
        mut events: mpsc::Receiver<Event>,
        signals: mpsc::UnboundedSender<Signal>,
    ) -> Self {
        let timers = TimerSet::new(id, signals.clone());
        tokio::spawn(async move {
            let mut disconnected = false;
            while let Some(event) = events.recv().await {
                disconnected |= matches!(event, Event::Disconnected { .. });
                if signals.send(Signal::Event { session: id, event }).is_err() {
                    return;
                }
            }
            if !disconnected {
                let _ = signals.send(Signal::Fault {
                    session: id,
                    error: "event stream closed".to_string(),
                });
            }
        });
        Self {
            id,
            handle,
            timers,
            ready: false,
        }
    }

    pub fn username(&self) -> &str {
        self.handle.username()
    }

    /// Record a ready event. True only the first time, which is when
    /// behaviors get registered.
    pub fn mark_ready(&mut self) -> bool {
        !std::mem::replace(&mut self.ready, true)
    }

    /// Tear the session down: cancel every timer and ask the connection to
    /// close. Events still in flight keep arriving under the old id.
    /// Returns the number of timers cancelled.
    pub fn end(mut self, reason: &str) -> usize {
        let cancelled = self.timers.cancel_all();
        self.handle.try_quit(reason);
        tracing::debug!(session = self.id, cancelled, %reason, "Session ended");
        cancelled
    }
}
