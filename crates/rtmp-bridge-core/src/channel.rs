use tokio::sync::mpsc;

use crate::{
    backend::BackendFactory,
    session::{Delivery, Session},
    state_machine::SessionMachine,
    types::HandleGeneration,
};

/// Engine notification as emitted, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// Handle that emitted the event.
    pub generation: HandleGeneration,
    pub code: i32,
    pub message: String,
}

/// Create the marshaling pair between engine threads and the session's
/// context.
pub fn event_channel() -> (EventSink, EventQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        EventSink {
            tx,
            generation: HandleGeneration::default(),
        },
        EventQueue { rx },
    )
}

/// Sending half handed to engines.
///
/// Emitting never blocks, so it is safe from capture, encode or network
/// threads that are not running inside an async runtime.
#[derive(Clone, Debug)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<RawEvent>,
    generation: HandleGeneration,
}

impl EventSink {
    /// Sink that stamps every event with `generation`.
    pub fn for_generation(&self, generation: HandleGeneration) -> Self {
        Self {
            tx: self.tx.clone(),
            generation,
        }
    }

    pub fn generation(&self) -> HandleGeneration {
        self.generation
    }

    /// Emit one notification. Returns `false` once the session side is gone.
    pub fn emit(&self, code: i32, message: impl Into<String>) -> bool {
        self.tx
            .send(RawEvent {
                generation: self.generation,
                code,
                message: message.into(),
            })
            .is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half, drained on the application's event-processing context.
#[derive(Debug)]
pub struct EventQueue {
    rx: mpsc::UnboundedReceiver<RawEvent>,
}

impl EventQueue {
    /// Next pending event, without waiting.
    pub fn try_next(&mut self) -> Option<RawEvent> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next event. `None` once every sink is dropped.
    pub async fn recv(&mut self) -> Option<RawEvent> {
        self.rx.recv().await
    }

    /// Deliver every pending event to `session` in emission order.
    ///
    /// Returns how many events reached the application callback.
    pub fn pump<F, M>(&mut self, session: &mut Session<F, M>) -> usize
    where
        F: BackendFactory,
        M: SessionMachine,
    {
        let mut delivered = 0;
        while let Some(event) = self.try_next() {
            if session.deliver_raw(event) == Delivery::Delivered {
                delivered += 1;
            }
        }
        delivered
    }
}
