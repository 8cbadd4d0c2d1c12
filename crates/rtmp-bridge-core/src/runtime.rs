//! Single-context driver that owns a session inside one tokio task.
//!
//! Application requests and engine events are consumed by the same loop, so
//! they are applied strictly one at a time in arrival order.

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::debug;

use crate::{
    backend::BackendFactory,
    channel::EventQueue,
    error::{BridgeError, BridgeErrorCategory},
    session::Session,
    state_machine::SessionMachine,
    types::{Command, LifecycleEvent, SessionState},
};

const REQUEST_BUFFER: usize = 64;
const UPDATE_BUFFER: usize = 256;

/// Broadcast stream type used by runtime subscribers.
pub type UpdateStream = broadcast::Receiver<SessionUpdate>;

/// Notification fanned out to runtime subscribers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionUpdate {
    /// Lifecycle event delivered by the live engine handle.
    Event(LifecycleEvent),
    /// Session moved to a new state.
    StateChanged(SessionState),
}

enum RuntimeRequest {
    Dispatch {
        command: Command,
        reply: oneshot::Sender<Result<(), BridgeError>>,
    },
    State {
        reply: oneshot::Sender<SessionState>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable front door to a running session.
///
/// The session is closed when [`SessionRuntimeHandle::shutdown`] is called or
/// when the last handle is dropped.
#[derive(Clone, Debug)]
pub struct SessionRuntimeHandle {
    request_tx: mpsc::Sender<RuntimeRequest>,
    update_tx: broadcast::Sender<SessionUpdate>,
}

impl SessionRuntimeHandle {
    /// Validate and forward a command.
    ///
    /// Resolves once the session accepted or rejected the command; it never
    /// waits for the engine to act on it.
    pub async fn dispatch(&self, command: Command) -> Result<(), BridgeError> {
        let (reply, rx) = oneshot::channel();
        self.request(RuntimeRequest::Dispatch { command, reply })
            .await?;
        rx.await.map_err(|_| runtime_stopped())?
    }

    /// Parse a wire command name and dispatch it.
    ///
    /// Unknown names are rejected here, before reaching the session task.
    pub async fn dispatch_named(&self, name: &str) -> Result<(), BridgeError> {
        let command = name.parse::<Command>()?;
        self.dispatch(command).await
    }

    pub async fn state(&self) -> Result<SessionState, BridgeError> {
        let (reply, rx) = oneshot::channel();
        self.request(RuntimeRequest::State { reply }).await?;
        rx.await.map_err(|_| runtime_stopped())
    }

    /// Close the session and release its engine handle.
    pub async fn shutdown(&self) -> Result<(), BridgeError> {
        let (reply, rx) = oneshot::channel();
        self.request(RuntimeRequest::Shutdown { reply }).await?;
        rx.await.map_err(|_| runtime_stopped())
    }

    /// Subscribe to lifecycle events and state changes.
    pub fn subscribe(&self) -> UpdateStream {
        self.update_tx.subscribe()
    }

    async fn request(&self, request: RuntimeRequest) -> Result<(), BridgeError> {
        self.request_tx
            .send(request)
            .await
            .map_err(|_| runtime_stopped())
    }
}

/// Move `session` into a dedicated task and return its handle.
///
/// The runtime installs its own event callback on the session; subscribe to
/// the handle instead.
pub fn spawn_runtime<F, M>(mut session: Session<F, M>, queue: EventQueue) -> SessionRuntimeHandle
where
    F: BackendFactory,
    M: SessionMachine,
{
    let (request_tx, request_rx) = mpsc::channel(REQUEST_BUFFER);
    let (update_tx, _) = broadcast::channel(UPDATE_BUFFER);

    let events_tx = update_tx.clone();
    session.on_event(move |event| {
        let _ = events_tx.send(SessionUpdate::Event(event.clone()));
    });

    let runtime = SessionRuntime {
        session,
        queue,
        request_rx,
        update_tx: update_tx.clone(),
    };
    tokio::spawn(async move {
        runtime.run().await;
    });

    SessionRuntimeHandle {
        request_tx,
        update_tx,
    }
}

struct SessionRuntime<F: BackendFactory, M: SessionMachine> {
    session: Session<F, M>,
    queue: EventQueue,
    request_rx: mpsc::Receiver<RuntimeRequest>,
    update_tx: broadcast::Sender<SessionUpdate>,
}

impl<F: BackendFactory, M: SessionMachine> SessionRuntime<F, M> {
    async fn run(mut self) {
        debug!(role = ?M::ROLE, "session runtime started");
        loop {
            tokio::select! {
                request = self.request_rx.recv() => {
                    let Some(request) = request else {
                        break;
                    };
                    if !self.handle_request(request) {
                        break;
                    }
                }
                Some(event) = self.queue.recv() => {
                    self.observe(|session| {
                        session.deliver_raw(event);
                    });
                }
            }
        }

        self.observe(Session::close);
        debug!(role = ?M::ROLE, "session runtime stopped");
    }

    /// Returns `false` when the loop should stop.
    fn handle_request(&mut self, request: RuntimeRequest) -> bool {
        match request {
            RuntimeRequest::Dispatch { command, reply } => {
                let result = self.observe(|session| session.dispatch(command));
                let _ = reply.send(result);
                true
            }
            RuntimeRequest::State { reply } => {
                let _ = reply.send(self.session.state().into());
                true
            }
            RuntimeRequest::Shutdown { reply } => {
                self.observe(Session::close);
                let _ = reply.send(());
                false
            }
        }
    }

    /// Run `f` against the session and publish any resulting state change.
    fn observe<T>(&mut self, f: impl FnOnce(&mut Session<F, M>) -> T) -> T {
        let before = self.session.state();
        let result = f(&mut self.session);
        let after = self.session.state();
        if before != after {
            let _ = self.update_tx.send(SessionUpdate::StateChanged(after.into()));
        }
        result
    }
}

fn runtime_stopped() -> BridgeError {
    BridgeError::new(
        BridgeErrorCategory::SessionNotReady,
        "session runtime has shut down",
    )
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use tokio::time::{sleep, timeout};

    use super::*;
    use crate::{
        backend::testing::{RecordingFactory, SharedJournal},
        channel::EventSink,
        config::{PlayerConfig, PublisherConfig},
        session::{PlayerSession, PublisherSession},
        types::{HandleGeneration, PlayerState, PublisherState},
    };

    const URL: &str = "rtmp://live.example.com/app/key";

    async fn next_update(updates: &mut UpdateStream) -> SessionUpdate {
        timeout(Duration::from_secs(2), updates.recv())
            .await
            .expect("update timeout")
            .expect("update receive")
    }

    fn sink(journal: &SharedJournal, index: usize) -> EventSink {
        journal.lock().expect("journal").sinks[index].clone()
    }

    fn spawn_publisher() -> (SessionRuntimeHandle, SharedJournal) {
        let factory = RecordingFactory::default();
        let journal = Arc::clone(&factory.journal);
        let (session, queue) =
            PublisherSession::new(PublisherConfig::new(URL), factory).expect("publisher");
        (spawn_runtime(session, queue), journal)
    }

    #[tokio::test]
    async fn publishes_events_and_state_changes_in_order() {
        let (handle, journal) = spawn_publisher();
        let mut updates = handle.subscribe();

        handle
            .dispatch(Command::StartPreview)
            .await
            .expect("startPreview");
        assert_eq!(
            next_update(&mut updates).await,
            SessionUpdate::StateChanged(PublisherState::PreviewStarting.into())
        );

        sink(&journal, 0).emit(2001, "ready");
        match next_update(&mut updates).await {
            SessionUpdate::Event(event) => assert_eq!(event.name(), "preview ready"),
            other => panic!("unexpected update: {other:?}"),
        }
        assert_eq!(
            next_update(&mut updates).await,
            SessionUpdate::StateChanged(PublisherState::PreviewReady.into())
        );

        handle.dispatch(Command::Start).await.expect("start");
        assert_eq!(
            handle.state().await.expect("state"),
            SessionState::Publisher(PublisherState::Connecting)
        );
    }

    #[tokio::test]
    async fn reports_command_errors_synchronously() {
        let (handle, _journal) = spawn_publisher();

        let err = handle
            .dispatch(Command::Start)
            .await
            .expect_err("start from idle");
        assert_eq!(err.category, BridgeErrorCategory::IllegalTransition);

        let err = handle
            .dispatch_named("zoom")
            .await
            .expect_err("unknown command");
        assert_eq!(err.category, BridgeErrorCategory::UnknownCommand);

        assert_eq!(
            handle.state().await.expect("state"),
            SessionState::Publisher(PublisherState::Idle)
        );
    }

    #[tokio::test]
    async fn discards_stale_events_after_timeout() {
        let factory = RecordingFactory::default();
        let journal = Arc::clone(&factory.journal);
        let (session, queue) =
            PlayerSession::new(PlayerConfig::new(URL), factory).expect("player");
        let handle = spawn_runtime(session, queue);
        let mut updates = handle.subscribe();

        handle.dispatch(Command::Start).await.expect("start");
        next_update(&mut updates).await;

        let old = sink(&journal, 0);
        old.emit(2006, "timeout");
        old.emit(2005, "late");

        match next_update(&mut updates).await {
            SessionUpdate::Event(event) => assert_eq!(event.code, 2006),
            other => panic!("unexpected update: {other:?}"),
        }
        assert_eq!(
            next_update(&mut updates).await,
            SessionUpdate::StateChanged(PlayerState::Idle.into())
        );
        assert_eq!(
            handle.state().await.expect("state"),
            SessionState::Player(PlayerState::Idle)
        );
        assert!(updates.try_recv().is_err());
        assert_eq!(
            journal.lock().expect("journal").released,
            vec![HandleGeneration(1)]
        );
    }

    #[tokio::test]
    async fn shutdown_releases_and_rejects_later_commands() {
        let (handle, journal) = spawn_publisher();

        handle.shutdown().await.expect("shutdown");
        assert_eq!(
            journal.lock().expect("journal").released,
            vec![HandleGeneration(1)]
        );

        let err = handle
            .dispatch(Command::StartPreview)
            .await
            .expect_err("runtime is gone");
        assert_eq!(err.category, BridgeErrorCategory::SessionNotReady);
    }

    #[tokio::test]
    async fn dropping_every_handle_closes_the_session() {
        let (handle, journal) = spawn_publisher();
        drop(handle);

        timeout(Duration::from_secs(2), async {
            while journal.lock().expect("journal").released.is_empty() {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("session must be released");
    }
}
