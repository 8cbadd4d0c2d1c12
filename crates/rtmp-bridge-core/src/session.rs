use tracing::{debug, warn};

use crate::{
    backend::{BackendFactory, BackendRequest, BackendSlot, MediaBackend},
    channel::{EventQueue, EventSink, RawEvent, event_channel},
    config::{PlayerConfig, PublisherConfig, SessionConfig},
    error::BridgeError,
    normalization::EventNormalizer,
    state_machine::{PlayerStateMachine, PublisherStateMachine, SessionMachine},
    types::{Command, HandleGeneration, LifecycleEvent, Role},
};

/// Application callback receiving every non-stale lifecycle event.
pub type EventCallback = Box<dyn FnMut(&LifecycleEvent) + Send>;

/// Outcome of handing one engine notification to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Normalized, applied and passed to the callback.
    Delivered,
    /// Emitted by a released or superseded handle; dropped.
    Discarded,
}

pub type PublisherSession<F> = Session<F, PublisherStateMachine>;
pub type PlayerSession<F> = Session<F, PlayerStateMachine>;

/// One publish-or-play attempt and the engine handle it exclusively owns.
///
/// The handle is released exactly once: on `stop`, on a terminal event, on
/// [`Session::close`] or when the session is dropped, whichever comes first.
pub struct Session<F: BackendFactory, M: SessionMachine> {
    config: SessionConfig,
    factory: F,
    machine: M,
    slot: BackendSlot<F::Backend>,
    sink: EventSink,
    normalizer: EventNormalizer,
    callback: Option<EventCallback>,
    closed: bool,
}

impl<F: BackendFactory> PublisherSession<F> {
    /// Validate `config` and bring up the first engine handle.
    pub fn new(config: PublisherConfig, factory: F) -> Result<(Self, EventQueue), BridgeError> {
        Self::create(config.into(), factory)
    }
}

impl<F: BackendFactory> PlayerSession<F> {
    /// Validate `config` and bring up the first engine handle.
    pub fn new(config: PlayerConfig, factory: F) -> Result<(Self, EventQueue), BridgeError> {
        Self::create(config.into(), factory)
    }
}

impl<F: BackendFactory, M: SessionMachine> Session<F, M> {
    fn create(config: SessionConfig, factory: F) -> Result<(Self, EventQueue), BridgeError> {
        config.validate()?;

        let (sink, queue) = event_channel();
        let mut session = Self {
            normalizer: EventNormalizer::new(M::ROLE.component_name(), config.debug()),
            config,
            factory,
            machine: M::default(),
            slot: BackendSlot::default(),
            sink,
            callback: None,
            closed: false,
        };
        session.acquire()?;

        debug!(role = ?M::ROLE, url = session.config.url(), "session created");
        Ok((session, queue))
    }

    /// Install the application event callback, replacing any previous one.
    pub fn on_event<C>(&mut self, callback: C)
    where
        C: FnMut(&LifecycleEvent) + Send + 'static,
    {
        self.callback = Some(Box::new(callback));
    }

    pub fn role(&self) -> Role {
        M::ROLE
    }

    pub fn state(&self) -> M::State {
        self.machine.state()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Generation of the most recent engine handle.
    pub fn generation(&self) -> HandleGeneration {
        self.slot.generation()
    }

    /// Whether a live engine handle backs the session.
    pub fn is_ready(&self) -> bool {
        !self.closed && self.slot.is_live()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Parse a wire command name and dispatch it.
    pub fn dispatch_named(&mut self, name: &str) -> Result<(), BridgeError> {
        let command = name.parse::<Command>().inspect_err(|err| {
            warn!(role = ?M::ROLE, error = %err, "rejected command");
        })?;
        self.dispatch(command)
    }

    /// Forward `command` to the engine.
    ///
    /// Returns as soon as the engine has accepted the call; the outcome is
    /// reported through later lifecycle events.
    pub fn dispatch(&mut self, command: Command) -> Result<(), BridgeError> {
        self.try_dispatch(command).inspect_err(|err| {
            warn!(role = ?M::ROLE, %command, error = %err, "rejected command");
        })
    }

    fn try_dispatch(&mut self, command: Command) -> Result<(), BridgeError> {
        if self.closed {
            return Err(BridgeError::session_not_ready(command));
        }

        let mut candidate = self.machine.clone();
        let transition = candidate.apply(command)?;

        if !self.slot.is_live() {
            if !M::acquires_backend(command) {
                return Err(BridgeError::session_not_ready(command));
            }
            self.acquire()?;
        }

        let backend = self
            .slot
            .get_mut()
            .ok_or_else(|| BridgeError::session_not_ready(command))?;
        backend.dispatch(command)?;

        self.machine = candidate;
        if command == Command::Stop {
            self.slot.release();
        }

        debug!(
            role = ?M::ROLE,
            %command,
            from = ?transition.from,
            to = ?transition.to,
            "command dispatched"
        );
        Ok(())
    }

    /// Hand one engine notification to the session.
    ///
    /// Events from a handle other than the live one are discarded without
    /// touching state or reaching the callback.
    pub fn deliver_event(
        &mut self,
        generation: HandleGeneration,
        code: i32,
        message: impl Into<String>,
    ) -> Delivery {
        if self.closed || !self.slot.is_current(generation) {
            debug!(
                role = ?M::ROLE,
                %generation,
                live = %self.slot.generation(),
                code,
                "discarding stale event"
            );
            return Delivery::Discarded;
        }

        let event = self.normalizer.normalize(code, message);
        let kind = event.kind();

        if let Some(transition) = self.machine.on_event(kind) {
            debug!(
                role = ?M::ROLE,
                event = %kind.name(),
                from = ?transition.from,
                to = ?transition.to,
                "state changed"
            );
        }
        if kind.is_terminal() {
            self.slot.release();
        }

        if let Some(callback) = self.callback.as_mut() {
            callback(&event);
        }
        Delivery::Delivered
    }

    pub(crate) fn deliver_raw(&mut self, event: RawEvent) -> Delivery {
        self.deliver_event(event.generation, event.code, event.message)
    }

    /// Tear the session down and release its engine handle.
    ///
    /// Safe to call repeatedly; later commands fail with `SessionNotReady`.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Some(backend) = self.slot.get_mut() {
            for command in self.machine.teardown_commands() {
                if let Err(err) = backend.dispatch(command) {
                    warn!(role = ?M::ROLE, %command, error = %err, "teardown command failed");
                }
            }
        }
        self.slot.release();
        self.machine = M::default();
        debug!(role = ?M::ROLE, "session closed");
    }

    fn acquire(&mut self) -> Result<HandleGeneration, BridgeError> {
        let Self {
            slot,
            factory,
            config,
            sink,
            ..
        } = self;
        slot.acquire(|generation| {
            factory.create(BackendRequest {
                generation,
                config,
                events: sink.for_generation(generation),
            })
        })
    }
}

impl<F: BackendFactory, M: SessionMachine> Drop for Session<F, M> {
    fn drop(&mut self) {
        self.close();
    }
}
