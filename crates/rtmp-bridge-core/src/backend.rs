//! Seam between sessions and the native media engine.

use tracing::debug;

use crate::{
    channel::EventSink,
    config::SessionConfig,
    error::BridgeError,
    types::{Command, HandleGeneration},
};

/// One live media engine instance.
///
/// Engines run capture, encode and transport on their own threads and report
/// progress through the [`EventSink`] they were created with.
pub trait MediaBackend: Send {
    /// Forward a command without waiting for the engine to act on it.
    ///
    /// Errors are reserved for immediate refusals; everything else is
    /// reported later as a lifecycle event.
    fn dispatch(&mut self, command: Command) -> Result<(), BridgeError>;

    /// Tear the engine down. Called at most once per instance.
    fn release(&mut self);
}

/// Everything a factory needs to bring up one engine instance.
#[derive(Debug)]
pub struct BackendRequest<'a> {
    pub generation: HandleGeneration,
    pub config: &'a SessionConfig,
    pub events: EventSink,
}

/// Creates platform-specific engines; chosen when a session is created.
pub trait BackendFactory: Send + 'static {
    type Backend: MediaBackend + 'static;

    fn create(&mut self, request: BackendRequest<'_>) -> Result<Self::Backend, BridgeError>;
}

/// Exclusive owner of at most one live backend handle.
pub struct BackendSlot<B: MediaBackend> {
    live: Option<B>,
    generation: HandleGeneration,
}

impl<B: MediaBackend> Default for BackendSlot<B> {
    fn default() -> Self {
        Self {
            live: None,
            generation: HandleGeneration::default(),
        }
    }
}

impl<B: MediaBackend> BackendSlot<B> {
    /// Generation of the most recently acquired handle, live or not.
    pub fn generation(&self) -> HandleGeneration {
        self.generation
    }

    pub fn is_live(&self) -> bool {
        self.live.is_some()
    }

    /// Whether `generation` names the handle that is currently live.
    pub fn is_current(&self, generation: HandleGeneration) -> bool {
        self.is_live() && self.generation == generation
    }

    /// Acquire a new handle under the next generation.
    ///
    /// Any handle still live is released first.
    pub fn acquire<F>(&mut self, create: F) -> Result<HandleGeneration, BridgeError>
    where
        F: FnOnce(HandleGeneration) -> Result<B, BridgeError>,
    {
        self.release();
        let generation = self.generation.next();
        let backend = create(generation)?;
        self.generation = generation;
        self.live = Some(backend);
        debug!(%generation, "backend handle acquired");
        Ok(generation)
    }

    pub fn get_mut(&mut self) -> Option<&mut B> {
        self.live.as_mut()
    }

    /// Release the live handle. Returns `false` when there was none.
    pub fn release(&mut self) -> bool {
        match self.live.take() {
            Some(mut backend) => {
                backend.release();
                debug!(generation = %self.generation, "backend handle released");
                true
            }
            None => false,
        }
    }
}
