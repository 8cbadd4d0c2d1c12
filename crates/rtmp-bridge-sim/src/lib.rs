//! Scripted media engine for exercising RTMP bridge sessions without native
//! capture or network access.
//!
//! Each command schedules a short script of lifecycle codes on the tokio
//! runtime, the way a real engine reports progress from its own threads.

use std::time::Duration;

use rtmp_bridge_core::{
    BackendFactory, BackendRequest, BridgeError, Command, EventSink, HandleGeneration,
    MediaBackend, Role, constants::event_code,
};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

const DEFAULT_STEP_DELAY: Duration = Duration::from_millis(50);

/// How a scripted engine misbehaves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Failure {
    #[default]
    None,
    /// Camera/encoder setup fails with an error event.
    PreviewError,
    /// The connection never completes and times out.
    ConnectTimeout,
    /// The stream connects, then drops after the given delay.
    DropAfter(Duration),
}

/// Timing and failure injection for simulated engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Script {
    /// Delay between consecutive lifecycle codes.
    pub step_delay: Duration,
    pub failure: Failure,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            step_delay: DEFAULT_STEP_DELAY,
            failure: Failure::None,
        }
    }
}

impl Script {
    pub fn with_step_delay(mut self, step_delay: Duration) -> Self {
        self.step_delay = step_delay;
        self
    }

    pub fn with_failure(mut self, failure: Failure) -> Self {
        self.failure = failure;
        self
    }
}

/// Factory producing [`SimulatedBackend`]s.
#[derive(Debug, Clone, Default)]
pub struct SimulatedBackendFactory {
    script: Script,
    license: Option<String>,
}

impl SimulatedBackendFactory {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            license: None,
        }
    }

    /// Client license forwarded to every engine, as native SDKs require.
    pub fn with_license(mut self, license: impl Into<String>) -> Self {
        self.license = Some(license.into()).filter(|license| !license.trim().is_empty());
        self
    }
}

impl BackendFactory for SimulatedBackendFactory {
    type Backend = SimulatedBackend;

    fn create(&mut self, request: BackendRequest<'_>) -> Result<SimulatedBackend, BridgeError> {
        let runtime = Handle::try_current()
            .map_err(|_| BridgeError::backend("simulated engine requires a tokio runtime"))?;

        debug!(
            generation = %request.generation,
            role = ?request.config.role(),
            url = request.config.url(),
            "creating simulated engine"
        );
        Ok(SimulatedBackend {
            role: request.config.role(),
            url: request.config.url().to_owned(),
            license: self.license.clone(),
            generation: request.generation,
            events: request.events,
            script: self.script,
            runtime,
            cancel: CancellationToken::new(),
        })
    }
}

/// One scripted engine instance.
#[derive(Debug)]
pub struct SimulatedBackend {
    role: Role,
    url: String,
    license: Option<String>,
    generation: HandleGeneration,
    events: EventSink,
    script: Script,
    runtime: Handle,
    cancel: CancellationToken,
}

type Step = (i32, String);

impl SimulatedBackend {
    fn connect_steps(&self) -> Vec<Step> {
        let licensed = match &self.license {
            Some(_) => "licensed",
            None => "unlicensed",
        };
        let mut steps = vec![(
            event_code::CONNECTING,
            format!("connecting to {} ({licensed})", self.url),
        )];
        match self.script.failure {
            Failure::ConnectTimeout => {
                steps.push((event_code::NETWORK_TIMEOUT, "network timeout".to_owned()));
            }
            _ => {
                steps.push((
                    event_code::CONNECTION_STARTED,
                    "connection started".to_owned(),
                ));
                steps.push((event_code::STREAM_CONNECTED, "stream connected".to_owned()));
            }
        }
        steps
    }

    fn preview_steps(&self) -> Vec<Step> {
        match self.script.failure {
            Failure::PreviewError => vec![(event_code::ERROR, "camera unavailable".to_owned())],
            _ => vec![(event_code::PREVIEW_READY, "preview ready".to_owned())],
        }
    }

    /// Emit `steps` one `step_delay` apart until cancelled.
    fn play(&self, steps: Vec<Step>) {
        let cancel = self.cancel.child_token();
        let events = self.events.clone();
        let step_delay = self.script.step_delay;
        let drop_after = match self.script.failure {
            Failure::DropAfter(delay) => Some(delay),
            _ => None,
        };

        self.runtime.spawn(async move {
            for (code, message) in steps {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(step_delay) => {}
                }
                trace!(generation = %events.generation(), code, "simulated engine event");
                let connected = code == event_code::STREAM_CONNECTED;
                if !events.emit(code, message) {
                    return;
                }

                if let (true, Some(delay)) = (connected, drop_after) {
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        _ = tokio::time::sleep(delay) => {}
                    }
                    events.emit(event_code::DISCONNECTED, "connection dropped");
                    return;
                }
            }
        });
    }

    fn cancel_pending(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
    }
}

impl MediaBackend for SimulatedBackend {
    fn dispatch(&mut self, command: Command) -> Result<(), BridgeError> {
        debug!(generation = %self.generation, role = ?self.role, %command, "simulated engine command");

        match (self.role, command) {
            (Role::Publisher, Command::StartPreview) => self.play(self.preview_steps()),
            (_, Command::Start) => self.play(self.connect_steps()),
            (_, Command::Stop) => {
                self.cancel_pending();
                self.events.emit(event_code::STOPPED, "stopped");
            }
            (Role::Publisher, Command::StopPreview) => self.cancel_pending(),
            // Pause is absorbed by the engine; nothing observable changes.
            _ => {}
        }
        Ok(())
    }

    fn release(&mut self) {
        self.cancel.cancel();
        debug!(generation = %self.generation, "simulated engine released");
    }
}
