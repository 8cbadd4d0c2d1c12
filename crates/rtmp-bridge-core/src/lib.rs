//! Control-plane bridge between an application and a native RTMP media
//! engine.
//!
//! This crate defines the command/event protocol, the publisher and player
//! lifecycle state machines, event normalization and the session types that
//! own engine handles. Capture, encoding and transport stay inside the engine,
//! reached only through [`MediaBackend`].

/// Engine-facing traits and the handle slot.
pub mod backend;
/// Event marshaling from engine threads to the session's context.
pub mod channel;
/// Session configuration and validation.
pub mod config;
/// Numeric constant tables shared with engines.
pub mod constants;
/// Stable bridge error types.
pub mod error;
/// Lifecycle code normalization and diagnostics.
pub mod normalization;
/// Single-task session driver with broadcast updates.
pub mod runtime;
/// Sessions owning one engine handle each.
pub mod session;
/// Publisher and player lifecycle state machines.
pub mod state_machine;
/// Protocol types (commands, events, states).
pub mod types;

pub use backend::{BackendFactory, BackendRequest, BackendSlot, MediaBackend};
pub use channel::{EventQueue, EventSink, RawEvent, event_channel};
pub use config::{AudioParameters, PlayerConfig, PublisherConfig, SessionConfig, VideoParameters};
pub use error::{BridgeError, BridgeErrorCategory};
pub use normalization::{EventNormalizer, Severity, diagnostic_line, normalize};
pub use runtime::{SessionRuntimeHandle, SessionUpdate, UpdateStream, spawn_runtime};
pub use session::{Delivery, EventCallback, PlayerSession, PublisherSession, Session};
pub use state_machine::{PlayerStateMachine, PublisherStateMachine, SessionMachine, Transition};
pub use types::{
    Command, EventKind, HandleGeneration, LifecycleEvent, PlayerState, PublisherState, Role,
    ScaleMode, SessionState,
};
