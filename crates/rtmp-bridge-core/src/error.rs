use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Command, EventKind, LifecycleEvent};

/// Broad error category surfaced to the application.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BridgeErrorCategory {
    /// Invalid session parameter, detected before a session exists.
    Configuration,
    /// Command name outside the closed command set.
    UnknownCommand,
    /// Command issued while the session holds no live backend handle.
    SessionNotReady,
    /// Command not permitted from the current state.
    IllegalTransition,
    /// Media engine failure (lifecycle code 2003, or a refused call).
    Backend,
    /// Network timeout reported by the engine (lifecycle code 2006).
    NetworkTimeout,
}

impl BridgeErrorCategory {
    /// Stable machine-readable code for the category.
    pub fn code(self) -> &'static str {
        match self {
            Self::Configuration => "configuration_error",
            Self::UnknownCommand => "unknown_command",
            Self::SessionNotReady => "session_not_ready",
            Self::IllegalTransition => "illegal_transition",
            Self::Backend => "backend_error",
            Self::NetworkTimeout => "network_timeout",
        }
    }
}

/// Stable bridge error payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[error("{category:?}:{code}: {message}")]
pub struct BridgeError {
    /// High-level error category.
    pub category: BridgeErrorCategory,
    /// Stable machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl BridgeError {
    /// Construct an error whose code is the category's stable code.
    pub fn new(category: BridgeErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            code: category.code().to_owned(),
            message: message.into(),
        }
    }

    /// Invalid configuration field.
    pub fn configuration(field: &str, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(
            BridgeErrorCategory::Configuration,
            format!("invalid {field}: {reason}"),
        )
    }

    pub fn unknown_command(name: &str) -> Self {
        Self::new(
            BridgeErrorCategory::UnknownCommand,
            format!("'{name}' is not a recognised command"),
        )
    }

    pub fn session_not_ready(command: Command) -> Self {
        Self::new(
            BridgeErrorCategory::SessionNotReady,
            format!("cannot run '{command}' without a live backend handle"),
        )
    }

    /// Build a standard illegal-transition error.
    pub fn illegal_transition(current: impl Debug, command: Command) -> Self {
        Self::new(
            BridgeErrorCategory::IllegalTransition,
            format!("cannot run '{command}' while session is in state {current:?}"),
        )
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::new(BridgeErrorCategory::Backend, message)
    }
}

impl LifecycleEvent {
    /// Asynchronous failure carried by this event, if any.
    ///
    /// These are only ever observed on the event stream, never returned from
    /// a command.
    pub fn as_error(&self) -> Option<BridgeError> {
        let category = match self.kind() {
            EventKind::Error => BridgeErrorCategory::Backend,
            EventKind::NetworkTimeout => BridgeErrorCategory::NetworkTimeout,
            _ => return None,
        };
        Some(BridgeError::new(category, self.message.clone()))
    }
}
