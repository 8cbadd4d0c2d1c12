use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{constants::event_code, error::BridgeError};

/// Which side of the stream a session drives.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Role {
    /// Captures, encodes and pushes a stream to an RTMP endpoint.
    Publisher,
    /// Pulls, decodes and renders a remote stream.
    Player,
}

impl Role {
    /// Component name used in diagnostics, matching the native view names.
    pub fn component_name(self) -> &'static str {
        match self {
            Self::Publisher => "RTMPStreamPublisher",
            Self::Player => "RTMPStreamPlayer",
        }
    }
}

/// Fire-and-forget command forwarded to the media engine.
///
/// Commands carry no payload and produce no direct result; their outcome is
/// only observable through later [`LifecycleEvent`]s.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Command {
    /// Start publishing (publisher) or playback (player).
    Start,
    /// Stop the stream and release the engine.
    Stop,
    /// Pause playback.
    Pause,
    /// Open the camera and start the local preview.
    StartPreview,
    /// Close the local preview.
    StopPreview,
}

impl Command {
    pub const ALL: [Command; 5] = [
        Command::Start,
        Command::Stop,
        Command::Pause,
        Command::StartPreview,
        Command::StopPreview,
    ];

    /// Wire name used by view-manager style dispatch.
    pub fn name(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Pause => "pause",
            Self::StartPreview => "startPreview",
            Self::StopPreview => "stopPreview",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Command {
    type Err = BridgeError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|command| command.name() == name)
            .ok_or_else(|| BridgeError::unknown_command(name))
    }
}

/// Semantic tag of a lifecycle code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connecting,
    PreviewReady,
    Stopped,
    Error,
    ConnectionStarted,
    StreamConnected,
    NetworkTimeout,
    Disconnected,
    /// Code outside the known table, passed through untouched.
    Unknown(i32),
}

impl EventKind {
    pub fn from_code(code: i32) -> Self {
        match code {
            event_code::CONNECTING => Self::Connecting,
            event_code::PREVIEW_READY => Self::PreviewReady,
            event_code::STOPPED => Self::Stopped,
            event_code::ERROR => Self::Error,
            event_code::CONNECTION_STARTED => Self::ConnectionStarted,
            event_code::STREAM_CONNECTED => Self::StreamConnected,
            event_code::NETWORK_TIMEOUT => Self::NetworkTimeout,
            event_code::DISCONNECTED => Self::Disconnected,
            other => Self::Unknown(other),
        }
    }

    /// Terminal kinds force a session back to idle.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Stopped | Self::Error | Self::NetworkTimeout | Self::Disconnected
        )
    }

    /// Lowercase semantic name, or `Event <code>` for unknown codes.
    pub fn name(self) -> String {
        let name = match self {
            Self::Connecting => "connecting",
            Self::PreviewReady => "preview ready",
            Self::Stopped => "stopped",
            Self::Error => "error",
            Self::ConnectionStarted => "connection started",
            Self::StreamConnected => "stream connected",
            Self::NetworkTimeout => "network timeout",
            Self::Disconnected => "disconnected",
            Self::Unknown(code) => return format!("Event {code}"),
        };
        name.to_owned()
    }

    /// Title-cased label used in diagnostic log lines.
    pub fn label(self) -> String {
        let label = match self {
            Self::Connecting => "Connecting",
            Self::PreviewReady => "Preview Ready",
            Self::Stopped => "Stopped",
            Self::Error => "Error",
            Self::ConnectionStarted => "Connection Started",
            Self::StreamConnected => "Stream Connected",
            Self::NetworkTimeout => "Network Timeout",
            Self::Disconnected => "Disconnected",
            Self::Unknown(code) => return format!("Event {code}"),
        };
        label.to_owned()
    }
}

/// One lifecycle notification delivered to the application callback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LifecycleEvent {
    /// Raw engine code.
    pub code: i32,
    /// Free-form diagnostic text from the engine.
    pub message: String,
    /// Semantic tag derived from `code`.
    pub kind: EventKind,
}

impl LifecycleEvent {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            kind: EventKind::from_code(code),
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Semantic tag, for example `preview ready` or `Event 9999`.
    pub fn name(&self) -> String {
        self.kind().name()
    }

    pub fn is_terminal(&self) -> bool {
        self.kind().is_terminal()
    }
}

/// Publisher lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PublisherState {
    Idle,
    /// `startPreview` sent, waiting for `preview ready`.
    PreviewStarting,
    /// Camera and encoder are up; streaming may start.
    PreviewReady,
    /// `start` sent, waiting for `stream connected`.
    Connecting,
    /// Stream is being published.
    Live,
}

/// Player lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    /// `start` sent, waiting for `stream connected`.
    Buffering,
    /// Stream is rendering (a backend-side pause is not tracked).
    Playing,
}

/// Role-erased session state, used by runtime subscribers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionState {
    Publisher(PublisherState),
    Player(PlayerState),
}

impl From<PublisherState> for SessionState {
    fn from(state: PublisherState) -> Self {
        Self::Publisher(state)
    }
}

impl From<PlayerState> for SessionState {
    fn from(state: PlayerState) -> Self {
        Self::Player(state)
    }
}

/// Player video scaling.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ScaleMode {
    ScaleToFill,
    #[default]
    ScaleAspectFit,
    ScaleAspectFill,
}

impl ScaleMode {
    /// Integer value used by engines that take `scaleMode` as a number.
    pub fn native_value(self) -> u32 {
        match self {
            Self::ScaleToFill => 0,
            Self::ScaleAspectFit => 1,
            Self::ScaleAspectFill => 2,
        }
    }
}

/// Version stamp of one backend handle owned by a session.
///
/// Every acquisition gets a strictly larger generation, so events tagged with
/// an older one can be recognised as stale.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandleGeneration(pub u64);

impl HandleGeneration {
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for HandleGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen-{}", self.0)
    }
}
