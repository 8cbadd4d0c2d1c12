use std::env;

use tracing::{debug, info, warn};

use crate::types::{EventKind, LifecycleEvent};

/// Log severity derived from a lifecycle code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Preview ready or stream connected.
    Success,
    /// Engine error or network timeout.
    Failure,
    /// Connection handshake in progress.
    Progress,
    Info,
}

impl Severity {
    pub fn of(kind: EventKind) -> Self {
        match kind {
            EventKind::PreviewReady | EventKind::StreamConnected => Self::Success,
            EventKind::Error | EventKind::NetworkTimeout => Self::Failure,
            EventKind::ConnectionStarted => Self::Progress,
            _ => Self::Info,
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            Self::Success => "✅",
            Self::Failure => "❌",
            Self::Progress => "🔄",
            Self::Info => "ℹ️",
        }
    }
}

/// Convert a raw engine notification into a [`LifecycleEvent`].
///
/// Unknown codes are kept as-is and tagged `Event <code>`.
pub fn normalize(code: i32, message: impl Into<String>) -> LifecycleEvent {
    LifecycleEvent::new(code, message)
}

/// Render the one-line diagnostic for an event.
pub fn diagnostic_line(component: &str, platform: &str, event: &LifecycleEvent) -> String {
    let kind = event.kind();
    format!(
        "[{component} {platform}] {} {} ({}): {}",
        Severity::of(kind).glyph(),
        kind.label(),
        event.code,
        event.message
    )
}

/// Normalizes engine notifications for one component, optionally logging
/// each one.
#[derive(Debug, Clone)]
pub struct EventNormalizer {
    component: &'static str,
    diagnostics: bool,
}

impl EventNormalizer {
    pub fn new(component: &'static str, diagnostics: bool) -> Self {
        Self {
            component,
            diagnostics,
        }
    }

    pub fn diagnostics(&self) -> bool {
        self.diagnostics
    }

    pub fn normalize(&self, code: i32, message: impl Into<String>) -> LifecycleEvent {
        let event = normalize(code, message);
        if self.diagnostics {
            self.log(&event);
        }
        event
    }

    fn log(&self, event: &LifecycleEvent) {
        let line = diagnostic_line(self.component, env::consts::OS, event);
        match Severity::of(event.kind()) {
            Severity::Failure => warn!(code = event.code, "{line}"),
            Severity::Progress => debug!(code = event.code, "{line}"),
            Severity::Success | Severity::Info => info!(code = event.code, "{line}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_known_codes_with_semantic_names() {
        let event = normalize(2001, "ready");
        assert_eq!(event.name(), "preview ready");
        assert_eq!(event.message, "ready");
    }

    #[test]
    fn passes_unknown_codes_through() {
        let event = normalize(9999, "x");
        assert_eq!(event.code, 9999);
        assert_eq!(event.name(), "Event 9999");
        assert_eq!(event.kind(), EventKind::Unknown(9999));
    }

    #[test]
    fn picks_glyph_by_severity() {
        assert_eq!(Severity::of(EventKind::from_code(2001)), Severity::Success);
        assert_eq!(Severity::of(EventKind::from_code(2005)), Severity::Success);
        assert_eq!(Severity::of(EventKind::from_code(2003)), Severity::Failure);
        assert_eq!(Severity::of(EventKind::from_code(2006)), Severity::Failure);
        assert_eq!(Severity::of(EventKind::from_code(2004)), Severity::Progress);
        assert_eq!(Severity::of(EventKind::from_code(2007)), Severity::Info);
        assert_eq!(Severity::of(EventKind::from_code(42)), Severity::Info);
    }

    #[test]
    fn renders_diagnostic_line() {
        let line = diagnostic_line(
            "RTMPStreamPublisher",
            "android",
            &normalize(2005, "publishing"),
        );
        assert_eq!(
            line,
            "[RTMPStreamPublisher android] ✅ Stream Connected (2005): publishing"
        );

        let unknown = diagnostic_line("RTMPStreamPlayer", "ios", &normalize(3100, "?"));
        assert_eq!(unknown, "[RTMPStreamPlayer ios] ℹ️ Event 3100 (3100): ?");
    }

    #[test]
    fn diagnostics_never_alter_the_event() {
        let quiet = EventNormalizer::new("RTMPStreamPublisher", false);
        let loud = EventNormalizer::new("RTMPStreamPublisher", true);
        for code in [2000, 2003, 2004, 2006, 9999] {
            assert_eq!(quiet.normalize(code, "m"), loud.normalize(code, "m"));
        }
    }
}
