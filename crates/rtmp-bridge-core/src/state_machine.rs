use std::fmt::Debug;

use crate::{
    error::BridgeError,
    types::{Command, EventKind, PlayerState, PublisherState, Role, SessionState},
};

/// State change produced by a command or an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition<S> {
    pub from: S,
    pub to: S,
}

impl<S: PartialEq> Transition<S> {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Role-specific lifecycle rules driven by a [`crate::session::Session`].
pub trait SessionMachine: Clone + Debug + Default + Send + 'static {
    type State: Copy + Debug + Eq + Into<SessionState> + Send + 'static;

    const ROLE: Role;

    fn state(&self) -> Self::State;

    fn is_idle(&self) -> bool;

    /// Validate and apply a command. Rejected commands leave the state
    /// untouched.
    fn apply(&mut self, command: Command) -> Result<Transition<Self::State>, BridgeError>;

    /// Apply an engine event. Returns `None` when the event does not move
    /// the machine.
    fn on_event(&mut self, kind: EventKind) -> Option<Transition<Self::State>>;

    /// Whether `command` may acquire a fresh backend handle when none is
    /// live.
    fn acquires_backend(command: Command) -> bool;

    /// Commands forwarded to a live backend before it is released on
    /// teardown.
    fn teardown_commands(&self) -> Vec<Command>;
}

/// Publisher lifecycle: `Idle → PreviewStarting → PreviewReady → Connecting → Live`.
#[derive(Debug, Clone)]
pub struct PublisherStateMachine {
    state: PublisherState,
}

impl Default for PublisherStateMachine {
    fn default() -> Self {
        Self {
            state: PublisherState::Idle,
        }
    }
}

impl SessionMachine for PublisherStateMachine {
    type State = PublisherState;

    const ROLE: Role = Role::Publisher;

    fn state(&self) -> PublisherState {
        self.state
    }

    fn is_idle(&self) -> bool {
        self.state == PublisherState::Idle
    }

    fn apply(&mut self, command: Command) -> Result<Transition<PublisherState>, BridgeError> {
        use PublisherState::*;

        match command {
            Command::StartPreview => transition_from_state(
                &mut self.state,
                Idle,
                PreviewStarting,
                command,
            ),
            Command::Start => transition_from_state(&mut self.state, PreviewReady, Connecting, command),
            Command::StopPreview => transition_from_any_of(
                &mut self.state,
                &[Idle, PreviewStarting, PreviewReady],
                Idle,
                command,
            ),
            Command::Stop => Ok(reset(&mut self.state, Idle)),
            // Publishers have no pause semantics.
            Command::Pause => Err(BridgeError::illegal_transition(self.state, command)),
        }
    }

    fn on_event(&mut self, kind: EventKind) -> Option<Transition<PublisherState>> {
        use PublisherState::*;

        match (self.state, kind) {
            (_, kind) if kind.is_terminal() => {
                (!self.is_idle()).then(|| reset(&mut self.state, Idle))
            }
            (PreviewStarting, EventKind::PreviewReady) => Some(reset(&mut self.state, PreviewReady)),
            (Connecting, EventKind::StreamConnected) => Some(reset(&mut self.state, Live)),
            _ => None,
        }
    }

    fn acquires_backend(command: Command) -> bool {
        command == Command::StartPreview
    }

    fn teardown_commands(&self) -> Vec<Command> {
        match self.state {
            PublisherState::PreviewStarting | PublisherState::PreviewReady => {
                vec![Command::StopPreview, Command::Stop]
            }
            _ => vec![Command::Stop],
        }
    }
}

/// Player lifecycle: `Idle → Buffering → Playing`.
#[derive(Debug, Clone)]
pub struct PlayerStateMachine {
    state: PlayerState,
}

impl Default for PlayerStateMachine {
    fn default() -> Self {
        Self {
            state: PlayerState::Idle,
        }
    }
}

impl SessionMachine for PlayerStateMachine {
    type State = PlayerState;

    const ROLE: Role = Role::Player;

    fn state(&self) -> PlayerState {
        self.state
    }

    fn is_idle(&self) -> bool {
        self.state == PlayerState::Idle
    }

    fn apply(&mut self, command: Command) -> Result<Transition<PlayerState>, BridgeError> {
        use PlayerState::*;

        match command {
            Command::Start => transition_from_state(&mut self.state, Idle, Buffering, command),
            // The engine tracks the paused sub-state; the bridge stays in `Playing`.
            Command::Pause => transition_from_state(&mut self.state, Playing, Playing, command),
            Command::Stop => Ok(reset(&mut self.state, Idle)),
            Command::StartPreview | Command::StopPreview => {
                Err(BridgeError::illegal_transition(self.state, command))
            }
        }
    }

    fn on_event(&mut self, kind: EventKind) -> Option<Transition<PlayerState>> {
        use PlayerState::*;

        match (self.state, kind) {
            (_, kind) if kind.is_terminal() => {
                (!self.is_idle()).then(|| reset(&mut self.state, Idle))
            }
            (Buffering, EventKind::StreamConnected) => Some(reset(&mut self.state, Playing)),
            _ => None,
        }
    }

    fn acquires_backend(command: Command) -> bool {
        command == Command::Start
    }

    fn teardown_commands(&self) -> Vec<Command> {
        vec![Command::Stop]
    }
}

fn reset<S: Copy>(state: &mut S, next: S) -> Transition<S> {
    let from = *state;
    *state = next;
    Transition { from, to: next }
}

fn transition_from_state<S: Copy + Debug + Eq>(
    state: &mut S,
    expected: S,
    next: S,
    command: Command,
) -> Result<Transition<S>, BridgeError> {
    if *state != expected {
        return Err(BridgeError::illegal_transition(*state, command));
    }
    Ok(reset(state, next))
}

fn transition_from_any_of<S: Copy + Debug + Eq>(
    state: &mut S,
    expected: &[S],
    next: S,
    command: Command,
) -> Result<Transition<S>, BridgeError> {
    if !expected.contains(state) {
        return Err(BridgeError::illegal_transition(*state, command));
    }
    Ok(reset(state, next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeErrorCategory;

    const TERMINAL: [i32; 4] = [2002, 2003, 2006, 2007];

    fn event(code: i32) -> EventKind {
        EventKind::from_code(code)
    }

    fn live_publisher() -> PublisherStateMachine {
        let mut sm = PublisherStateMachine::default();
        sm.apply(Command::StartPreview).expect("preview must start");
        sm.on_event(event(2001));
        sm.apply(Command::Start).expect("start must work");
        sm.on_event(event(2004));
        sm.on_event(event(2005));
        sm
    }

    #[test]
    fn runs_publisher_happy_path() {
        let mut sm = PublisherStateMachine::default();

        sm.apply(Command::StartPreview).expect("startPreview from idle");
        assert_eq!(sm.state(), PublisherState::PreviewStarting);

        sm.on_event(event(2001)).expect("preview ready must advance");
        assert_eq!(sm.state(), PublisherState::PreviewReady);

        sm.apply(Command::Start).expect("start after preview ready");
        assert_eq!(sm.state(), PublisherState::Connecting);

        assert_eq!(sm.on_event(event(2000)), None);
        assert_eq!(sm.on_event(event(2004)), None);
        assert_eq!(sm.state(), PublisherState::Connecting);

        let transition = sm.on_event(event(2005)).expect("stream connected must advance");
        assert_eq!(transition.from, PublisherState::Connecting);
        assert_eq!(sm.state(), PublisherState::Live);

        sm.apply(Command::Stop).expect("stop from live");
        assert_eq!(sm.state(), PublisherState::Idle);
    }

    #[test]
    fn rejects_start_before_preview_ready() {
        for setup in [vec![], vec![Command::StartPreview]] {
            let mut sm = PublisherStateMachine::default();
            for command in setup {
                sm.apply(command).expect("setup command");
            }
            let before = sm.state();

            let err = sm.apply(Command::Start).expect_err("start must be rejected");
            assert_eq!(err.category, BridgeErrorCategory::IllegalTransition);
            assert_eq!(sm.state(), before);
        }
    }

    #[test]
    fn stop_preview_is_limited_to_preview_states() {
        let mut sm = PublisherStateMachine::default();
        sm.apply(Command::StopPreview).expect("stopPreview from idle");
        assert_eq!(sm.state(), PublisherState::Idle);

        sm.apply(Command::StartPreview).expect("startPreview");
        sm.apply(Command::StopPreview).expect("stopPreview while starting");
        assert_eq!(sm.state(), PublisherState::Idle);

        let mut live = live_publisher();
        let err = live
            .apply(Command::StopPreview)
            .expect_err("stopPreview while live must fail");
        assert_eq!(err.code, "illegal_transition");
        assert_eq!(live.state(), PublisherState::Live);
    }

    #[test]
    fn stop_is_legal_while_preview_is_starting() {
        let mut sm = PublisherStateMachine::default();
        sm.apply(Command::StartPreview).expect("startPreview");
        sm.apply(Command::Stop).expect("stop before preview ready");
        assert_eq!(sm.state(), PublisherState::Idle);
    }

    #[test]
    fn publisher_pause_is_always_rejected() {
        let mut idle = PublisherStateMachine::default();
        assert!(idle.apply(Command::Pause).is_err());

        let mut live = live_publisher();
        assert!(live.apply(Command::Pause).is_err());
        assert_eq!(live.state(), PublisherState::Live);
    }

    #[test]
    fn terminal_events_reset_every_publisher_state() {
        for code in TERMINAL {
            let mut sm = live_publisher();
            let transition = sm.on_event(event(code)).expect("terminal must reset");
            assert_eq!(transition.to, PublisherState::Idle);
            // A second terminal event in idle is a no-op.
            assert_eq!(sm.on_event(event(code)), None);
        }
    }

    #[test]
    fn preview_ready_outside_preview_starting_is_ignored() {
        let mut sm = live_publisher();
        assert_eq!(sm.on_event(event(2001)), None);
        assert_eq!(sm.state(), PublisherState::Live);
    }

    #[test]
    fn runs_player_happy_path_with_pause() {
        let mut sm = PlayerStateMachine::default();

        let err = sm.apply(Command::Pause).expect_err("pause in idle must fail");
        assert_eq!(err.category, BridgeErrorCategory::IllegalTransition);

        sm.apply(Command::Start).expect("start from idle");
        assert_eq!(sm.state(), PlayerState::Buffering);

        sm.on_event(event(2005)).expect("stream connected must advance");
        assert_eq!(sm.state(), PlayerState::Playing);

        let transition = sm.apply(Command::Pause).expect("pause while playing");
        assert!(!transition.changed());
        assert_eq!(sm.state(), PlayerState::Playing);

        sm.apply(Command::Stop).expect("stop");
        assert_eq!(sm.state(), PlayerState::Idle);
    }

    #[test]
    fn player_rejects_preview_commands_and_double_start() {
        let mut sm = PlayerStateMachine::default();
        assert!(sm.apply(Command::StartPreview).is_err());
        assert!(sm.apply(Command::StopPreview).is_err());

        sm.apply(Command::Start).expect("start");
        assert!(sm.apply(Command::Start).is_err());
        assert_eq!(sm.state(), PlayerState::Buffering);
    }

    #[test]
    fn player_terminal_events_reset_and_unknown_codes_do_not() {
        let mut sm = PlayerStateMachine::default();
        sm.apply(Command::Start).expect("start");

        assert_eq!(sm.on_event(event(9999)), None);
        assert_eq!(sm.state(), PlayerState::Buffering);

        sm.on_event(event(2006)).expect("timeout must reset");
        assert_eq!(sm.state(), PlayerState::Idle);
    }

    #[test]
    fn only_arming_commands_acquire_backends() {
        assert!(PublisherStateMachine::acquires_backend(Command::StartPreview));
        assert!(!PublisherStateMachine::acquires_backend(Command::Start));
        assert!(PlayerStateMachine::acquires_backend(Command::Start));
        assert!(!PlayerStateMachine::acquires_backend(Command::Stop));
    }

    #[test]
    fn publisher_teardown_stops_preview_first() {
        let mut sm = PublisherStateMachine::default();
        assert_eq!(sm.teardown_commands(), vec![Command::Stop]);

        sm.apply(Command::StartPreview).expect("startPreview");
        assert_eq!(
            sm.teardown_commands(),
            vec![Command::StopPreview, Command::Stop]
        );
    }
}
