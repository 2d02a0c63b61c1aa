/// Terminal signal observed on a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalEvent {
    Finish, // Response completed normally
    Error,  // Host reported an error while producing the response
    Close,  // Response abandoned before completion
}

impl TerminalEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminalEvent::Finish => "finish",
            TerminalEvent::Error => "error",
            TerminalEvent::Close => "close",
        }
    }
}

/// Per-request observer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Pending,
    Finished,
    Errored,
    Closed,
    Cleaned,
}

/// Single-use state machine tracking one response.
///
/// Only the first terminal event is ever acted on, and cleanup runs once no
/// matter how many events arrive afterwards (e.g. finish followed by close).
#[derive(Debug)]
pub struct Lifecycle {
    state: LifecycleState,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: LifecycleState::Pending,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        self.state == LifecycleState::Pending
    }

    /// Record a terminal event. Returns the event when it is the first one.
    pub fn on_event(&mut self, event: TerminalEvent) -> Option<TerminalEvent> {
        if self.state != LifecycleState::Pending {
            return None;
        }
        self.state = match event {
            TerminalEvent::Finish => LifecycleState::Finished,
            TerminalEvent::Error => LifecycleState::Errored,
            TerminalEvent::Close => LifecycleState::Closed,
        };
        Some(event)
    }

    /// Move to `Cleaned`. Returns `true` only for the call that did it.
    pub fn cleanup(&mut self) -> bool {
        if self.state == LifecycleState::Cleaned {
            return false;
        }
        self.state = LifecycleState::Cleaned;
        true
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
