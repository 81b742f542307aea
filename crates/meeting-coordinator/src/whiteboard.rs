//! Shared toggle synchronization (whiteboard pattern).
//!
//! The engine only exposes a *toggle* command, never an explicit open or
//! close, so replication must be edge-triggered: react to transitions of the
//! replicated boolean, never to its level. Reacting to the level would make
//! every redundant notification flip the board and send the clients into an
//! infinite flip-flop. The same cache works for any future shared binary
//! state that rides on a toggle-only command.

/// Edge-triggered cache of a replicated boolean.
#[derive(Debug, Clone, Default)]
pub struct WhiteboardSync {
    open: bool,
}

impl WhiteboardSync {
    /// Start with the engine's local state (closed on join).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last value observed from the shared record.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// The value a `toggle()` intent should write to the shared record.
    #[must_use]
    pub fn toggle_target(&self) -> bool {
        !self.open
    }

    /// Observe an incoming replicated value. Returns `true` exactly when the
    /// value transitioned, i.e. when the caller must issue one local engine
    /// toggle to converge.
    pub fn observe(&mut self, incoming: bool) -> bool {
        if self.open == incoming {
            return false;
        }
        self.open = incoming;
        true
    }
}
