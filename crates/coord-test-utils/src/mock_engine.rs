//! Scriptable conferencing engine mock.
//!
//! Records every command dispatched through it, replays scripted events on
//! the subscription stream, and can be told to fail commands to exercise
//! error paths.
//!
//! # Example
//!
//! ```rust,ignore
//! use coord_test_utils::MockEngine;
//! use meeting_coordinator::engine::{EngineCommand, EngineEvent};
//!
//! let engine = MockEngine::new();
//! engine.join_as("p1", "Alice");
//! engine.emit(EngineEvent::ParticipantJoined { participant_id: "p2".into() });
//!
//! // ... run the code under test ...
//!
//! assert!(engine.commands().contains(&EngineCommand::MuteEveryone));
//! ```

use std::sync::{Arc, Mutex};

use meeting_coordinator::engine::{
    ConferenceEngine, EngineCommand, EngineError, EngineEvent, EngineParticipant,
};
use tokio::sync::broadcast;

/// Event channel capacity; large enough that tests never lag.
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Default)]
struct MockEngineInner {
    /// Commands dispatched through `execute`, in order.
    commands: Vec<EngineCommand>,
    /// Current participant snapshot returned by `participants()`.
    participants: Vec<EngineParticipant>,
    /// Local session id, once "joined".
    local_id: Option<String>,
    /// When true, every `execute` fails with `CommandRejected`.
    failing: bool,
}

/// Mock conferencing engine for coordinator tests.
#[derive(Debug, Clone)]
pub struct MockEngine {
    inner: Arc<Mutex<MockEngineInner>>,
    events: broadcast::Sender<EngineEvent>,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEngine {
    /// Create a new engine with no participants.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Mutex::new(MockEngineInner::default())),
            events,
        }
    }

    /// Join the conference as the local participant: sets the local id,
    /// adds the snapshot row, and emits `ConferenceJoined`.
    pub fn join_as(&self, participant_id: &str, display_name: &str) {
        {
            let mut inner = self.inner.lock().expect("mock engine lock poisoned");
            inner.local_id = Some(participant_id.to_string());
            inner.participants.push(EngineParticipant {
                participant_id: participant_id.to_string(),
                display_name: display_name.to_string(),
                ..EngineParticipant::default()
            });
        }
        self.emit(EngineEvent::ConferenceJoined {
            participant_id: participant_id.to_string(),
        });
    }

    /// Add a remote participant to the snapshot and emit `ParticipantJoined`.
    pub fn add_participant(&self, participant: EngineParticipant) {
        let id = participant.participant_id.clone();
        self.inner
            .lock()
            .expect("mock engine lock poisoned")
            .participants
            .push(participant);
        self.emit(EngineEvent::ParticipantJoined { participant_id: id });
    }

    /// Remove a participant from the snapshot and emit `ParticipantLeft`.
    pub fn remove_participant(&self, participant_id: &str) {
        self.inner
            .lock()
            .expect("mock engine lock poisoned")
            .participants
            .retain(|p| p.participant_id != participant_id);
        self.emit(EngineEvent::ParticipantLeft {
            participant_id: participant_id.to_string(),
        });
    }

    /// Replace the full participant snapshot without emitting events.
    pub fn set_participants(&self, participants: Vec<EngineParticipant>) {
        self.inner
            .lock()
            .expect("mock engine lock poisoned")
            .participants = participants;
    }

    /// Emit an event to every subscriber. Dropped silently when no
    /// subscriber exists yet, like a real engine firing before listeners
    /// attach.
    pub fn emit(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }

    /// Make every subsequent command fail with `CommandRejected`.
    pub fn set_failing(&self, failing: bool) {
        self.inner
            .lock()
            .expect("mock engine lock poisoned")
            .failing = failing;
    }

    /// Every command dispatched so far, in order.
    #[must_use]
    pub fn commands(&self) -> Vec<EngineCommand> {
        self.inner
            .lock()
            .expect("mock engine lock poisoned")
            .commands
            .clone()
    }

    /// Count dispatched commands matching a predicate.
    pub fn count_commands(&self, matches: impl Fn(&EngineCommand) -> bool) -> usize {
        self.inner
            .lock()
            .expect("mock engine lock poisoned")
            .commands
            .iter()
            .filter(|c| matches(c))
            .count()
    }
}

impl ConferenceEngine for MockEngine {
    fn execute(&self, command: EngineCommand) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().expect("mock engine lock poisoned");
        if inner.failing {
            return Err(EngineError::CommandRejected(
                "injected mock failure".to_string(),
            ));
        }
        inner.commands.push(command);
        Ok(())
    }

    fn participants(&self) -> Vec<EngineParticipant> {
        self.inner
            .lock()
            .expect("mock engine lock poisoned")
            .participants
            .clone()
    }

    fn local_participant_id(&self) -> Option<String> {
        self.inner
            .lock()
            .expect("mock engine lock poisoned")
            .local_id
            .clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }
}
