//! Conferencing engine adapter boundary.
//!
//! The embedding application wraps its conferencing engine (an iframe API,
//! an SDK, a test double) behind [`ConferenceEngine`]. The coordination
//! layer only ever sees this surface: a fire-and-forget command channel, a
//! broadcast event stream, and a participant snapshot.
//!
//! Event payloads arrive from the engine as loosely-typed blobs; the adapter
//! is responsible for validating them into the closed [`EngineEvent`] union
//! before they reach this crate.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

/// Engine role string reported for moderators.
pub const MODERATOR_ROLE: &str = "moderator";

/// Commands dispatched to the conferencing engine.
///
/// All commands are fire-and-forget: the engine applies them locally and
/// reports resulting state through its event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    /// Toggle the local microphone.
    ToggleAudio,
    /// Toggle the local camera.
    ToggleVideo,
    /// Remove a participant from the conference.
    KickParticipant { participant_id: String },
    /// Force-mute a participant's audio.
    MuteParticipant { participant_id: String },
    /// Ask a muted participant to unmute.
    AskToUnmute { participant_id: String },
    /// Mute every participant except the sender.
    MuteEveryone,
    /// Grant engine-level moderator rights.
    GrantModerator { participant_id: String },
    /// Revoke engine-level moderator rights.
    RevokeModerator { participant_id: String },
    /// Toggle the shared whiteboard (the engine has no open/close command).
    ToggleWhiteboard,
    /// Start a recording or live stream.
    StartRecording {
        mode: RecordingMode,
        youtube_stream_key: Option<String>,
        rtmp_stream_key: Option<String>,
        rtmp_stream_url: Option<String>,
    },
    /// Stop a recording or live stream.
    StopRecording { mode: RecordingMode },
    /// Leave the conference and tear down local media.
    HangUp,
}

/// Recording mode for `StartRecording`/`StopRecording`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingMode {
    /// Record to a file.
    File,
    /// Stream to an RTMP endpoint.
    Stream,
}

/// Events emitted by the conferencing engine.
///
/// A closed tagged union: the adapter validates the engine's dynamic
/// payloads into these variants at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A remote participant joined the conference.
    ParticipantJoined { participant_id: String },
    /// A remote participant left the conference.
    ParticipantLeft { participant_id: String },
    /// A participant's engine role changed.
    RoleChanged {
        participant_id: String,
        role: String,
    },
    /// A participant changed their display name.
    DisplayNameChanged {
        participant_id: String,
        display_name: String,
    },
    /// A participant's audio mute status changed.
    MuteStatusChanged {
        participant_id: String,
        audio_muted: bool,
    },
    /// The local client finished joining; carries the local session id.
    ConferenceJoined { participant_id: String },
    /// The local client left the conference.
    ConferenceLeft,
}

/// One row of the engine's participant snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineParticipant {
    /// Engine-assigned session id.
    pub participant_id: String,
    /// Raw display name.
    pub display_name: String,
    /// Engine-formatted display name (may carry a suffix like "(me)").
    pub formatted_display_name: Option<String>,
    /// Engine-reported moderator flag.
    pub is_moderator: bool,
    /// Engine-reported role string, when available.
    pub role: Option<String>,
    /// Whether the participant's audio is muted.
    pub is_audio_muted: bool,
}

impl EngineParticipant {
    /// The name to display for this participant, preferring the engine's
    /// formatted variant.
    #[must_use]
    pub fn label(&self) -> &str {
        self.formatted_display_name
            .as_deref()
            .unwrap_or(&self.display_name)
    }

    /// Whether the engine itself reports this participant as a moderator.
    #[must_use]
    pub fn engine_reports_moderator(&self) -> bool {
        self.is_moderator || self.role.as_deref() == Some(MODERATOR_ROLE)
    }
}

/// Errors from engine command dispatch.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine refused or failed to apply the command.
    #[error("Command rejected: {0}")]
    CommandRejected(String),

    /// The engine is not connected to a conference.
    #[error("Engine disconnected")]
    Disconnected,
}

/// The conferencing engine adapter surface consumed by the coordinator.
pub trait ConferenceEngine: Send + Sync {
    /// Dispatch a command. Fire-and-forget: success means the command was
    /// handed to the engine, not that it took effect.
    fn execute(&self, command: EngineCommand) -> Result<(), EngineError>;

    /// Snapshot of the engine's current participant list. May contain
    /// duplicates; callers deduplicate.
    fn participants(&self) -> Vec<EngineParticipant>;

    /// The local session id, once the engine has reported it.
    fn local_participant_id(&self) -> Option<String>;

    /// Subscribe to the engine's event stream.
    fn subscribe(&self) -> broadcast::Receiver<EngineEvent>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_label_prefers_formatted_name() {
        let p = EngineParticipant {
            participant_id: "p1".to_string(),
            display_name: "Alice".to_string(),
            formatted_display_name: Some("Alice (me)".to_string()),
            ..EngineParticipant::default()
        };
        assert_eq!(p.label(), "Alice (me)");
    }

    #[test]
    fn test_label_falls_back_to_display_name() {
        let p = EngineParticipant {
            participant_id: "p1".to_string(),
            display_name: "Alice".to_string(),
            ..EngineParticipant::default()
        };
        assert_eq!(p.label(), "Alice");
    }

    #[test]
    fn test_engine_reports_moderator_via_flag_or_role() {
        let mut p = EngineParticipant {
            participant_id: "p1".to_string(),
            display_name: "Alice".to_string(),
            ..EngineParticipant::default()
        };
        assert!(!p.engine_reports_moderator());

        p.is_moderator = true;
        assert!(p.engine_reports_moderator());

        p.is_moderator = false;
        p.role = Some(MODERATOR_ROLE.to_string());
        assert!(p.engine_reports_moderator());

        p.role = Some("participant".to_string());
        assert!(!p.engine_reports_moderator());
    }

    #[test]
    fn test_recording_mode_serialization() {
        assert_eq!(
            serde_json::to_string(&RecordingMode::File).unwrap(),
            "\"file\""
        );
        assert_eq!(
            serde_json::to_string(&RecordingMode::Stream).unwrap(),
            "\"stream\""
        );
    }
}
