//! Shared meeting record store boundary.
//!
//! One mutable record per meeting plus an append-only action log, hosted
//! remotely and concurrently writable by every admin-capable client. There
//! are no transactions and no ordering guarantees on change delivery, so the
//! boundary deliberately exposes only *commutative* mutations: set-union and
//! set-difference on the replicated sets, single-field sets for the scalar
//! fields. Whole-document overwrite is not expressible here; lost updates
//! under concurrent admin actions cannot happen by construction.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::normalize::ParticipantKey;

/// The replicated per-meeting record.
///
/// Jointly owned by all clients through last-writer-wins field updates; the
/// set fields only ever change one element at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingRecord {
    /// Meeting identifier (store row key, also the engine room name).
    pub meeting_id: String,
    /// Session id of the host, written once by the host client on join.
    /// A fallback moderator signal; dies with the host's session.
    pub host_participant_id: Option<String>,
    /// Opaque token minted at meeting creation. A client presenting the
    /// matching token is the authoritative host.
    pub host_token: Option<String>,
    /// Session ids granted moderator status during the current session.
    pub admin_ids: BTreeSet<String>,
    /// Normalized display names granted moderator status; survives rejoins.
    pub admin_display_names: BTreeSet<String>,
    /// Normalized display names forbidden from remaining in the meeting.
    pub banned_display_names: BTreeSet<String>,
    /// Shared whiteboard toggle state.
    pub whiteboard_open: bool,
}

impl MeetingRecord {
    /// Create an empty record for a meeting.
    #[must_use]
    pub fn new(meeting_id: impl Into<String>) -> Self {
        Self {
            meeting_id: meeting_id.into(),
            ..Self::default()
        }
    }

    /// Whether the replicated sets (or the host fallback) grant moderator
    /// status for this key. Engine-reported status is layered on top by the
    /// roster.
    #[must_use]
    pub fn grants_moderator(&self, key: &ParticipantKey) -> bool {
        match key {
            ParticipantKey::BySessionId(id) => {
                self.admin_ids.contains(id) || self.host_participant_id.as_deref() == Some(id)
            }
            ParticipantKey::ByNormalizedName(name) => self.admin_display_names.contains(name),
        }
    }

    /// Whether this key is banned. Only name keys can match: bans are
    /// keyed by normalized display name so they survive rejoins.
    #[must_use]
    pub fn is_banned(&self, key: &ParticipantKey) -> bool {
        match key {
            ParticipantKey::BySessionId(_) => false,
            ParticipantKey::ByNormalizedName(name) => {
                !name.is_empty() && self.banned_display_names.contains(name)
            }
        }
    }
}

/// A commutative mutation of the meeting record.
///
/// The only write operations the store boundary accepts. Set operations are
/// idempotent and commute with each other, which is what makes concurrent
/// unlocked writes safe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordUpdate {
    /// Union a session id into `admin_ids`.
    AddAdminId(String),
    /// Remove a session id from `admin_ids`.
    RemoveAdminId(String),
    /// Union a normalized name into `admin_display_names`.
    AddAdminName(String),
    /// Remove a normalized name from `admin_display_names`.
    RemoveAdminName(String),
    /// Union a normalized name into `banned_display_names`.
    AddBannedName(String),
    /// Set the whiteboard toggle state.
    SetWhiteboardOpen(bool),
    /// Set the host's session id.
    SetHostParticipantId(String),
}

impl RecordUpdate {
    /// Apply this update to a record. Store implementations share this so
    /// every backend mutates identically.
    pub fn apply(&self, record: &mut MeetingRecord) {
        match self {
            RecordUpdate::AddAdminId(id) => {
                record.admin_ids.insert(id.clone());
            }
            RecordUpdate::RemoveAdminId(id) => {
                record.admin_ids.remove(id);
            }
            RecordUpdate::AddAdminName(name) => {
                record.admin_display_names.insert(name.clone());
            }
            RecordUpdate::RemoveAdminName(name) => {
                record.admin_display_names.remove(name);
            }
            RecordUpdate::AddBannedName(name) => {
                record.banned_display_names.insert(name.clone());
            }
            RecordUpdate::SetWhiteboardOpen(open) => {
                record.whiteboard_open = *open;
            }
            RecordUpdate::SetHostParticipantId(id) => {
                record.host_participant_id = Some(id.clone());
            }
        }
    }
}

/// A change notification for a meeting record.
///
/// Delivery may be duplicated or reordered relative to the writes that
/// caused it; consumers re-derive state wholesale from `new`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordChange {
    /// The record after the mutation.
    pub new: MeetingRecord,
    /// The record before the mutation, when the transport provides it.
    pub old: Option<MeetingRecord>,
}

/// Kind of a delegated privileged action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionType {
    /// Remove a participant from the conference.
    Kick,
    /// Force-mute one participant.
    Mute,
    /// Mute every participant.
    MuteEveryone,
    /// Start a file recording.
    RecordingStart,
    /// Stop the file recording.
    RecordingStop,
    /// Start a live stream.
    StreamStart,
    /// Stop the live stream.
    StreamStop,
}

/// Processing status of a delegated action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    /// Created, not yet executed by an authoritative client.
    Pending,
    /// Executed successfully.
    Done,
    /// Execution failed; the error text is on the record.
    Error,
}

/// One entry of the append-only per-meeting action log.
///
/// Created exactly once per user-initiated privileged request from a
/// non-authoritative client; transitions `Pending -> Done | Error` exactly
/// once, and only by the authoritative client. Never deleted: the log is
/// the audit trail for the meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Unique action id.
    pub id: Uuid,
    /// Meeting this action belongs to.
    pub meeting_id: String,
    /// What to do.
    pub kind: ActionType,
    /// Target session id, for per-participant actions.
    pub target_participant_id: Option<String>,
    /// Processing status.
    pub status: ActionStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// When the authoritative client finished processing.
    pub processed_at: Option<DateTime<Utc>>,
    /// Session id of the requesting client, when known.
    pub requested_by: Option<String>,
    /// Error text, when `status == Error`.
    pub error: Option<String>,
    /// Streaming platform ("youtube" or a bare RTMP target).
    pub platform: Option<String>,
    /// Stream key for `StreamStart`.
    pub stream_key: Option<String>,
    /// RTMP ingest URL for non-YouTube streams.
    pub rtmp_url: Option<String>,
}

impl ActionRecord {
    /// Create a new pending action.
    #[must_use]
    pub fn new(meeting_id: impl Into<String>, kind: ActionType) -> Self {
        Self {
            id: Uuid::new_v4(),
            meeting_id: meeting_id.into(),
            kind,
            target_participant_id: None,
            status: ActionStatus::Pending,
            created_at: Utc::now(),
            processed_at: None,
            requested_by: None,
            error: None,
            platform: None,
            stream_key: None,
            rtmp_url: None,
        }
    }

    /// Set the target participant.
    #[must_use]
    pub fn with_target(mut self, participant_id: impl Into<String>) -> Self {
        self.target_participant_id = Some(participant_id.into());
        self
    }

    /// Set the requesting client's session id.
    #[must_use]
    pub fn with_requested_by(mut self, participant_id: impl Into<String>) -> Self {
        self.requested_by = Some(participant_id.into());
        self
    }

    /// Set the stream payload for `StreamStart`.
    #[must_use]
    pub fn with_stream(
        mut self,
        platform: impl Into<String>,
        stream_key: impl Into<String>,
        rtmp_url: Option<String>,
    ) -> Self {
        self.platform = Some(platform.into());
        self.stream_key = Some(stream_key.into());
        self.rtmp_url = rtmp_url;
        self
    }
}

/// Terminal outcome written back to an action record after processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    /// `Done` or `Error`.
    pub status: ActionStatus,
    /// Processing timestamp.
    pub processed_at: DateTime<Utc>,
    /// Error text for `Error` outcomes.
    pub error: Option<String>,
}

impl ActionOutcome {
    /// Successful execution.
    #[must_use]
    pub fn done() -> Self {
        Self {
            status: ActionStatus::Done,
            processed_at: Utc::now(),
            error: None,
        }
    }

    /// Failed execution with the captured error text.
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            status: ActionStatus::Error,
            processed_at: Utc::now(),
            error: Some(text.into()),
        }
    }
}

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport failure (network, auth, service outage).
    #[error("Store transport error: {0}")]
    Transport(String),

    /// The requested row does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Row (de)serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// The shared meeting record store surface consumed by the coordinator.
///
/// Change notifications ride `broadcast` channels; delivery may be
/// duplicated, reordered, or dropped under lag, and consumers must tolerate
/// all three.
#[async_trait]
pub trait MeetingStore: Send + Sync {
    /// Fetch the meeting record.
    async fn fetch_record(&self, meeting_id: &str) -> Result<MeetingRecord, StoreError>;

    /// Apply one commutative update to the meeting record.
    async fn update_record(&self, meeting_id: &str, update: RecordUpdate)
        -> Result<(), StoreError>;

    /// Append an action to the meeting's action log.
    async fn insert_action(&self, action: ActionRecord) -> Result<(), StoreError>;

    /// Write the terminal outcome of an action.
    async fn update_action(
        &self,
        action_id: Uuid,
        outcome: ActionOutcome,
    ) -> Result<(), StoreError>;

    /// All actions for the meeting still in `Pending` status, oldest first.
    async fn pending_actions(&self, meeting_id: &str) -> Result<Vec<ActionRecord>, StoreError>;

    /// Subscribe to record change notifications for a meeting.
    fn subscribe_record(&self, meeting_id: &str) -> broadcast::Receiver<RecordChange>;

    /// Subscribe to action-log insert notifications for a meeting.
    fn subscribe_actions(&self, meeting_id: &str) -> broadcast::Receiver<ActionRecord>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_record_update_set_ops_are_idempotent() {
        let mut record = MeetingRecord::new("m-1");

        RecordUpdate::AddAdminId("p1".to_string()).apply(&mut record);
        RecordUpdate::AddAdminId("p1".to_string()).apply(&mut record);
        assert_eq!(record.admin_ids.len(), 1);

        RecordUpdate::RemoveAdminId("p1".to_string()).apply(&mut record);
        RecordUpdate::RemoveAdminId("p1".to_string()).apply(&mut record);
        assert!(record.admin_ids.is_empty());
    }

    #[test]
    fn test_record_updates_commute() {
        let mut forward = MeetingRecord::new("m-1");
        let mut reverse = MeetingRecord::new("m-1");

        let a = RecordUpdate::AddAdminId("p1".to_string());
        let b = RecordUpdate::AddAdminName("alice".to_string());
        let c = RecordUpdate::AddBannedName("mallory".to_string());

        a.apply(&mut forward);
        b.apply(&mut forward);
        c.apply(&mut forward);

        c.apply(&mut reverse);
        b.apply(&mut reverse);
        a.apply(&mut reverse);

        assert_eq!(forward, reverse);
    }

    #[test]
    fn test_grants_moderator_by_id_name_or_host() {
        let mut record = MeetingRecord::new("m-1");
        let id_key = ParticipantKey::session("p1");
        let name_key = ParticipantKey::name("Alice");

        assert!(!record.grants_moderator(&id_key));
        assert!(!record.grants_moderator(&name_key));

        record.admin_ids.insert("p1".to_string());
        assert!(record.grants_moderator(&id_key));

        record.admin_ids.clear();
        record.admin_display_names.insert("alice".to_string());
        assert!(record.grants_moderator(&name_key));

        record.admin_display_names.clear();
        record.host_participant_id = Some("p1".to_string());
        assert!(record.grants_moderator(&id_key));
    }

    #[test]
    fn test_is_banned_matches_names_only() {
        let mut record = MeetingRecord::new("m-1");
        record.banned_display_names.insert("mallory".to_string());

        assert!(record.is_banned(&ParticipantKey::name("Mallory (You)")));
        assert!(!record.is_banned(&ParticipantKey::session("mallory")));
    }

    #[test]
    fn test_empty_normalized_name_never_banned() {
        let mut record = MeetingRecord::new("m-1");
        record.banned_display_names.insert(String::new());

        // A name that normalizes to empty must not match the empty entry
        assert!(!record.is_banned(&ParticipantKey::name("(You)")));
    }

    #[test]
    fn test_action_record_builder() {
        let action = ActionRecord::new("m-1", ActionType::Mute)
            .with_target("p7")
            .with_requested_by("p2");

        assert_eq!(action.meeting_id, "m-1");
        assert_eq!(action.kind, ActionType::Mute);
        assert_eq!(action.target_participant_id.as_deref(), Some("p7"));
        assert_eq!(action.requested_by.as_deref(), Some("p2"));
        assert_eq!(action.status, ActionStatus::Pending);
        assert!(action.processed_at.is_none());
    }

    #[test]
    fn test_action_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&ActionType::MuteEveryone).unwrap(),
            "\"mute-everyone\""
        );
        assert_eq!(
            serde_json::to_string(&ActionType::RecordingStart).unwrap(),
            "\"recording-start\""
        );
        assert_eq!(
            serde_json::to_string(&ActionType::Kick).unwrap(),
            "\"kick\""
        );
    }

    #[test]
    fn test_action_outcome_constructors() {
        let done = ActionOutcome::done();
        assert_eq!(done.status, ActionStatus::Done);
        assert!(done.error.is_none());

        let failed = ActionOutcome::error("engine rejected");
        assert_eq!(failed.status, ActionStatus::Error);
        assert_eq!(failed.error.as_deref(), Some("engine rejected"));
    }
}
