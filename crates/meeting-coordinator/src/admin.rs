//! Admin/ban synchronization.
//!
//! Promote, demote and ban decisions propagate through the shared meeting
//! record as commutative set updates; every client reacts to the resulting
//! change notifications locally. Enforcement is reactive: a banned client
//! tears down its own session when it sees its normalized name in the ban
//! set, unconditionally, host included.

use std::sync::Arc;

use tracing::{debug, info};

use crate::engine::{ConferenceEngine, EngineCommand};
use crate::errors::CoordError;
use crate::normalize::{normalize_display_name, ParticipantKey};
use crate::store::{MeetingRecord, MeetingStore, RecordUpdate};

/// Write side of admin/ban synchronization.
#[derive(Clone)]
pub struct AdminSync {
    meeting_id: String,
    engine: Arc<dyn ConferenceEngine>,
    store: Arc<dyn MeetingStore>,
}

impl AdminSync {
    /// Create a synchronizer for one meeting.
    pub fn new(
        meeting_id: impl Into<String>,
        engine: Arc<dyn ConferenceEngine>,
        store: Arc<dyn MeetingStore>,
    ) -> Self {
        Self {
            meeting_id: meeting_id.into(),
            engine,
            store,
        }
    }

    /// Promote a participant to admin.
    ///
    /// With direct authority the engine grant happens immediately; the
    /// replicated sets are updated unconditionally so every client (and any
    /// future session of the target) re-derives the new status. Both writes
    /// are additive set-unions: concurrent promotions by other admins cannot
    /// be clobbered.
    pub async fn promote(
        &self,
        participant_id: &str,
        display_name: &str,
        direct_authority: bool,
    ) -> Result<(), CoordError> {
        if direct_authority {
            // Direct-path engine errors are not surfaced; the replicated
            // sets still converge every client.
            if let Err(e) = self.engine.execute(EngineCommand::GrantModerator {
                participant_id: participant_id.to_string(),
            }) {
                debug!(
                    target: "coord.admin",
                    meeting_id = %self.meeting_id,
                    error = %e,
                    "Engine grant failed, relying on replicated sets"
                );
            }
        }

        self.store
            .update_record(
                &self.meeting_id,
                RecordUpdate::AddAdminId(participant_id.to_string()),
            )
            .await?;
        self.store
            .update_record(
                &self.meeting_id,
                RecordUpdate::AddAdminName(normalize_display_name(display_name)),
            )
            .await?;

        info!(
            target: "coord.admin",
            meeting_id = %self.meeting_id,
            "Participant promoted"
        );
        Ok(())
    }

    /// Demote a participant: the set-difference mirror of [`promote`].
    ///
    /// [`promote`]: AdminSync::promote
    pub async fn demote(
        &self,
        participant_id: &str,
        display_name: &str,
        direct_authority: bool,
    ) -> Result<(), CoordError> {
        if direct_authority {
            if let Err(e) = self.engine.execute(EngineCommand::RevokeModerator {
                participant_id: participant_id.to_string(),
            }) {
                debug!(
                    target: "coord.admin",
                    meeting_id = %self.meeting_id,
                    error = %e,
                    "Engine revoke failed, relying on replicated sets"
                );
            }
        }

        self.store
            .update_record(
                &self.meeting_id,
                RecordUpdate::RemoveAdminId(participant_id.to_string()),
            )
            .await?;
        self.store
            .update_record(
                &self.meeting_id,
                RecordUpdate::RemoveAdminName(normalize_display_name(display_name)),
            )
            .await?;

        info!(
            target: "coord.admin",
            meeting_id = %self.meeting_id,
            "Participant demoted"
        );
        Ok(())
    }

    /// Ban a display name from the meeting.
    ///
    /// Pure write: enforcement happens on every client's change handler,
    /// which tears down its own session when its normalized name appears in
    /// the set.
    pub async fn ban(&self, display_name: &str) -> Result<(), CoordError> {
        let normalized = normalize_display_name(display_name);
        self.store
            .update_record(&self.meeting_id, RecordUpdate::AddBannedName(normalized))
            .await?;

        info!(
            target: "coord.admin",
            meeting_id = %self.meeting_id,
            "Display name banned"
        );
        Ok(())
    }
}

/// The local client's standing derived from one record snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalStanding {
    /// Whether the local client currently holds admin status.
    pub is_admin: bool,
    /// Whether the local normalized name is banned.
    pub is_banned: bool,
}

/// Derive the local client's standing from a record snapshot.
///
/// The host is always an admin. Everyone else matches by session id *or*
/// normalized display name (dual-key identity).
#[must_use]
pub fn evaluate(
    record: &MeetingRecord,
    local_id: Option<&str>,
    local_display_name: &str,
    is_host: bool,
) -> LocalStanding {
    let name_key = ParticipantKey::name(local_display_name);

    let by_id = local_id
        .map(|id| record.grants_moderator(&ParticipantKey::session(id)))
        .unwrap_or(false);

    LocalStanding {
        is_admin: is_host || by_id || record.grants_moderator(&name_key),
        is_banned: record.is_banned(&name_key),
    }
}

/// An admin-status transition between two evaluations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleTransition {
    /// The local client became an admin.
    Granted,
    /// The local client lost admin status.
    Revoked,
}

/// Detect a transition between two admin evaluations.
#[must_use]
pub fn role_transition(was_admin: bool, is_admin: bool) -> Option<RoleTransition> {
    match (was_admin, is_admin) {
        (false, true) => Some(RoleTransition::Granted),
        (true, false) => Some(RoleTransition::Revoked),
        _ => None,
    }
}
