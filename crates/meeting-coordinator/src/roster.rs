//! Roster reconciliation.
//!
//! The roster is derived state: on every roster-affecting event the full
//! display list is recomputed from the engine's participant snapshot plus
//! the replicated moderator/ban sets. Entries are never partially mutated.
//! [`reconcile`] is a pure function over one snapshot and is safe to call
//! redundantly; the coordinator debounces bursts so only the last scheduled
//! pass in a burst actually runs.

use std::collections::BTreeSet;

use crate::engine::EngineParticipant;
use crate::normalize::ParticipantKey;
use crate::store::MeetingRecord;

/// Synthetic id for the host's pinned self entry.
pub const HOST_SELF_ENTRY_ID: &str = "local-host";

/// What the coordinator knows about the local client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalIdentity {
    /// Session id cached from the engine's conference-joined event, when
    /// already reported.
    pub participant_id: Option<String>,
    /// The local display name.
    pub display_name: String,
    /// Whether this client is the authoritative host.
    pub is_host: bool,
}

/// One derived roster row. Recomputed wholesale on every pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    /// Session id (or [`HOST_SELF_ENTRY_ID`] for the host's self entry).
    pub participant_id: String,
    /// Name to display.
    pub display_name: String,
    /// Whether this row is the local client.
    pub is_local: bool,
    /// Computed moderator flag (union over every moderator signal).
    pub is_moderator: bool,
    /// Whether the participant's audio is muted.
    pub is_audio_muted: bool,
}

/// The moderator union rule: engine-reported flag or role, accumulated
/// role-change events, replicated admin sets, or the host fallback id.
#[must_use]
pub fn is_moderator(
    participant: &EngineParticipant,
    record: &MeetingRecord,
    engine_role_moderators: &BTreeSet<String>,
) -> bool {
    participant.engine_reports_moderator()
        || engine_role_moderators.contains(&participant.participant_id)
        || record.grants_moderator(&ParticipantKey::session(&participant.participant_id))
        || record.grants_moderator(&ParticipantKey::name(participant.label()))
}

/// Resolve the effective local session id.
///
/// Prefers the id cached from the engine's conference-joined event and falls
/// back to matching by display name. Known limitation: when two participants
/// share a display name and no cached id exists, the first match is taken;
/// there is no tie-break.
fn effective_local_id(deduped: &[EngineParticipant], local: &LocalIdentity) -> Option<String> {
    if let Some(id) = &local.participant_id {
        return Some(id.clone());
    }
    deduped
        .iter()
        .find(|p| {
            p.formatted_display_name.as_deref() == Some(local.display_name.as_str())
                || p.display_name == local.display_name
        })
        .map(|p| p.participant_id.clone())
}

/// Reconcile the engine's participant snapshot with the replicated
/// moderation state into an ordered display roster.
///
/// Pure and idempotent: identical inputs produce an identical sequence,
/// content and order. The host's own row is synthesized (pinned moderator,
/// `"<name> (You)"`) and placed first; everyone else follows in engine
/// order.
#[must_use]
pub fn reconcile(
    engine_list: &[EngineParticipant],
    local: &LocalIdentity,
    record: &MeetingRecord,
    engine_role_moderators: &BTreeSet<String>,
) -> Vec<RosterEntry> {
    // Deduplicate by session id, keeping the first occurrence.
    let mut seen = BTreeSet::new();
    let deduped: Vec<EngineParticipant> = engine_list
        .iter()
        .filter(|p| seen.insert(p.participant_id.clone()))
        .cloned()
        .collect();

    let local_id = effective_local_id(&deduped, local);

    let entry_for = |p: &EngineParticipant, is_local: bool| RosterEntry {
        participant_id: p.participant_id.clone(),
        display_name: p.label().to_string(),
        is_local,
        is_moderator: is_moderator(p, record, engine_role_moderators),
        is_audio_muted: p.is_audio_muted,
    };

    if local.is_host {
        // The host's raw entry is replaced by a synthesized self entry so
        // the host never appears twice.
        let matched = deduped
            .iter()
            .find(|p| Some(p.participant_id.as_str()) == local_id.as_deref());

        let base_name = matched
            .map(|p| p.label().to_string())
            .unwrap_or_else(|| local.display_name.clone());

        let self_entry = RosterEntry {
            participant_id: HOST_SELF_ENTRY_ID.to_string(),
            display_name: format!("{base_name} (You)"),
            is_local: true,
            is_moderator: true,
            is_audio_muted: matched.is_some_and(|p| p.is_audio_muted),
        };

        let others = deduped
            .iter()
            .filter(|p| Some(p.participant_id.as_str()) != local_id.as_deref())
            .map(|p| entry_for(p, false));

        std::iter::once(self_entry).chain(others).collect()
    } else {
        deduped
            .iter()
            .map(|p| {
                let is_local = Some(p.participant_id.as_str()) == local_id.as_deref();
                entry_for(p, is_local)
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn participant(id: &str, name: &str) -> EngineParticipant {
        EngineParticipant {
            participant_id: id.to_string(),
            display_name: name.to_string(),
            ..EngineParticipant::default()
        }
    }

    fn local_host(name: &str) -> LocalIdentity {
        LocalIdentity {
            participant_id: None,
            display_name: name.to_string(),
            is_host: true,
        }
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let list = vec![
            participant("p1", "Alice"),
            participant("p2", "Bob"),
            participant("p3", "Carol"),
        ];
        let local = LocalIdentity {
            participant_id: Some("p1".to_string()),
            display_name: "Alice".to_string(),
            is_host: true,
        };
        let record = MeetingRecord::new("m-1");
        let mods = BTreeSet::new();

        let first = reconcile(&list, &local, &record, &mods);
        for _ in 0..5 {
            assert_eq!(reconcile(&list, &local, &record, &mods), first);
        }
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let mut duplicate = participant("p2", "Bob");
        duplicate.is_audio_muted = true;
        let list = vec![
            participant("p2", "Bob"),
            duplicate,
            participant("p3", "Carol"),
        ];
        let local = LocalIdentity {
            participant_id: Some("p9".to_string()),
            display_name: "Dana".to_string(),
            is_host: false,
        };
        let record = MeetingRecord::new("m-1");

        let roster = reconcile(&list, &local, &record, &BTreeSet::new());
        assert_eq!(roster.len(), 2);
        let bob = roster.iter().find(|e| e.participant_id == "p2").unwrap();
        // First occurrence wins
        assert!(!bob.is_audio_muted);
    }

    #[test]
    fn test_host_self_entry_is_pinned_and_first() {
        let list = vec![participant("p1", "Alice"), participant("p2", "Bob")];
        let local = LocalIdentity {
            participant_id: Some("p1".to_string()),
            display_name: "Alice".to_string(),
            is_host: true,
        };
        let record = MeetingRecord::new("m-1");

        let roster = reconcile(&list, &local, &record, &BTreeSet::new());
        assert_eq!(roster.len(), 2);
        let this = roster.first().unwrap();
        assert_eq!(this.participant_id, HOST_SELF_ENTRY_ID);
        assert_eq!(this.display_name, "Alice (You)");
        assert!(this.is_local);
        assert!(this.is_moderator);
        // The matched raw entry is excluded from the remainder
        assert!(
            roster
                .iter()
                .filter(|e| e.display_name.contains("Alice"))
                .count()
                == 1
        );
    }

    #[test]
    fn test_host_without_engine_entry_still_gets_self_row() {
        // Engine has not reported the host yet
        let list = vec![participant("p2", "Bob")];
        let roster = reconcile(
            &list,
            &local_host("Alice"),
            &MeetingRecord::new("m-1"),
            &BTreeSet::new(),
        );
        assert_eq!(roster.len(), 2);
        assert_eq!(roster.first().unwrap().display_name, "Alice (You)");
        assert_eq!(roster.get(1).unwrap().participant_id, "p2");
    }

    #[test]
    fn test_local_id_falls_back_to_name_match() {
        let list = vec![participant("p1", "Alice"), participant("p2", "Bob")];
        let local = local_host("Alice");

        let roster = reconcile(&list, &local, &MeetingRecord::new("m-1"), &BTreeSet::new());
        // "p1" matched by name and replaced by the self entry
        assert!(!roster.iter().any(|e| e.participant_id == "p1"));
        assert!(roster.iter().any(|e| e.participant_id == "p2"));
    }

    #[test]
    fn test_moderator_union_each_source_flips_the_flag() {
        let list = vec![participant("p7", "Grace")];
        let local = LocalIdentity {
            participant_id: Some("p1".to_string()),
            display_name: "Alice".to_string(),
            is_host: false,
        };
        let empty_mods = BTreeSet::new();

        let flag = |record: &MeetingRecord, mods: &BTreeSet<String>| {
            reconcile(&list, &local, record, mods)
                .first()
                .unwrap()
                .is_moderator
        };

        let record = MeetingRecord::new("m-1");
        assert!(!flag(&record, &empty_mods));

        // admin_ids
        let mut by_id = record.clone();
        by_id.admin_ids.insert("p7".to_string());
        assert!(flag(&by_id, &empty_mods));

        // admin_display_names (normalized)
        let mut by_name = record.clone();
        by_name.admin_display_names.insert("grace".to_string());
        assert!(flag(&by_name, &empty_mods));

        // host fallback id
        let mut by_host = record.clone();
        by_host.host_participant_id = Some("p7".to_string());
        assert!(flag(&by_host, &empty_mods));

        // accumulated engine role events
        let mut role_mods = BTreeSet::new();
        role_mods.insert("p7".to_string());
        assert!(flag(&record, &role_mods));

        // engine-reported flag on the snapshot row
        let mut engine_flagged = participant("p7", "Grace");
        engine_flagged.is_moderator = true;
        assert!(
            reconcile(&[engine_flagged], &local, &record, &empty_mods)
                .first()
                .unwrap()
                .is_moderator
        );

        // removing every source flips it back
        assert!(!flag(&record, &empty_mods));
    }

    #[test]
    fn test_engine_order_preserved_for_others() {
        let list = vec![
            participant("p3", "Carol"),
            participant("p2", "Bob"),
            participant("p4", "Dana"),
        ];
        let local = LocalIdentity {
            participant_id: Some("p9".to_string()),
            display_name: "Eve".to_string(),
            is_host: false,
        };

        let roster = reconcile(&list, &local, &MeetingRecord::new("m-1"), &BTreeSet::new());
        let ids: Vec<&str> = roster.iter().map(|e| e.participant_id.as_str()).collect();
        assert_eq!(ids, vec!["p3", "p2", "p4"]);
    }

    #[test]
    fn test_non_host_marks_local_row() {
        let list = vec![participant("p1", "Alice"), participant("p2", "Bob")];
        let local = LocalIdentity {
            participant_id: Some("p2".to_string()),
            display_name: "Bob".to_string(),
            is_host: false,
        };

        let roster = reconcile(&list, &local, &MeetingRecord::new("m-1"), &BTreeSet::new());
        assert!(!roster.first().unwrap().is_local);
        assert!(roster.get(1).unwrap().is_local);
    }
}
