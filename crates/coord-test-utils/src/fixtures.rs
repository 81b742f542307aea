//! Pre-configured test data for coordinator tests.

use std::collections::HashMap;

use meeting_coordinator::config::CoordinatorConfig;
use meeting_coordinator::engine::{EngineParticipant, MODERATOR_ROLE};
use meeting_coordinator::store::MeetingRecord;

/// A plain remote participant.
#[must_use]
pub fn participant(participant_id: &str, display_name: &str) -> EngineParticipant {
    EngineParticipant {
        participant_id: participant_id.to_string(),
        display_name: display_name.to_string(),
        ..EngineParticipant::default()
    }
}

/// A participant the engine itself reports as moderator.
#[must_use]
pub fn moderator(participant_id: &str, display_name: &str) -> EngineParticipant {
    EngineParticipant {
        participant_id: participant_id.to_string(),
        display_name: display_name.to_string(),
        is_moderator: true,
        role: Some(MODERATOR_ROLE.to_string()),
        ..EngineParticipant::default()
    }
}

/// An empty meeting record.
#[must_use]
pub fn meeting_record(meeting_id: &str) -> MeetingRecord {
    MeetingRecord::new(meeting_id)
}

/// A meeting record carrying a host token, as minted at meeting creation.
#[must_use]
pub fn hosted_meeting(meeting_id: &str, host_token: &str) -> MeetingRecord {
    let mut record = MeetingRecord::new(meeting_id);
    record.host_token = Some(host_token.to_string());
    record
}

/// A coordinator config with dummy credentials and default tunables.
#[must_use]
pub fn test_config() -> CoordinatorConfig {
    let vars = HashMap::from([
        (
            "QUORUM_STORE_URL".to_string(),
            "https://records.test.invalid".to_string(),
        ),
        (
            "QUORUM_STORE_API_KEY".to_string(),
            "test-api-key".to_string(),
        ),
    ]);
    CoordinatorConfig::from_vars(&vars).expect("test config should load")
}

/// A test config with a custom debounce, for timing-sensitive tests.
#[must_use]
pub fn test_config_with_debounce_ms(debounce_ms: u64) -> CoordinatorConfig {
    let vars = HashMap::from([
        (
            "QUORUM_STORE_URL".to_string(),
            "https://records.test.invalid".to_string(),
        ),
        (
            "QUORUM_STORE_API_KEY".to_string(),
            "test-api-key".to_string(),
        ),
        (
            "QUORUM_ROSTER_DEBOUNCE_MS".to_string(),
            debounce_ms.to_string(),
        ),
    ]);
    CoordinatorConfig::from_vars(&vars).expect("test config should load")
}
