//! In-memory meeting record store for coordinator tests.
//!
//! Implements the full [`MeetingStore`] surface over process memory:
//! meeting records, the append-only action log, and broadcast change
//! notifications per meeting. Duplicate delivery can be injected to
//! exercise the coordinator's idempotence guards.
//!
//! # Example
//!
//! ```rust,ignore
//! use coord_test_utils::{fixtures, MemoryStore};
//!
//! let store = MemoryStore::new();
//! store.seed_record(fixtures::hosted_meeting("m-1", "host-token"));
//! store.set_duplicate_action_delivery(true);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use meeting_coordinator::store::{
    ActionOutcome, ActionRecord, ActionStatus, MeetingRecord, MeetingStore, RecordChange,
    RecordUpdate, StoreError,
};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Notification channel capacity; large enough that tests never lag.
const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Default)]
struct MemoryStoreInner {
    /// Meeting records by meeting id.
    records: HashMap<String, MeetingRecord>,
    /// Append-only action log, insertion order.
    actions: Vec<ActionRecord>,
    /// Record change channels by meeting id.
    record_channels: HashMap<String, broadcast::Sender<RecordChange>>,
    /// Action insert channels by meeting id.
    action_channels: HashMap<String, broadcast::Sender<ActionRecord>>,
    /// When true, every action insert is notified twice.
    duplicate_action_delivery: bool,
}

impl MemoryStoreInner {
    fn record_channel(&mut self, meeting_id: &str) -> broadcast::Sender<RecordChange> {
        self.record_channels
            .entry(meeting_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }

    fn action_channel(&mut self, meeting_id: &str) -> broadcast::Sender<ActionRecord> {
        self.action_channels
            .entry(meeting_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

/// In-memory record store shared by every client in a test.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a meeting record without notifying subscribers.
    pub fn seed_record(&self, record: MeetingRecord) {
        let mut inner = self.inner.lock().expect("memory store lock poisoned");
        inner.records.insert(record.meeting_id.clone(), record);
    }

    /// Current state of a meeting record.
    #[must_use]
    pub fn record(&self, meeting_id: &str) -> Option<MeetingRecord> {
        self.inner
            .lock()
            .expect("memory store lock poisoned")
            .records
            .get(meeting_id)
            .cloned()
    }

    /// The full action log for a meeting, insertion order.
    #[must_use]
    pub fn actions(&self, meeting_id: &str) -> Vec<ActionRecord> {
        self.inner
            .lock()
            .expect("memory store lock poisoned")
            .actions
            .iter()
            .filter(|a| a.meeting_id == meeting_id)
            .cloned()
            .collect()
    }

    /// One action by id.
    #[must_use]
    pub fn action(&self, action_id: Uuid) -> Option<ActionRecord> {
        self.inner
            .lock()
            .expect("memory store lock poisoned")
            .actions
            .iter()
            .find(|a| a.id == action_id)
            .cloned()
    }

    /// Deliver every future action insert notification twice.
    pub fn set_duplicate_action_delivery(&self, duplicate: bool) {
        self.inner
            .lock()
            .expect("memory store lock poisoned")
            .duplicate_action_delivery = duplicate;
    }

    /// Re-send the current record state as a change notification, as a
    /// transport that duplicates deliveries would.
    pub fn renotify_record(&self, meeting_id: &str) {
        let mut inner = self.inner.lock().expect("memory store lock poisoned");
        if let Some(record) = inner.records.get(meeting_id).cloned() {
            let channel = inner.record_channel(meeting_id);
            let _ = channel.send(RecordChange {
                new: record.clone(),
                old: Some(record),
            });
        }
    }

    /// Insert an action directly, bypassing notification. Used to stage
    /// pending records that predate an executor's activation.
    pub fn stage_action(&self, action: ActionRecord) {
        self.inner
            .lock()
            .expect("memory store lock poisoned")
            .actions
            .push(action);
    }
}

#[async_trait]
impl MeetingStore for MemoryStore {
    async fn fetch_record(&self, meeting_id: &str) -> Result<MeetingRecord, StoreError> {
        self.inner
            .lock()
            .expect("memory store lock poisoned")
            .records
            .get(meeting_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(meeting_id.to_string()))
    }

    async fn update_record(
        &self,
        meeting_id: &str,
        update: RecordUpdate,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("memory store lock poisoned");
        let old = inner
            .records
            .get(meeting_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(meeting_id.to_string()))?;

        let mut new = old.clone();
        update.apply(&mut new);
        inner.records.insert(meeting_id.to_string(), new.clone());

        let channel = inner.record_channel(meeting_id);
        let _ = channel.send(RecordChange {
            new,
            old: Some(old),
        });
        Ok(())
    }

    async fn insert_action(&self, action: ActionRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("memory store lock poisoned");
        inner.actions.push(action.clone());

        let duplicate = inner.duplicate_action_delivery;
        let channel = inner.action_channel(&action.meeting_id);
        let _ = channel.send(action.clone());
        if duplicate {
            let _ = channel.send(action);
        }
        Ok(())
    }

    async fn update_action(
        &self,
        action_id: Uuid,
        outcome: ActionOutcome,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("memory store lock poisoned");
        let action = inner
            .actions
            .iter_mut()
            .find(|a| a.id == action_id)
            .ok_or_else(|| StoreError::NotFound(action_id.to_string()))?;

        action.status = outcome.status;
        action.processed_at = Some(outcome.processed_at);
        action.error = outcome.error;
        Ok(())
    }

    async fn pending_actions(&self, meeting_id: &str) -> Result<Vec<ActionRecord>, StoreError> {
        Ok(self
            .inner
            .lock()
            .expect("memory store lock poisoned")
            .actions
            .iter()
            .filter(|a| a.meeting_id == meeting_id && a.status == ActionStatus::Pending)
            .cloned()
            .collect())
    }

    fn subscribe_record(&self, meeting_id: &str) -> broadcast::Receiver<RecordChange> {
        self.inner
            .lock()
            .expect("memory store lock poisoned")
            .record_channel(meeting_id)
            .subscribe()
    }

    fn subscribe_actions(&self, meeting_id: &str) -> broadcast::Receiver<ActionRecord> {
        self.inner
            .lock()
            .expect("memory store lock poisoned")
            .action_channel(meeting_id)
            .subscribe()
    }
}
