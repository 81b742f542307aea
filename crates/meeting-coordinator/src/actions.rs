//! Action delegation queue.
//!
//! The conferencing engine only lets the authoritative (host) client invoke
//! privileged commands. Everyone else delegates: the requester appends a
//! `Pending` record to the per-meeting action log and returns immediately;
//! the host's [`ActionExecutor`] consumes the insert stream, drives the
//! engine, and writes the terminal status back.
//!
//! Processing is at-most-once per record id. The notification transport may
//! deliver duplicates, and the executor replays all pending records when it
//! (re)activates; the processed-id set guards both.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::engine::{ConferenceEngine, EngineCommand, RecordingMode};
use crate::metrics::CoordinatorMetrics;
use crate::store::{ActionOutcome, ActionRecord, ActionStatus, ActionType, MeetingStore};

/// Append an action to the meeting's log without blocking the caller.
///
/// The requester-side contract: the write is issued asynchronously and the
/// intent is acknowledged immediately. A failed insert is logged and
/// swallowed; there is no retry beyond the user trying again.
pub fn enqueue(store: Arc<dyn MeetingStore>, action: ActionRecord) {
    tokio::spawn(async move {
        let meeting_id = action.meeting_id.clone();
        let kind = action.kind;
        if let Err(e) = store.insert_action(action).await {
            warn!(
                target: "coord.actions",
                meeting_id = %meeting_id,
                kind = ?kind,
                error = %e,
                "Failed to enqueue action"
            );
        }
    });
}

/// Map an action record to the engine command it stands for.
///
/// Returns an error string (destined for the record's `error` field) when
/// the record is missing the fields its kind requires.
pub fn command_for_action(action: &ActionRecord) -> Result<EngineCommand, String> {
    match action.kind {
        ActionType::Kick => action
            .target_participant_id
            .clone()
            .map(|participant_id| EngineCommand::KickParticipant { participant_id })
            .ok_or_else(|| "kick action missing target".to_string()),
        ActionType::Mute => action
            .target_participant_id
            .clone()
            .map(|participant_id| EngineCommand::MuteParticipant { participant_id })
            .ok_or_else(|| "mute action missing target".to_string()),
        ActionType::MuteEveryone => Ok(EngineCommand::MuteEveryone),
        ActionType::RecordingStart => Ok(EngineCommand::StartRecording {
            mode: RecordingMode::File,
            youtube_stream_key: None,
            rtmp_stream_key: None,
            rtmp_stream_url: None,
        }),
        ActionType::RecordingStop => Ok(EngineCommand::StopRecording {
            mode: RecordingMode::File,
        }),
        ActionType::StreamStart => match (&action.platform, &action.stream_key, &action.rtmp_url) {
            (Some(platform), Some(key), _) if platform == "youtube" => {
                Ok(EngineCommand::StartRecording {
                    mode: RecordingMode::Stream,
                    youtube_stream_key: Some(key.clone()),
                    rtmp_stream_key: None,
                    rtmp_stream_url: None,
                })
            }
            (_, Some(key), Some(url)) => Ok(EngineCommand::StartRecording {
                mode: RecordingMode::Stream,
                youtube_stream_key: None,
                rtmp_stream_key: Some(key.clone()),
                rtmp_stream_url: Some(url.clone()),
            }),
            _ => Err("stream action missing stream key or rtmp url".to_string()),
        },
        ActionType::StreamStop => Ok(EngineCommand::StopRecording {
            mode: RecordingMode::Stream,
        }),
    }
}

/// The host-only consumer of the action log.
///
/// Modeled as an explicitly role-gated task: the coordinator spawns it if
/// and only if the local client is the authoritative host, and cancels it
/// cleanly if that status changes. On activation it first replays every
/// record still pending (closing the gap left by a host disconnect), then
/// follows the live insert stream.
pub struct ActionExecutor {
    meeting_id: String,
    engine: Arc<dyn ConferenceEngine>,
    store: Arc<dyn MeetingStore>,
    cancel_token: CancellationToken,
    metrics: Arc<CoordinatorMetrics>,
    /// Record ids already acted on. Guards duplicate delivery and the
    /// overlap between replay and the live stream.
    processed: HashSet<Uuid>,
}

impl ActionExecutor {
    /// Spawn the executor task.
    pub fn spawn(
        meeting_id: String,
        engine: Arc<dyn ConferenceEngine>,
        store: Arc<dyn MeetingStore>,
        cancel_token: CancellationToken,
        metrics: Arc<CoordinatorMetrics>,
    ) -> JoinHandle<()> {
        let executor = Self {
            meeting_id,
            engine,
            store,
            cancel_token,
            metrics,
            processed: HashSet::new(),
        };
        tokio::spawn(executor.run())
    }

    async fn run(mut self) {
        info!(
            target: "coord.actions",
            meeting_id = %self.meeting_id,
            "ActionExecutor started"
        );

        // Subscribe before the replay so inserts racing the replay are not
        // lost; the processed set absorbs the overlap.
        let mut inserts = self.store.subscribe_actions(&self.meeting_id);
        self.replay_pending().await;

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    break;
                }

                received = inserts.recv() => match received {
                    Ok(action) => self.process(action).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(
                            target: "coord.actions",
                            meeting_id = %self.meeting_id,
                            skipped,
                            "Insert stream lagged, replaying pending records"
                        );
                        self.replay_pending().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                },
            }
        }

        info!(
            target: "coord.actions",
            meeting_id = %self.meeting_id,
            processed = self.processed.len(),
            "ActionExecutor stopped"
        );
    }

    /// Fetch and process everything still pending.
    async fn replay_pending(&mut self) {
        match self.store.pending_actions(&self.meeting_id).await {
            Ok(pending) => {
                for action in pending {
                    self.process(action).await;
                }
            }
            Err(e) => {
                // Swallowed: the live stream and the next lag-triggered
                // replay will pick the records up.
                warn!(
                    target: "coord.actions",
                    meeting_id = %self.meeting_id,
                    error = %e,
                    "Failed to fetch pending actions"
                );
            }
        }
    }

    /// Process one record to a terminal status, at most once per id.
    async fn process(&mut self, action: ActionRecord) {
        if action.status != ActionStatus::Pending {
            return;
        }
        if !self.processed.insert(action.id) {
            self.metrics.record_duplicate_suppressed();
            debug!(
                target: "coord.actions",
                meeting_id = %self.meeting_id,
                action_id = %action.id,
                "Duplicate delivery suppressed"
            );
            return;
        }

        let outcome = match command_for_action(&action) {
            Ok(command) => match self.engine.execute(command) {
                Ok(()) => ActionOutcome::done(),
                Err(e) => {
                    self.metrics.record_action_failed();
                    ActionOutcome::error(e.to_string())
                }
            },
            Err(reason) => {
                self.metrics.record_action_failed();
                ActionOutcome::error(reason)
            }
        };

        self.metrics.record_action_processed();
        debug!(
            target: "coord.actions",
            meeting_id = %self.meeting_id,
            action_id = %action.id,
            kind = ?action.kind,
            status = ?outcome.status,
            "Action processed"
        );

        if let Err(e) = self.store.update_action(action.id, outcome).await {
            warn!(
                target: "coord.actions",
                meeting_id = %self.meeting_id,
                action_id = %action.id,
                error = %e,
                "Failed to write action outcome"
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_kick_maps_to_kick_command() {
        let action = ActionRecord::new("m-1", ActionType::Kick).with_target("p7");
        assert_eq!(
            command_for_action(&action),
            Ok(EngineCommand::KickParticipant {
                participant_id: "p7".to_string()
            })
        );
    }

    #[test]
    fn test_kick_without_target_is_an_error() {
        let action = ActionRecord::new("m-1", ActionType::Kick);
        assert!(command_for_action(&action).is_err());
    }

    #[test]
    fn test_mute_maps_to_mute_command() {
        let action = ActionRecord::new("m-1", ActionType::Mute).with_target("p7");
        assert_eq!(
            command_for_action(&action),
            Ok(EngineCommand::MuteParticipant {
                participant_id: "p7".to_string()
            })
        );
    }

    #[test]
    fn test_recording_actions_use_file_mode() {
        let start = ActionRecord::new("m-1", ActionType::RecordingStart);
        assert!(matches!(
            command_for_action(&start),
            Ok(EngineCommand::StartRecording {
                mode: RecordingMode::File,
                ..
            })
        ));

        let stop = ActionRecord::new("m-1", ActionType::RecordingStop);
        assert_eq!(
            command_for_action(&stop),
            Ok(EngineCommand::StopRecording {
                mode: RecordingMode::File
            })
        );
    }

    #[test]
    fn test_youtube_stream_uses_youtube_key() {
        let action = ActionRecord::new("m-1", ActionType::StreamStart)
            .with_stream("youtube", "yt-key", None);
        assert_eq!(
            command_for_action(&action),
            Ok(EngineCommand::StartRecording {
                mode: RecordingMode::Stream,
                youtube_stream_key: Some("yt-key".to_string()),
                rtmp_stream_key: None,
                rtmp_stream_url: None,
            })
        );
    }

    #[test]
    fn test_rtmp_stream_requires_key_and_url() {
        let action = ActionRecord::new("m-1", ActionType::StreamStart).with_stream(
            "custom",
            "rtmp-key",
            Some("rtmp://ingest.example.com/live".to_string()),
        );
        assert_eq!(
            command_for_action(&action),
            Ok(EngineCommand::StartRecording {
                mode: RecordingMode::Stream,
                youtube_stream_key: None,
                rtmp_stream_key: Some("rtmp-key".to_string()),
                rtmp_stream_url: Some("rtmp://ingest.example.com/live".to_string()),
            })
        );

        let missing_url = ActionRecord::new("m-1", ActionType::StreamStart);
        assert!(command_for_action(&missing_url).is_err());
    }

    #[test]
    fn test_stream_stop_uses_stream_mode() {
        let action = ActionRecord::new("m-1", ActionType::StreamStop);
        assert_eq!(
            command_for_action(&action),
            Ok(EngineCommand::StopRecording {
                mode: RecordingMode::Stream
            })
        );
    }
}
