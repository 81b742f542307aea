//! `SessionCoordinator` - per-meeting client actor.
//!
//! Each client runs one `SessionCoordinator` per joined meeting. The actor:
//! - Owns the local view of the meeting record and the derived roster
//! - Multiplexes the engine event stream, the record change stream, the
//!   roster debounce timer and the periodic refresh in one select loop
//! - Supervises the host-only [`ActionExecutor`] (role-gated: active if and
//!   only if local authority says "I am the host")
//! - Publishes [`CoordinatorEvent`]s to the embedding UI layer
//!
//! All store writes are issued fire-and-forget from the loop's perspective:
//! a user intent is acknowledged before the network round trip completes,
//! and failures surface (at most) as an [`CoordinatorEvent::IntentFailed`]
//! toast. State converges from the next change notification.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::actions::{self, ActionExecutor};
use crate::admin::{self, AdminSync, LocalStanding};
use crate::config::CoordinatorConfig;
use crate::engine::{ConferenceEngine, EngineCommand, EngineEvent, MODERATOR_ROLE};
use crate::errors::CoordError;
use crate::metrics::CoordinatorMetrics;
use crate::normalize::ParticipantKey;
use crate::roster::{self, LocalIdentity, RosterEntry};
use crate::store::{
    ActionRecord, ActionType, MeetingRecord, MeetingStore, RecordChange, RecordUpdate, StoreError,
};
use crate::whiteboard::WhiteboardSync;

/// Default channel buffer size for the coordinator mailbox.
const COORDINATOR_CHANNEL_BUFFER: usize = 200;

/// Events published to the embedding UI layer.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatorEvent {
    /// The derived roster changed.
    RosterUpdated(Vec<RosterEntry>),
    /// The local client's admin status changed.
    RoleUpdated { is_admin: bool },
    /// The local display name was banned: the session has been torn down
    /// and the UI must leave the meeting page.
    Banned,
    /// The shared whiteboard state transitioned.
    WhiteboardOpenChanged(bool),
    /// A fire-and-forget intent failed; suitable for a toast.
    IntentFailed { intent: &'static str },
}

/// Stream destination for a delegated or direct stream start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamTarget {
    /// "youtube" or a label for a bare RTMP endpoint.
    pub platform: String,
    /// Stream key.
    pub stream_key: String,
    /// RTMP ingest URL for non-YouTube targets.
    pub rtmp_url: Option<String>,
}

/// Messages accepted by the coordinator mailbox.
enum CoordinatorMessage {
    ToggleAudio {
        respond_to: oneshot::Sender<Result<(), CoordError>>,
    },
    ToggleVideo {
        respond_to: oneshot::Sender<Result<(), CoordError>>,
    },
    Promote {
        participant_id: String,
        display_name: String,
        respond_to: oneshot::Sender<Result<(), CoordError>>,
    },
    Demote {
        participant_id: String,
        display_name: String,
        respond_to: oneshot::Sender<Result<(), CoordError>>,
    },
    Ban {
        display_name: String,
        respond_to: oneshot::Sender<Result<(), CoordError>>,
    },
    Kick {
        participant_id: String,
        respond_to: oneshot::Sender<Result<(), CoordError>>,
    },
    MuteParticipant {
        participant_id: String,
        respond_to: oneshot::Sender<Result<(), CoordError>>,
    },
    AskToUnmute {
        participant_id: String,
        respond_to: oneshot::Sender<Result<(), CoordError>>,
    },
    MuteEveryone {
        respond_to: oneshot::Sender<Result<(), CoordError>>,
    },
    ToggleWhiteboard {
        respond_to: oneshot::Sender<Result<(), CoordError>>,
    },
    StartRecording {
        respond_to: oneshot::Sender<Result<(), CoordError>>,
    },
    StopRecording {
        respond_to: oneshot::Sender<Result<(), CoordError>>,
    },
    StartStream {
        target: StreamTarget,
        respond_to: oneshot::Sender<Result<(), CoordError>>,
    },
    StopStream {
        respond_to: oneshot::Sender<Result<(), CoordError>>,
    },
    GetRoster {
        respond_to: oneshot::Sender<Vec<RosterEntry>>,
    },
    GetStanding {
        respond_to: oneshot::Sender<LocalStanding>,
    },
}

/// Handle to a `SessionCoordinator`.
#[derive(Clone)]
pub struct CoordinatorHandle {
    sender: mpsc::Sender<CoordinatorMessage>,
    events: broadcast::Sender<CoordinatorEvent>,
    cancel_token: CancellationToken,
    meeting_id: String,
    metrics: Arc<CoordinatorMetrics>,
}

impl CoordinatorHandle {
    /// Get the meeting ID.
    #[must_use]
    pub fn meeting_id(&self) -> &str {
        &self.meeting_id
    }

    /// Shared coordinator metrics.
    #[must_use]
    pub fn metrics(&self) -> &CoordinatorMetrics {
        &self.metrics
    }

    /// Subscribe to UI events.
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.events.subscribe()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> CoordinatorMessage,
    ) -> Result<T, CoordError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|e| CoordError::Internal(format!("channel send failed: {e}")))?;
        rx.await
            .map_err(|e| CoordError::Internal(format!("response receive failed: {e}")))
    }

    /// Toggle the local microphone (unprivileged).
    pub async fn toggle_audio(&self) -> Result<(), CoordError> {
        self.request(|respond_to| CoordinatorMessage::ToggleAudio { respond_to })
            .await?
    }

    /// Toggle the local camera (unprivileged).
    pub async fn toggle_video(&self) -> Result<(), CoordError> {
        self.request(|respond_to| CoordinatorMessage::ToggleVideo { respond_to })
            .await?
    }

    /// Promote a participant to admin.
    pub async fn promote(
        &self,
        participant_id: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Result<(), CoordError> {
        let participant_id = participant_id.into();
        let display_name = display_name.into();
        self.request(|respond_to| CoordinatorMessage::Promote {
            participant_id,
            display_name,
            respond_to,
        })
        .await?
    }

    /// Demote a participant.
    pub async fn demote(
        &self,
        participant_id: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Result<(), CoordError> {
        let participant_id = participant_id.into();
        let display_name = display_name.into();
        self.request(|respond_to| CoordinatorMessage::Demote {
            participant_id,
            display_name,
            respond_to,
        })
        .await?
    }

    /// Ban a display name from the meeting.
    pub async fn ban(&self, display_name: impl Into<String>) -> Result<(), CoordError> {
        let display_name = display_name.into();
        self.request(|respond_to| CoordinatorMessage::Ban {
            display_name,
            respond_to,
        })
        .await?
    }

    /// Kick a participant (directly, or via the delegation queue).
    pub async fn kick(&self, participant_id: impl Into<String>) -> Result<(), CoordError> {
        let participant_id = participant_id.into();
        self.request(|respond_to| CoordinatorMessage::Kick {
            participant_id,
            respond_to,
        })
        .await?
    }

    /// Force-mute a participant.
    pub async fn mute_participant(
        &self,
        participant_id: impl Into<String>,
    ) -> Result<(), CoordError> {
        let participant_id = participant_id.into();
        self.request(|respond_to| CoordinatorMessage::MuteParticipant {
            participant_id,
            respond_to,
        })
        .await?
    }

    /// Ask a muted participant to unmute (direct-authority only).
    pub async fn ask_to_unmute(&self, participant_id: impl Into<String>) -> Result<(), CoordError> {
        let participant_id = participant_id.into();
        self.request(|respond_to| CoordinatorMessage::AskToUnmute {
            participant_id,
            respond_to,
        })
        .await?
    }

    /// Mute every participant.
    pub async fn mute_everyone(&self) -> Result<(), CoordError> {
        self.request(|respond_to| CoordinatorMessage::MuteEveryone { respond_to })
            .await?
    }

    /// Toggle the shared whiteboard.
    pub async fn toggle_whiteboard(&self) -> Result<(), CoordError> {
        self.request(|respond_to| CoordinatorMessage::ToggleWhiteboard { respond_to })
            .await?
    }

    /// Start a file recording.
    pub async fn start_recording(&self) -> Result<(), CoordError> {
        self.request(|respond_to| CoordinatorMessage::StartRecording { respond_to })
            .await?
    }

    /// Stop the file recording.
    pub async fn stop_recording(&self) -> Result<(), CoordError> {
        self.request(|respond_to| CoordinatorMessage::StopRecording { respond_to })
            .await?
    }

    /// Start a live stream.
    pub async fn start_stream(&self, target: StreamTarget) -> Result<(), CoordError> {
        self.request(|respond_to| CoordinatorMessage::StartStream { target, respond_to })
            .await?
    }

    /// Stop the live stream.
    pub async fn stop_stream(&self) -> Result<(), CoordError> {
        self.request(|respond_to| CoordinatorMessage::StopStream { respond_to })
            .await?
    }

    /// Current derived roster.
    pub async fn roster(&self) -> Result<Vec<RosterEntry>, CoordError> {
        self.request(|respond_to| CoordinatorMessage::GetRoster { respond_to })
            .await
    }

    /// Current local standing (admin, banned).
    pub async fn standing(&self) -> Result<LocalStanding, CoordError> {
        self.request(|respond_to| CoordinatorMessage::GetStanding { respond_to })
            .await
    }

    /// Cancel the coordinator.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Check if the coordinator is cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

/// Supervised host-only executor task.
struct ExecutorHandle {
    cancel_token: CancellationToken,
    #[allow(dead_code)] // held so the task can be observed during shutdown
    task: JoinHandle<()>,
}

/// The `SessionCoordinator` implementation.
pub struct SessionCoordinator {
    meeting_id: String,
    display_name: String,
    is_host: bool,
    receiver: mpsc::Receiver<CoordinatorMessage>,
    events: broadcast::Sender<CoordinatorEvent>,
    cancel_token: CancellationToken,
    engine: Arc<dyn ConferenceEngine>,
    store: Arc<dyn MeetingStore>,
    admin: AdminSync,
    metrics: Arc<CoordinatorMetrics>,
    /// Last known meeting record.
    record: MeetingRecord,
    /// Local session id, cached from the engine's conference-joined event.
    local_participant_id: Option<String>,
    /// Session ids reported as moderators by engine role-change events.
    engine_role_moderators: BTreeSet<String>,
    /// Edge-triggered whiteboard cache.
    whiteboard: WhiteboardSync,
    /// Local standing derived from the last record snapshot.
    standing: LocalStanding,
    /// Whether the ban teardown already ran (it must run exactly once).
    banned_teardown_done: bool,
    /// Cached roster from the last reconciliation pass.
    roster: Vec<RosterEntry>,
    /// Deadline of the pending debounced reconciliation, if any.
    reconcile_at: Option<Instant>,
    /// Debounce interval.
    roster_debounce: std::time::Duration,
    /// Periodic refresh interval.
    roster_refresh: std::time::Duration,
    /// The role-gated executor, when active.
    executor: Option<ExecutorHandle>,
}

impl SessionCoordinator {
    /// Join a meeting and spawn its coordinator.
    ///
    /// Fetches the meeting record, refuses entry when the local normalized
    /// name is already banned, resolves host authority from the presented
    /// host token, and spawns the actor.
    pub async fn join(
        meeting_id: impl Into<String>,
        display_name: impl Into<String>,
        host_token: Option<String>,
        engine: Arc<dyn ConferenceEngine>,
        store: Arc<dyn MeetingStore>,
        config: &CoordinatorConfig,
    ) -> Result<(CoordinatorHandle, JoinHandle<()>), CoordError> {
        let meeting_id = meeting_id.into();
        let display_name = display_name.into();

        let record = store.fetch_record(&meeting_id).await.map_err(|e| match e {
            StoreError::NotFound(_) => CoordError::MeetingNotFound(meeting_id.clone()),
            other => CoordError::Store(other),
        })?;

        if record.is_banned(&ParticipantKey::name(&display_name)) {
            return Err(CoordError::Banned);
        }

        let is_host = match (&host_token, &record.host_token) {
            (Some(presented), Some(expected)) => presented == expected,
            _ => false,
        };

        let (sender, receiver) = mpsc::channel(COORDINATOR_CHANNEL_BUFFER);
        let (events, _) = broadcast::channel(config.event_buffer);
        let cancel_token = CancellationToken::new();
        let metrics = CoordinatorMetrics::new();

        let admin = AdminSync::new(meeting_id.as_str(), Arc::clone(&engine), Arc::clone(&store));

        let actor = Self {
            meeting_id: meeting_id.clone(),
            display_name,
            is_host,
            receiver,
            events: events.clone(),
            cancel_token: cancel_token.clone(),
            engine,
            store,
            admin,
            metrics,
            record,
            local_participant_id: None,
            engine_role_moderators: BTreeSet::new(),
            whiteboard: WhiteboardSync::new(),
            standing: LocalStanding::default(),
            banned_teardown_done: false,
            roster: Vec::new(),
            reconcile_at: None,
            roster_debounce: config.roster_debounce,
            roster_refresh: config.roster_refresh,
            executor: None,
        };

        let metrics = Arc::clone(&actor.metrics);
        let task_handle = tokio::spawn(actor.run());

        let handle = CoordinatorHandle {
            sender,
            events,
            cancel_token,
            meeting_id,
            metrics,
        };

        Ok((handle, task_handle))
    }

    /// Run the actor loop.
    #[instrument(skip_all, name = "coord.actor", fields(meeting_id = %self.meeting_id))]
    async fn run(mut self) {
        info!(
            target: "coord.actor",
            meeting_id = %self.meeting_id,
            is_host = self.is_host,
            "SessionCoordinator started"
        );

        let mut engine_events = self.engine.subscribe();
        let mut record_changes = self.store.subscribe_record(&self.meeting_id);
        let mut engine_stream_open = true;
        let mut record_stream_open = true;

        let mut refresh = tokio::time::interval(self.roster_refresh);
        refresh.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The interval fires immediately once; fold that into startup.
        refresh.tick().await;

        // The engine may have reported the local id before we subscribed.
        if let Some(id) = self.engine.local_participant_id() {
            self.on_local_id_learned(id);
        }

        // Converge on the record fetched at join time (standing, whiteboard,
        // executor activation), then render the first roster.
        let initial = self.record.clone();
        self.apply_record(initial);
        self.reconcile();

        loop {
            let reconcile_at = self.reconcile_at;
            let debounce = async move {
                match reconcile_at {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    self.shutdown();
                    break;
                }

                maybe_message = self.receiver.recv() => {
                    match maybe_message {
                        Some(message) => self.handle_message(message),
                        None => {
                            info!(
                                target: "coord.actor",
                                meeting_id = %self.meeting_id,
                                "Coordinator channel closed, exiting"
                            );
                            self.shutdown();
                            break;
                        }
                    }
                }

                () = debounce => {
                    self.reconcile_at = None;
                    self.reconcile();
                }

                _ = refresh.tick() => {
                    self.reconcile();
                }

                event = engine_events.recv(), if engine_stream_open => {
                    match event {
                        Ok(event) => self.handle_engine_event(event),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(
                                target: "coord.actor",
                                meeting_id = %self.meeting_id,
                                skipped,
                                "Engine event stream lagged"
                            );
                            self.schedule_reconcile();
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            engine_stream_open = false;
                        }
                    }
                }

                change = record_changes.recv(), if record_stream_open => {
                    match change {
                        Ok(change) => self.handle_record_change(change),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            // Missed snapshots are recovered by the next
                            // delivery; state is re-derived wholesale.
                            warn!(
                                target: "coord.actor",
                                meeting_id = %self.meeting_id,
                                skipped,
                                "Record change stream lagged"
                            );
                            self.schedule_reconcile();
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            record_stream_open = false;
                        }
                    }
                }
            }
        }

        info!(
            target: "coord.actor",
            meeting_id = %self.meeting_id,
            reconciliations = self.metrics.reconciliations(),
            "SessionCoordinator stopped"
        );
    }

    /// Whether the local client can invoke privileged engine commands
    /// directly: the host always can; a promoted admin can once the engine
    /// has granted it moderator rights.
    fn direct_authority(&self) -> bool {
        self.is_host
            || self
                .local_participant_id
                .as_ref()
                .is_some_and(|id| self.engine_role_moderators.contains(id))
    }

    /// Meeting-level authority check for privileged intents.
    fn require_admin(&self) -> Result<(), CoordError> {
        if self.standing.is_admin {
            Ok(())
        } else {
            Err(CoordError::PermissionDenied(
                "Moderator authority required".to_string(),
            ))
        }
    }

    /// Execute a privileged operation: directly when the engine grants us
    /// the authority, otherwise through the delegation queue.
    fn privileged(
        &self,
        kind: ActionType,
        target: Option<String>,
        stream: Option<StreamTarget>,
    ) -> Result<(), CoordError> {
        self.require_admin()?;

        let mut action = ActionRecord::new(self.meeting_id.as_str(), kind);
        if let Some(target) = target {
            action = action.with_target(target);
        }
        if let Some(stream) = stream {
            action = action.with_stream(stream.platform, stream.stream_key, stream.rtmp_url);
        }

        if self.direct_authority() {
            match actions::command_for_action(&action) {
                Ok(command) => {
                    // Direct-path engine errors are silently ignored; the
                    // next snapshot corrects any divergence.
                    if let Err(e) = self.engine.execute(command) {
                        debug!(
                            target: "coord.actor",
                            meeting_id = %self.meeting_id,
                            kind = ?kind,
                            error = %e,
                            "Direct engine command failed"
                        );
                    }
                }
                Err(reason) => return Err(CoordError::Internal(reason)),
            }
        } else {
            if let Some(id) = &self.local_participant_id {
                action = action.with_requested_by(id.clone());
            }
            actions::enqueue(Arc::clone(&self.store), action);
        }
        Ok(())
    }

    /// Dispatch a local, unprivileged media command. Engine rejections are
    /// not surfaced; the engine's own event stream is the source of truth
    /// for mute state.
    fn local_media(&self, command: EngineCommand) {
        if let Err(e) = self.engine.execute(command) {
            debug!(
                target: "coord.actor",
                meeting_id = %self.meeting_id,
                error = %e,
                "Local media command failed"
            );
        }
    }

    /// Handle one mailbox message.
    fn handle_message(&mut self, message: CoordinatorMessage) {
        match message {
            CoordinatorMessage::ToggleAudio { respond_to } => {
                self.local_media(EngineCommand::ToggleAudio);
                let _ = respond_to.send(Ok(()));
            }

            CoordinatorMessage::ToggleVideo { respond_to } => {
                self.local_media(EngineCommand::ToggleVideo);
                let _ = respond_to.send(Ok(()));
            }

            CoordinatorMessage::Promote {
                participant_id,
                display_name,
                respond_to,
            } => {
                let result = self.require_admin();
                if result.is_ok() {
                    self.spawn_admin_write(AdminWrite::Promote {
                        participant_id,
                        display_name,
                    });
                }
                let _ = respond_to.send(result);
            }

            CoordinatorMessage::Demote {
                participant_id,
                display_name,
                respond_to,
            } => {
                let result = self.require_admin();
                if result.is_ok() {
                    self.spawn_admin_write(AdminWrite::Demote {
                        participant_id,
                        display_name,
                    });
                }
                let _ = respond_to.send(result);
            }

            CoordinatorMessage::Ban {
                display_name,
                respond_to,
            } => {
                let result = self.require_admin();
                if result.is_ok() {
                    self.spawn_admin_write(AdminWrite::Ban { display_name });
                }
                let _ = respond_to.send(result);
            }

            CoordinatorMessage::Kick {
                participant_id,
                respond_to,
            } => {
                let result = self.privileged(ActionType::Kick, Some(participant_id), None);
                let _ = respond_to.send(result);
            }

            CoordinatorMessage::MuteParticipant {
                participant_id,
                respond_to,
            } => {
                let result = self.privileged(ActionType::Mute, Some(participant_id), None);
                let _ = respond_to.send(result);
            }

            CoordinatorMessage::AskToUnmute {
                participant_id,
                respond_to,
            } => {
                // No queue representation exists for this nudge; it is
                // meaningful only with direct authority.
                let result = self.require_admin().and_then(|()| {
                    if self.direct_authority() {
                        if let Err(e) = self
                            .engine
                            .execute(EngineCommand::AskToUnmute { participant_id })
                        {
                            debug!(
                                target: "coord.actor",
                                meeting_id = %self.meeting_id,
                                error = %e,
                                "Ask-to-unmute failed"
                            );
                        }
                        Ok(())
                    } else {
                        Err(CoordError::PermissionDenied(
                            "Engine moderator rights required".to_string(),
                        ))
                    }
                });
                let _ = respond_to.send(result);
            }

            CoordinatorMessage::MuteEveryone { respond_to } => {
                let result = self.privileged(ActionType::MuteEveryone, None, None);
                let _ = respond_to.send(result);
            }

            CoordinatorMessage::ToggleWhiteboard { respond_to } => {
                let result = self.require_admin();
                if result.is_ok() {
                    // Write the negation of the last-known value; the local
                    // cache only moves when the change notification echoes
                    // back, which is what keeps the sync edge-triggered.
                    let target = self.whiteboard.toggle_target();
                    let store = Arc::clone(&self.store);
                    let meeting_id = self.meeting_id.clone();
                    let events = self.events.clone();
                    tokio::spawn(async move {
                        if let Err(e) = store
                            .update_record(&meeting_id, RecordUpdate::SetWhiteboardOpen(target))
                            .await
                        {
                            warn!(
                                target: "coord.whiteboard",
                                meeting_id = %meeting_id,
                                error = %e,
                                "Whiteboard toggle write failed"
                            );
                            let _ = events.send(CoordinatorEvent::IntentFailed {
                                intent: "toggle-whiteboard",
                            });
                        }
                    });
                }
                let _ = respond_to.send(result);
            }

            CoordinatorMessage::StartRecording { respond_to } => {
                let result = self.privileged(ActionType::RecordingStart, None, None);
                let _ = respond_to.send(result);
            }

            CoordinatorMessage::StopRecording { respond_to } => {
                let result = self.privileged(ActionType::RecordingStop, None, None);
                let _ = respond_to.send(result);
            }

            CoordinatorMessage::StartStream { target, respond_to } => {
                let result = self.privileged(ActionType::StreamStart, None, Some(target));
                let _ = respond_to.send(result);
            }

            CoordinatorMessage::StopStream { respond_to } => {
                let result = self.privileged(ActionType::StreamStop, None, None);
                let _ = respond_to.send(result);
            }

            CoordinatorMessage::GetRoster { respond_to } => {
                let _ = respond_to.send(self.roster.clone());
            }

            CoordinatorMessage::GetStanding { respond_to } => {
                let _ = respond_to.send(self.standing);
            }
        }
    }

    /// Spawn a fire-and-forget admin write; failures become toasts.
    fn spawn_admin_write(&self, write: AdminWrite) {
        let sync = self.admin.clone();
        let events = self.events.clone();
        let authority = self.direct_authority();
        let meeting_id = self.meeting_id.clone();
        tokio::spawn(async move {
            let (intent, result) = match write {
                AdminWrite::Promote {
                    participant_id,
                    display_name,
                } => (
                    "promote",
                    sync.promote(&participant_id, &display_name, authority)
                        .await,
                ),
                AdminWrite::Demote {
                    participant_id,
                    display_name,
                } => (
                    "demote",
                    sync.demote(&participant_id, &display_name, authority).await,
                ),
                AdminWrite::Ban { display_name } => ("ban", sync.ban(&display_name).await),
            };
            if let Err(e) = result {
                warn!(
                    target: "coord.admin",
                    meeting_id = %meeting_id,
                    intent,
                    error = %e,
                    "Admin write failed"
                );
                let _ = events.send(CoordinatorEvent::IntentFailed { intent });
            }
        });
    }

    /// Handle one engine event.
    fn handle_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::ConferenceJoined { participant_id } => {
                self.on_local_id_learned(participant_id);
                self.schedule_reconcile();
            }
            EngineEvent::RoleChanged {
                participant_id,
                role,
            } => {
                if role == MODERATOR_ROLE {
                    self.engine_role_moderators.insert(participant_id);
                } else {
                    self.engine_role_moderators.remove(&participant_id);
                }
                self.schedule_reconcile();
            }
            EngineEvent::ParticipantJoined { .. }
            | EngineEvent::ParticipantLeft { .. }
            | EngineEvent::DisplayNameChanged { .. }
            | EngineEvent::MuteStatusChanged { .. }
            | EngineEvent::ConferenceLeft => {
                self.schedule_reconcile();
            }
        }
    }

    /// Cache the engine-reported local id; the host also persists it as the
    /// fallback moderator signal for everyone else.
    fn on_local_id_learned(&mut self, participant_id: String) {
        if self.local_participant_id.as_deref() == Some(participant_id.as_str()) {
            return;
        }
        debug!(
            target: "coord.actor",
            meeting_id = %self.meeting_id,
            "Local participant id learned"
        );
        self.local_participant_id = Some(participant_id.clone());

        if self.is_host {
            let store = Arc::clone(&self.store);
            let meeting_id = self.meeting_id.clone();
            tokio::spawn(async move {
                if let Err(e) = store
                    .update_record(
                        &meeting_id,
                        RecordUpdate::SetHostParticipantId(participant_id),
                    )
                    .await
                {
                    warn!(
                        target: "coord.actor",
                        meeting_id = %meeting_id,
                        error = %e,
                        "Failed to persist host participant id"
                    );
                }
            });
        }
    }

    /// Handle one record change notification.
    fn handle_record_change(&mut self, change: RecordChange) {
        self.metrics.record_record_change();
        self.apply_record(change.new);
    }

    /// Re-derive all local state from a record snapshot.
    fn apply_record(&mut self, record: MeetingRecord) {
        self.record = record;

        let standing = admin::evaluate(
            &self.record,
            self.local_participant_id.as_deref(),
            &self.display_name,
            self.is_host,
        );
        if let Some(transition) = admin::role_transition(self.standing.is_admin, standing.is_admin)
        {
            info!(
                target: "coord.admin",
                meeting_id = %self.meeting_id,
                transition = ?transition,
                "Local admin status changed"
            );
            let _ = self.events.send(CoordinatorEvent::RoleUpdated {
                is_admin: standing.is_admin,
            });
        }
        self.standing = standing;

        if self.standing.is_banned && !self.banned_teardown_done {
            self.enforce_ban();
            return;
        }

        if self.whiteboard.observe(self.record.whiteboard_open) {
            self.metrics.record_whiteboard_toggle();
            if let Err(e) = self.engine.execute(EngineCommand::ToggleWhiteboard) {
                debug!(
                    target: "coord.whiteboard",
                    meeting_id = %self.meeting_id,
                    error = %e,
                    "Local whiteboard toggle failed"
                );
            }
            let _ = self.events.send(CoordinatorEvent::WhiteboardOpenChanged(
                self.record.whiteboard_open,
            ));
        }

        self.ensure_executor();
        self.schedule_reconcile();
    }

    /// Forced local session teardown. Runs exactly once, host included.
    fn enforce_ban(&mut self) {
        self.banned_teardown_done = true;
        warn!(
            target: "coord.actor",
            meeting_id = %self.meeting_id,
            "Local display name banned, tearing down session"
        );

        self.stop_executor();
        if let Err(e) = self.engine.execute(EngineCommand::HangUp) {
            debug!(
                target: "coord.actor",
                meeting_id = %self.meeting_id,
                error = %e,
                "Hang-up on ban failed"
            );
        }
        let _ = self.events.send(CoordinatorEvent::Banned);
        self.cancel_token.cancel();
    }

    /// Activate or deactivate the host-only action executor to match local
    /// authority. The action-log subscription exists if and only if this
    /// client is the authoritative host.
    fn ensure_executor(&mut self) {
        let should_run = self.is_host && !self.banned_teardown_done;
        match (&self.executor, should_run) {
            (None, true) => {
                let cancel_token = self.cancel_token.child_token();
                let task = ActionExecutor::spawn(
                    self.meeting_id.clone(),
                    Arc::clone(&self.engine),
                    Arc::clone(&self.store),
                    cancel_token.clone(),
                    Arc::clone(&self.metrics),
                );
                self.executor = Some(ExecutorHandle { cancel_token, task });
                info!(
                    target: "coord.actions",
                    meeting_id = %self.meeting_id,
                    "Action executor activated"
                );
            }
            (Some(_), false) => self.stop_executor(),
            _ => {}
        }
    }

    fn stop_executor(&mut self) {
        if let Some(executor) = self.executor.take() {
            executor.cancel_token.cancel();
            info!(
                target: "coord.actions",
                meeting_id = %self.meeting_id,
                "Action executor deactivated"
            );
        }
    }

    /// Coalesce roster recomputation: only the last scheduled pass in a
    /// burst actually runs.
    fn schedule_reconcile(&mut self) {
        self.reconcile_at = Some(Instant::now() + self.roster_debounce);
    }

    /// Recompute the roster wholesale and publish it when it changed.
    fn reconcile(&mut self) {
        self.metrics.record_reconciliation();

        let local = LocalIdentity {
            participant_id: self
                .local_participant_id
                .clone()
                .or_else(|| self.engine.local_participant_id()),
            display_name: self.display_name.clone(),
            is_host: self.is_host,
        };

        let snapshot = self.engine.participants();
        let roster = roster::reconcile(
            &snapshot,
            &local,
            &self.record,
            &self.engine_role_moderators,
        );

        if roster != self.roster {
            self.roster = roster.clone();
            let _ = self.events.send(CoordinatorEvent::RosterUpdated(roster));
        }
    }

    fn shutdown(&mut self) {
        self.stop_executor();
        debug!(
            target: "coord.actor",
            meeting_id = %self.meeting_id,
            "Coordinator shutdown complete"
        );
    }
}

/// Admin write dispatched off the actor loop.
enum AdminWrite {
    Promote {
        participant_id: String,
        display_name: String,
    },
    Demote {
        participant_id: String,
        display_name: String,
    },
    Ban {
        display_name: String,
    },
}
