//! Meeting Coordinator Library
//!
//! This library provides the moderation coordination layer that a Quorum
//! client embeds next to its conferencing engine. Many independent,
//! loosely-synchronized clients share one meeting record in a remote store;
//! this crate keeps them in agreement on:
//!
//! - Who currently holds moderator/admin status
//! - Who is banned from the meeting
//! - The state of the shared whiteboard toggle
//! - How a non-privileged client gets a privileged operation (kick,
//!   force-mute, mute-all, recording/stream control) executed by the
//!   authoritative host client
//!
//! # Architecture
//!
//! Each joined meeting runs one [`coordinator::SessionCoordinator`] actor per
//! client:
//!
//! ```text
//! SessionCoordinator (one per joined meeting, per client)
//! ├── consumes the engine event stream (joins, leaves, role changes)
//! ├── consumes the meeting record change stream (admins, bans, whiteboard)
//! ├── debounces roster reconciliation (cancel-and-reschedule)
//! └── supervises the ActionExecutor (host clients only)
//!     └── consumes the action-log insert stream and drives the engine
//! ```
//!
//! # Key Design Decisions
//!
//! - **Commutative record updates**: every mutation of the shared record is a
//!   set-union/difference (or single-field set), never a whole-document
//!   overwrite, so concurrent admin actions cannot clobber each other.
//! - **Dual-key identity**: moderator and ban status match by ephemeral
//!   session id *or* normalized display name, because session ids do not
//!   survive a rejoin.
//! - **Edge-triggered toggle sync**: the engine only exposes a whiteboard
//!   *toggle*, so replication reacts to value transitions, never levels.
//! - **At-most-once delegation**: queued actions are processed once per
//!   record id, guarded against duplicate delivery and replay overlap.
//!
//! # Modules
//!
//! - [`engine`] - Conferencing engine adapter boundary
//! - [`store`] - Shared meeting record store boundary
//! - [`normalize`] - Display-name normalization and participant keys
//! - [`roster`] - Roster reconciliation
//! - [`actions`] - Action delegation queue (requester and host executor)
//! - [`admin`] - Admin/ban synchronization
//! - [`whiteboard`] - Shared toggle synchronization
//! - [`coordinator`] - The per-meeting client actor
//! - [`config`] - Coordinator configuration from environment
//! - [`errors`] - Error types and the swallow/capture taxonomy
//! - [`metrics`] - Coordinator counters

pub mod actions;
pub mod admin;
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod errors;
pub mod metrics;
pub mod normalize;
pub mod roster;
pub mod store;
pub mod whiteboard;
