//! Coordinator error types.
//!
//! The coordination layer recovers from most failures by re-deriving state
//! from the next notification, so very few errors propagate:
//!
//! - *Store transport errors* are swallowed at the call site (logged, retried
//!   implicitly on the next user action or notification).
//! - *Engine command errors* are captured only when executing a queued
//!   action, where they are recorded on the action record itself.
//! - Errors returned from [`crate::coordinator::SessionCoordinator::join`]
//!   are the exception: a client that cannot fetch the meeting record, or is
//!   already banned, must not enter the meeting at all.

use thiserror::Error;

/// Coordination layer error type.
#[derive(Debug, Error)]
pub enum CoordError {
    /// Store operation failed (read, write, or subscribe).
    #[error("Store error: {0}")]
    Store(#[from] crate::store::StoreError),

    /// Meeting record not found.
    #[error("Meeting not found: {0}")]
    MeetingNotFound(String),

    /// The local display name is banned from this meeting.
    #[error("Banned from meeting")]
    Banned,

    /// Caller lacks the authority tier required for the operation.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Internal error (actor mailbox or response channel failure).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoordError {
    /// Returns a client-safe message for the embedding UI layer.
    ///
    /// Internal details are logged, not surfaced.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            CoordError::Store(_) | CoordError::Internal(_) => {
                "An internal error occurred".to_string()
            }
            CoordError::MeetingNotFound(_) => "Meeting not found".to_string(),
            CoordError::Banned => "You have been removed from this meeting".to_string(),
            CoordError::PermissionDenied(msg) => msg.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    #[test]
    fn test_client_messages_hide_internal_details() {
        let store_err = CoordError::Store(StoreError::Transport(
            "connection refused at 10.0.0.12:5432".to_string(),
        ));
        assert!(!store_err.client_message().contains("10.0.0.12"));
        assert_eq!(store_err.client_message(), "An internal error occurred");
    }

    #[test]
    fn test_banned_message() {
        assert_eq!(
            CoordError::Banned.client_message(),
            "You have been removed from this meeting"
        );
    }

    #[test]
    fn test_display_formatting() {
        assert_eq!(
            format!("{}", CoordError::MeetingNotFound("m-123".to_string())),
            "Meeting not found: m-123"
        );
        assert_eq!(
            format!(
                "{}",
                CoordError::PermissionDenied("not a moderator".to_string())
            ),
            "Permission denied: not a moderator"
        );
    }

    #[test]
    fn test_store_error_conversion() {
        let err: CoordError = StoreError::NotFound("m-1".to_string()).into();
        assert!(matches!(err, CoordError::Store(_)));
    }
}
