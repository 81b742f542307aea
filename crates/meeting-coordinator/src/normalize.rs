//! Display-name normalization and dual-key participant identity.
//!
//! Engine session ids are ephemeral: a participant who drops and rejoins
//! comes back with a new id. Normalized display names are the only channel
//! that survives a reconnect, so moderator grants and bans are keyed by
//! *both* representations and resolved by checking either.

use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Normalize a display name for matching across clients.
///
/// Steps, in order:
/// 1. Strip a trailing parenthetical suffix (e.g. `"Alice (You)"`).
/// 2. NFKD-decompose and drop combining marks (strips diacritics).
/// 3. Collapse internal whitespace runs to single spaces, trim.
/// 4. Lowercase.
#[must_use]
pub fn normalize_display_name(raw: &str) -> String {
    let mut name = raw.trim();
    if name.ends_with(')') {
        if let Some(open) = name.rfind('(') {
            name = name.get(..open).unwrap_or("").trim_end();
        }
    }

    let stripped: String = name.nfkd().filter(|c| !is_combining_mark(*c)).collect();

    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// A participant identity usable for moderator/ban resolution.
///
/// Session ids are engine-scoped and die with the session; normalized names
/// survive a rejoin. Resolution checks both variants against the replicated
/// sets of the meeting record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParticipantKey {
    /// Match by the engine-assigned session id.
    BySessionId(String),
    /// Match by normalized display name.
    ByNormalizedName(String),
}

impl ParticipantKey {
    /// Key for an engine session id.
    #[must_use]
    pub fn session(id: impl Into<String>) -> Self {
        ParticipantKey::BySessionId(id.into())
    }

    /// Key for a raw display name (normalized here).
    #[must_use]
    pub fn name(raw: &str) -> Self {
        ParticipantKey::ByNormalizedName(normalize_display_name(raw))
    }
}
