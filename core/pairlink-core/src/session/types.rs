//! Session state for a single relay-channel connection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Connected sessions older than this are classified idle. A classification
/// only; an idle session is never disconnected automatically.
pub const IDLE_THRESHOLD_MINS: i64 = 30;

/// The single source of truth for one user-facing channel connection.
///
/// Invariants (enforced by [`crate::lifecycle::ConnectionManager`]):
/// - `is_connected` implies `bound_identifier` non-empty and
///   `last_connected_at` set.
/// - a non-empty `pairing_artifact` implies `is_connected == false`.
/// - `session_id` is minted fresh for every pairing attempt and never
///   reused after a disconnect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SessionState {
    /// Correlation token for the current pairing attempt or live session.
    /// Empty when disconnected.
    #[serde(default)]
    pub session_id: String,
    /// Reference to the scannable pairing code. Only meaningful pre-pairing.
    #[serde(default)]
    pub pairing_artifact: String,
    #[serde(default)]
    pub is_connected: bool,
    /// External identity (phone number) bound once pairing confirms.
    #[serde(default)]
    pub bound_identifier: String,
    #[serde(default)]
    pub last_connected_at: Option<DateTime<Utc>>,
    /// True while an artifact render request is in flight.
    #[serde(default)]
    pub is_generating: bool,
}

impl SessionState {
    /// True when every field carries its initial empty/false value.
    pub fn is_empty(&self) -> bool {
        self == &SessionState::default()
    }

    /// Whether this state is worth writing to durable storage. A fully
    /// initial state never gets persisted.
    pub fn should_persist(&self) -> bool {
        !self.pairing_artifact.is_empty() || self.is_connected
    }

    /// Classifies session liveness against the given instant.
    ///
    /// Pure function of the state and `now`; safe to call on every render.
    pub fn liveness(&self, now: DateTime<Utc>) -> Liveness {
        if !self.is_connected {
            return Liveness::Disconnected;
        }
        let Some(connected_at) = self.last_connected_at else {
            return Liveness::Disconnected;
        };
        let elapsed = now.signed_duration_since(connected_at);
        if elapsed.num_minutes() > IDLE_THRESHOLD_MINS {
            Liveness::Idle
        } else {
            Liveness::Active
        }
    }
}

/// Derived, non-authoritative label for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Liveness {
    Disconnected,
    Idle,
    Active,
}

impl std::fmt::Display for Liveness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Liveness::Disconnected => "disconnected",
            Liveness::Idle => "idle",
            Liveness::Active => "active",
        };
        f.write_str(label)
    }
}
