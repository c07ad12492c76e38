//! Data types for status tracking.
//!
//! Defines the tracked record and the closed set of status codes
//! a driver can publish.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed status label set: `(code, label, en_route)`.
///
/// Codes outside this table are never written to the store.
pub const STATUS_LABELS: [(i64, &str, bool); 4] = [
    (0, "On the way to OCM", true),
    (1, "On the way to WSU", true),
    (2, "At OCM", false),
    (3, "At WSU", false),
];

/// A status code known to be a member of [`STATUS_LABELS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Status(i64);

impl Status {
    /// Looks up a code in the label set.
    pub fn from_code(code: i64) -> Option<Self> {
        STATUS_LABELS
            .iter()
            .any(|(c, _, _)| *c == code)
            .then_some(Self(code))
    }

    /// Returns the raw integer code.
    pub fn code(self) -> i64 {
        self.0
    }

    /// Returns the human-readable label.
    pub fn label(self) -> &'static str {
        STATUS_LABELS
            .iter()
            .find(|(c, _, _)| *c == self.0)
            .map(|(_, label, _)| *label)
            .unwrap_or("Unknown")
    }

    /// Whether the driver is travelling (as opposed to parked at a stop).
    pub fn is_en_route(self) -> bool {
        STATUS_LABELS
            .iter()
            .any(|(c, _, en_route)| *c == self.0 && *en_route)
    }

    /// Iterates over every status in label-table order.
    pub fn all() -> impl Iterator<Item = Status> {
        STATUS_LABELS.iter().map(|(c, _, _)| Status(*c))
    }
}

impl TryFrom<i64> for Status {
    type Error = String;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| format!("unknown status code {code}"))
    }
}

impl From<Status> for i64 {
    fn from(status: Status) -> Self {
        status.0
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The single persisted row for a tracked entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    /// Stable well-known identifier (primary key).
    pub id: String,

    /// Current status code.
    pub status: Status,

    /// RFC 3339 time of the last write.
    pub updated_at: String,
}

/// Label table entry as exposed over HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusLabel {
    pub code: i64,
    pub label: String,
    pub en_route: bool,
}

impl From<Status> for StatusLabel {
    fn from(status: Status) -> Self {
        Self {
            code: status.code(),
            label: status.label().to_string(),
            en_route: status.is_en_route(),
        }
    }
}
