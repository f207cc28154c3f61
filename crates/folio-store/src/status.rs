//! The status document persisted as `status_log.json`.
//!
//! Writes are merge-then-overwrite: fields missing (or `null`) in an update
//! keep their previous value, fields the document already carried beyond the
//! known ones are preserved, and `updated` is stamped on every write.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// File name of the status document inside the data directory.
pub const STATUS_FILE_NAME: &str = "status_log.json";

/// Progress document shared between a writer and any number of readers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusDocument {
    /// Current phase.
    pub phase: Option<Value>,
    /// Current part within the phase.
    pub part: Option<Value>,
    /// Free-form extra data.
    pub extra: Option<Value>,
    /// Time of the last write.
    pub updated: Option<DateTime<Utc>>,
    /// Fields written by other tools, carried through unchanged.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Partial update applied by a status write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusUpdate {
    /// New phase, if any.
    pub phase: Option<Value>,
    /// New part, if any.
    pub part: Option<Value>,
    /// New extra data, if any.
    pub extra: Option<Value>,
}

impl StatusUpdate {
    /// Sets the phase.
    #[must_use]
    pub fn with_phase(mut self, phase: impl Into<Value>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    /// Sets the part.
    #[must_use]
    pub fn with_part(mut self, part: impl Into<Value>) -> Self {
        self.part = Some(part.into());
        self
    }

    /// Sets the extra data.
    #[must_use]
    pub fn with_extra(mut self, extra: impl Into<Value>) -> Self {
        self.extra = Some(extra.into());
        self
    }
}

impl StatusDocument {
    /// Applies `update` on top of this document and stamps `updated` with `now`.
    ///
    /// The timestamp is kept at millisecond precision.
    #[must_use]
    pub fn merged(self, update: StatusUpdate, now: DateTime<Utc>) -> Self {
        Self {
            phase: pick(update.phase, self.phase),
            part: pick(update.part, self.part),
            extra: pick(update.extra, self.extra),
            updated: Some(now.trunc_subsecs(3)),
            other: self.other,
        }
    }
}

fn pick(new: Option<Value>, current: Option<Value>) -> Option<Value> {
    new.filter(|v| !v.is_null()).or(current)
}
