//! The shared text snapshot and its wire representation.
//!
//! A [`Snapshot`] is the single `{text, updatedAt}` record synchronized
//! across devices.  Readers never diff `text`: `updated_at` is the only
//! change-detection key, so whoever writes the snapshot must stamp a new
//! marker on every text change.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// The shared `{text, updatedAt}` record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// The shared text blob.
    pub text: String,
    /// RFC 3339 change marker.  `None` when the owner never stamped one.
    pub updated_at: Option<String>,
}

impl Snapshot {
    /// Creates a snapshot with an explicit change marker.
    pub fn new(text: impl Into<String>, updated_at: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            updated_at: Some(updated_at.into()),
        }
    }

    /// Number of characters (Unicode scalar values) in the text.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Builds the JSON payload served by `GET /data` and pushed over SSE.
    ///
    /// A missing `updated_at` is replaced with the current time.
    pub fn to_payload(&self) -> SnapshotPayload {
        SnapshotPayload {
            text: self.text.clone(),
            size: self.char_count(),
            updated_at: self.updated_at.clone().unwrap_or_else(now_timestamp),
        }
    }
}

/// JSON body shape: `{"text": ..., "size": ..., "updatedAt": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPayload {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub size: usize,
    #[serde(default)]
    pub updated_at: String,
}

impl SnapshotPayload {
    /// Serializes to a single-line JSON string.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if encoding fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Converts a payload read back from storage into a [`Snapshot`].
    ///
    /// An empty `updatedAt` becomes `None`.
    pub fn into_snapshot(self) -> Snapshot {
        let updated_at = if self.updated_at.is_empty() {
            None
        } else {
            Some(self.updated_at)
        };
        Snapshot {
            text: self.text,
            updated_at,
        }
    }
}

/// Current UTC time in the `2024-05-01T12:00:00.000Z` form.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
