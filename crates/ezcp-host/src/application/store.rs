//! In-memory snapshot store.
//!
//! Readers get a cloned [`Snapshot`] under a read lock; writers replace the
//! whole record under a write lock, so nobody ever observes a text paired
//! with the wrong marker.

use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use ezcp_core::Snapshot;

use crate::domain::SnapshotSource;

/// Owner of the current snapshot.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    inner: RwLock<Snapshot>,
}

impl MemorySnapshotStore {
    /// Creates a store seeded with `initial` (usually the loaded `data.json`).
    pub fn new(initial: Snapshot) -> Self {
        Self {
            inner: RwLock::new(initial),
        }
    }

    /// Returns a copy of the current snapshot.
    pub fn get_snapshot(&self) -> Snapshot {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the snapshot verbatim, marker included.
    pub fn write(&self, text: impl Into<String>, updated_at: Option<String>) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Snapshot {
            text: text.into(),
            updated_at,
        };
    }

    /// Replaces the text and stamps a fresh marker.
    ///
    /// The new marker is always strictly later than the previous one, even
    /// for two writes within the same millisecond, so the SSE hub never
    /// mistakes a change for a repeat.
    pub fn set_text(&self, text: impl Into<String>) -> Snapshot {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let updated_at = next_marker(guard.updated_at.as_deref(), Utc::now());
        *guard = Snapshot {
            text: text.into(),
            updated_at: Some(updated_at),
        };
        guard.clone()
    }
}

impl SnapshotSource for MemorySnapshotStore {
    fn snapshot(&self) -> Snapshot {
        self.get_snapshot()
    }
}

/// `now` in millisecond form, bumped past `previous` when the clock has not
/// advanced (or went backwards).
fn next_marker(previous: Option<&str>, now: DateTime<Utc>) -> String {
    let now_ms = now.timestamp_millis();
    let previous_ms = previous
        .and_then(|p| DateTime::parse_from_rfc3339(p).ok())
        .map(|p| p.timestamp_millis());

    let millis = match previous_ms {
        Some(prev) if prev >= now_ms => prev.saturating_add(1),
        _ => now_ms,
    };
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or(now)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).single().unwrap()
    }

    #[test]
    fn test_new_store_returns_seed() {
        let store = MemorySnapshotStore::new(Snapshot::new("seed", "t0"));
        assert_eq!(store.get_snapshot(), Snapshot::new("seed", "t0"));
        assert_eq!(store.snapshot(), Snapshot::new("seed", "t0"));
    }

    #[test]
    fn test_write_keeps_marker_verbatim() {
        let store = MemorySnapshotStore::default();
        store.write("x", None);
        assert_eq!(store.get_snapshot().updated_at, None);
        store.write("y", Some("custom".to_string()));
        assert_eq!(store.get_snapshot(), Snapshot::new("y", "custom"));
    }

    #[test]
    fn test_set_text_always_changes_marker() {
        // Arrange
        let store = MemorySnapshotStore::default();

        // Act: many writes in a tight loop land in the same millisecond
        let mut markers = Vec::new();
        for i in 0..50 {
            markers.push(store.set_text(format!("v{i}")).updated_at.unwrap());
        }

        // Assert
        for pair in markers.windows(2) {
            assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
        assert_eq!(store.get_snapshot().text, "v49");
    }

    #[test]
    fn test_next_marker_uses_clock_when_ahead() {
        let marker = next_marker(Some("2024-01-01T00:00:00.000Z"), at(1_800_000_000_000));
        assert_eq!(marker, "2027-01-15T08:00:00.000Z");
    }

    #[test]
    fn test_next_marker_bumps_when_clock_stalls() {
        let now = at(1_704_067_200_000); // 2024-01-01T00:00:00.000Z
        let marker = next_marker(Some("2024-01-01T00:00:00.000Z"), now);
        assert_eq!(marker, "2024-01-01T00:00:00.001Z");
    }

    #[test]
    fn test_next_marker_ignores_unparseable_previous() {
        let now = at(1_704_067_200_000);
        assert_eq!(
            next_marker(Some("not a date"), now),
            "2024-01-01T00:00:00.000Z"
        );
        assert_eq!(next_marker(None, now), "2024-01-01T00:00:00.000Z");
    }
}
