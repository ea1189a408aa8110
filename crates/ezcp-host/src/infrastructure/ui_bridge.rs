//! Bridge between the API server and the host's own copy of the text.
//!
//! Without a native UI the host reacts to remote submissions directly: the
//! text is stamped into the store (so both servers serve it and the SSE
//! broadcaster picks it up on its next tick) and a save is scheduled.

use std::sync::Arc;

use tracing::info;

use crate::application::MemorySnapshotStore;
use crate::domain::RemoteTextSink;
use crate::infrastructure::persistence::DebouncedPersister;

/// [`RemoteTextSink`] that applies remote text to the store and persists it.
pub struct HostTextSink {
    store: Arc<MemorySnapshotStore>,
    persister: DebouncedPersister,
}

impl HostTextSink {
    pub fn new(store: Arc<MemorySnapshotStore>, persister: DebouncedPersister) -> Self {
        Self { store, persister }
    }
}

impl RemoteTextSink for HostTextSink {
    fn on_remote_text(&self, text: String) {
        let chars = text.chars().count();
        let snapshot = self.store.set_text(text);
        // Never log the text itself.
        info!(
            "remote text received ({chars} chars), updatedAt={}",
            snapshot.updated_at.as_deref().unwrap_or_default()
        );
        self.persister.schedule();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ezcp_core::Snapshot;

    use super::*;
    use crate::domain::SnapshotSource;
    use crate::infrastructure::persistence::read_snapshot_file;

    #[tokio::test]
    async fn test_remote_text_updates_store_and_file() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let store = Arc::new(MemorySnapshotStore::new(Snapshot::new("old", "t0")));
        let source: Arc<dyn SnapshotSource> = store.clone();
        let (persister, _task) =
            DebouncedPersister::spawn(path.clone(), source, Duration::from_secs(3600));
        let sink = HostTextSink::new(Arc::clone(&store), persister.clone());

        // Act
        sink.on_remote_text("new text".to_string());
        persister.flush().await;

        // Assert
        let current = store.get_snapshot();
        assert_eq!(current.text, "new text");
        assert_ne!(current.updated_at.as_deref(), Some("t0"));
        assert_eq!(read_snapshot_file(&path).unwrap(), current);
    }

    #[tokio::test]
    async fn test_identical_text_still_changes_marker() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemorySnapshotStore::default());
        let (persister, _task) = DebouncedPersister::spawn(
            dir.path().join("data.json"),
            store.clone(),
            Duration::from_secs(3600),
        );
        let sink = HostTextSink::new(Arc::clone(&store), persister);

        sink.on_remote_text("same".to_string());
        let first = store.get_snapshot().updated_at;
        sink.on_remote_text("same".to_string());

        assert_ne!(store.get_snapshot().updated_at, first);
    }
}
