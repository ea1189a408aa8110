//! `data.json` persistence.
//!
//! The file holds the same `{text, size, updatedAt}` payload served by
//! `GET /data`.  Writes go to a sibling temp file first and are renamed into
//! place, so a crash mid-write never leaves a truncated file behind.
//!
//! [`DebouncedPersister`] coalesces bursts of changes: each `schedule()`
//! restarts a quiet-period timer, and only the latest snapshot is written
//! once the timer expires.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ezcp_core::{Snapshot, SnapshotPayload};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use crate::domain::SnapshotSource;

/// Error type for reading or writing the data file.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid data file JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Writes `snapshot` as JSON to `path`, replacing it atomically.
///
/// # Errors
///
/// Returns [`PersistError::Io`] if the temp file cannot be written or renamed.
pub fn write_snapshot_file(path: &Path, snapshot: &Snapshot) -> Result<(), PersistError> {
    let json = snapshot.to_payload().to_json()?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(|source| PersistError::Io {
        path: tmp.clone(),
        source,
    })?;
    std::fs::rename(&tmp, path).map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a snapshot written by [`write_snapshot_file`].
///
/// `size` is ignored; it is recomputed from `text` on every read.
///
/// # Errors
///
/// Returns [`PersistError::Io`] if the file cannot be read, or
/// [`PersistError::Json`] if it is not a valid payload.
pub fn read_snapshot_file(path: &Path) -> Result<Snapshot, PersistError> {
    let text = std::fs::read_to_string(path).map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let payload: SnapshotPayload = serde_json::from_str(&text)?;
    Ok(payload.into_snapshot())
}

#[derive(Debug)]
enum PersistCommand {
    Save,
    Flush(oneshot::Sender<()>),
}

/// Handle to the background writer task.  Cheap to clone.
#[derive(Debug, Clone)]
pub struct DebouncedPersister {
    tx: mpsc::UnboundedSender<PersistCommand>,
}

impl DebouncedPersister {
    /// Spawns the writer task.  It runs until every handle is dropped, writing
    /// any still-pending snapshot before it exits.
    pub fn spawn(
        path: PathBuf,
        source: Arc<dyn SnapshotSource>,
        debounce: Duration,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_writer(path, source, debounce, rx));
        (Self { tx }, task)
    }

    /// Requests a save after the quiet period.
    pub fn schedule(&self) {
        if self.tx.send(PersistCommand::Save).is_err() {
            warn!("persistence task is gone; change not saved");
        }
    }

    /// Writes the current snapshot now and waits for the write to finish.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(PersistCommand::Flush(done_tx)).is_err() {
            warn!("persistence task is gone; flush skipped");
            return;
        }
        let _ = done_rx.await;
    }
}

async fn run_writer(
    path: PathBuf,
    source: Arc<dyn SnapshotSource>,
    debounce: Duration,
    mut rx: mpsc::UnboundedReceiver<PersistCommand>,
) {
    let mut deadline: Option<Instant> = None;
    loop {
        let command = match deadline {
            Some(at) => match timeout_at(at, rx.recv()).await {
                Ok(command) => command,
                Err(_elapsed) => {
                    save(&path, source.as_ref());
                    deadline = None;
                    continue;
                }
            },
            None => rx.recv().await,
        };

        match command {
            Some(PersistCommand::Save) => deadline = Some(Instant::now() + debounce),
            Some(PersistCommand::Flush(done)) => {
                save(&path, source.as_ref());
                deadline = None;
                let _ = done.send(());
            }
            None => {
                if deadline.is_some() {
                    save(&path, source.as_ref());
                }
                break;
            }
        }
    }
}

fn save(path: &Path, source: &dyn SnapshotSource) {
    match write_snapshot_file(path, &source.snapshot()) {
        Ok(()) => debug!("saved {}", path.display()),
        Err(e) => warn!("failed to save {}: {e}", path.display()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
