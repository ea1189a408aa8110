//! Server-Sent-Events client registry and broadcaster.
//!
//! Each connected `/events` client owns a bounded channel; its writer task
//! (in `web_server`) drains the channel onto the socket.  The hub only
//! enqueues frames, so broadcasting never waits on a slow peer.  A client
//! whose queue is full has stopped reading and is dropped; removing a client
//! drops its sender, which ends the writer task.
//!
//! `updatedAt` is the only change-detection key: a snapshot is broadcast
//! when its marker differs from the one last sent, regardless of text.  The
//! snapshot is read while the hub lock is held, so registration and
//! broadcast observe snapshots in store order and never send an older one
//! after a newer one.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use ezcp_core::protocol::sse::{snapshot_frame, HEARTBEAT_FRAME};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::SnapshotSource;

/// Identifier of one SSE client.
pub type ClientId = Uuid;

/// Frames a client may have queued before it is considered stalled.
pub const CLIENT_QUEUE_FRAMES: usize = 32;

#[derive(Debug, Default)]
struct HubState {
    clients: HashMap<ClientId, mpsc::Sender<String>>,
    last_broadcast_updated_at: Option<String>,
}

/// Registry of open event streams for one web server.
#[derive(Debug, Default)]
pub struct SseHub {
    state: Mutex<HubState>,
}

impl SseHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of registered clients.
    pub fn client_count(&self) -> usize {
        self.lock().clients.len()
    }

    /// Marker of the last snapshot sent to clients.
    pub fn last_broadcast_updated_at(&self) -> Option<String> {
        self.lock().last_broadcast_updated_at.clone()
    }

    /// Adds a client and queues the current snapshot as its first frame.
    ///
    /// The sent marker becomes the hub's last-broadcast marker so the next
    /// tick does not resend the same snapshot to everyone.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if the snapshot cannot be encoded; the
    /// client is not registered in that case.
    pub fn register(
        &self,
        source: &dyn SnapshotSource,
    ) -> Result<(ClientId, mpsc::Receiver<String>), serde_json::Error> {
        let mut state = self.lock();
        let payload = source.snapshot().to_payload();
        let frame = snapshot_frame(&payload)?;
        let (tx, rx) = mpsc::channel(CLIENT_QUEUE_FRAMES);
        // Fresh channel with a live receiver: cannot be full or closed.
        let _ = tx.try_send(frame);

        let id = Uuid::new_v4();
        state.clients.insert(id, tx);
        state.last_broadcast_updated_at = Some(payload.updated_at);
        debug!("SSE client {id} registered ({} total)", state.clients.len());
        Ok((id, rx))
    }

    /// Sends the current snapshot to every client if its marker is new.
    ///
    /// Returns the number of clients the frame was queued for.
    pub fn broadcast_if_changed(&self, source: &dyn SnapshotSource) -> usize {
        let mut state = self.lock();
        if state.clients.is_empty() {
            return 0;
        }
        let snapshot = source.snapshot();
        let updated_at = match snapshot.updated_at.as_deref() {
            Some(marker) if !marker.is_empty() => marker,
            _ => return 0,
        };
        if state.last_broadcast_updated_at.as_deref() == Some(updated_at) {
            return 0;
        }

        let frame = match snapshot_frame(&snapshot.to_payload()) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("failed to encode snapshot frame: {e}");
                return 0;
            }
        };
        state.last_broadcast_updated_at = Some(updated_at.to_string());
        let sent = send_to_all(&mut state, &frame);
        debug!("broadcast snapshot {updated_at} to {sent} client(s)");
        sent
    }

    /// Sends the `: ping` comment to every client.
    pub fn heartbeat(&self) -> usize {
        let mut state = self.lock();
        send_to_all(&mut state, HEARTBEAT_FRAME)
    }

    /// Removes one client.  Returns `false` if it was already gone.
    pub fn drop_client(&self, id: ClientId) -> bool {
        let removed = self.lock().clients.remove(&id).is_some();
        if removed {
            debug!("SSE client {id} removed");
        }
        removed
    }

    /// Removes every client; their writer tasks end and close the sockets.
    pub fn drop_all(&self) -> usize {
        let mut state = self.lock();
        let count = state.clients.len();
        state.clients.clear();
        count
    }
}

/// Queues `frame` for each client, pruning those whose writer has exited or
/// stopped draining its queue.
fn send_to_all(state: &mut HubState, frame: &str) -> usize {
    state
        .clients
        .retain(|id, tx| match tx.try_send(frame.to_string()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("SSE client {id} is not reading; dropping it");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("pruned closed SSE client {id}");
                false
            }
        });
    state.clients.len()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
