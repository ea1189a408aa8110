//! TCP accept loop and the handle used to stop a running server.
//!
//! Both servers share this plumbing: bind, spawn one task per accepted
//! connection into a [`JoinSet`], and exit when the shutdown watch flips to
//! `true`.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::infrastructure::sse_hub::SseHub;

/// How long open connections get to finish after shutdown before abort.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Pause after a failed `accept()` (e.g. out of file descriptors).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Error type for server startup.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("bind failed on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Binds `addr` and returns the listener with its actual local address
/// (differs from `addr` when port `0` was requested).
pub(crate) async fn bind(addr: SocketAddr) -> Result<(TcpListener, SocketAddr), ServerError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    let local_addr = listener
        .local_addr()
        .map_err(|source| ServerError::Bind { addr, source })?;
    Ok((listener, local_addr))
}

/// A running server.  Dropping the handle does not stop it; call
/// [`ServerHandle::stop`].
pub struct ServerHandle {
    name: &'static str,
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
    hub: Option<Arc<SseHub>>,
}

impl ServerHandle {
    pub(crate) fn new(
        name: &'static str,
        local_addr: SocketAddr,
        shutdown_tx: watch::Sender<bool>,
        tasks: Vec<JoinHandle<()>>,
        hub: Option<Arc<SseHub>>,
    ) -> Self {
        Self {
            name,
            local_addr,
            shutdown_tx,
            tasks,
            hub,
        }
    }

    /// Address the server is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Short server name used in logs (`"web"` or `"api"`).
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The SSE hub, for servers that stream events.
    pub fn hub(&self) -> Option<&Arc<SseHub>> {
        self.hub.as_ref()
    }

    /// Stops timers, disconnects SSE clients, closes the listener, and waits
    /// for every task to end.  Never fails.
    pub async fn stop(self) {
        self.shutdown_tx.send_replace(true);
        if let Some(hub) = &self.hub {
            let dropped = hub.drop_all();
            debug!("{} server: dropped {dropped} SSE client(s)", self.name);
        }
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!("{} server task ended abnormally: {e}", self.name);
            }
        }
        info!("{} server on {} stopped", self.name, self.local_addr);
    }
}

/// Spawns the accept loop for `listener`.
///
/// `on_connection` runs in its own task for each accepted socket and gets a
/// clone of the shutdown receiver so it can close proactively.
pub(crate) fn spawn_accept_loop<F, Fut>(
    name: &'static str,
    listener: TcpListener,
    mut shutdown: watch::Receiver<bool>,
    on_connection: F,
) -> JoinHandle<()>
where
    F: Fn(TcpStream, SocketAddr, watch::Receiver<bool>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut connections = JoinSet::new();
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!("{name}: connection from {peer}");
                        connections.spawn(on_connection(stream, peer, shutdown.clone()));
                    }
                    Err(e) => {
                        warn!("{name}: accept error: {e}");
                        sleep(ACCEPT_BACKOFF).await;
                    }
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        drop(listener);
        let open = connections.len();
        if open > 0 {
            debug!("{name}: waiting for {open} connection(s) to close");
        }
        let drained = timeout(DRAIN_TIMEOUT, async {
            while connections.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!("{name}: aborting {} lingering connection(s)", connections.len());
        }
        connections.shutdown().await;
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
