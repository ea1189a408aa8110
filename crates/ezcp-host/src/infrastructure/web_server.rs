//! Web/SSE server: static page, read-only snapshot, and `/events` streams.
//!
//! Besides the accept loop this server runs two timers:
//!
//! - **broadcast** (default 350 ms) – pushes the snapshot to every stream
//!   when its `updatedAt` changed since the last push;
//! - **heartbeat** (default 15 s) – sends a `: ping` comment so idle proxies
//!   keep the stream open.
//!
//! Both timers and every connection end when the server is stopped.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use ezcp_core::protocol::sse::event_stream_head;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::application::WebRouter;
use crate::domain::{SnapshotSource, StaticAssets};
use crate::infrastructure::connection::{serve_requests, ConnectionOutcome};
use crate::infrastructure::listener::{bind, spawn_accept_loop, ServerError, ServerHandle};
use crate::infrastructure::sse_hub::SseHub;

/// Settings for [`start_web_server`].
#[derive(Debug, Clone)]
pub struct WebServerOptions {
    pub addr: SocketAddr,
    pub broadcast_interval: Duration,
    pub heartbeat_interval: Duration,
    pub assets: StaticAssets,
}

/// Binds the web server and starts its accept loop and timers.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the address cannot be bound.
pub async fn start_web_server(
    options: WebServerOptions,
    source: Arc<dyn SnapshotSource>,
) -> Result<ServerHandle, ServerError> {
    let (listener, local_addr) = bind(options.addr).await?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let hub = Arc::new(SseHub::new());
    let router = Arc::new(WebRouter::new(Arc::clone(&source), options.assets));

    let broadcaster = spawn_ticker(options.broadcast_interval, shutdown_rx.clone(), {
        let hub = Arc::clone(&hub);
        let source = Arc::clone(&source);
        move || {
            hub.broadcast_if_changed(source.as_ref());
        }
    });
    let heartbeat = spawn_ticker(options.heartbeat_interval, shutdown_rx.clone(), {
        let hub = Arc::clone(&hub);
        move || {
            hub.heartbeat();
        }
    });

    let accept = spawn_accept_loop("web", listener, shutdown_rx, {
        let hub = Arc::clone(&hub);
        move |stream, peer, shutdown| {
            handle_connection(
                stream,
                peer,
                shutdown,
                Arc::clone(&router),
                Arc::clone(&hub),
                Arc::clone(&source),
            )
        }
    });

    info!("web server listening on http://{local_addr}");
    Ok(ServerHandle::new(
        "web",
        local_addr,
        shutdown_tx,
        vec![accept, broadcaster, heartbeat],
        Some(hub),
    ))
}

/// Runs `tick` every `period` until shutdown.  The first tick fires one full
/// period after start.
fn spawn_ticker<F>(
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut() + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval(period.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Skip the immediate first tick.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => tick(),
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    })
}

fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    mut shutdown: watch::Receiver<bool>,
    router: Arc<WebRouter>,
    hub: Arc<SseHub>,
    source: Arc<dyn SnapshotSource>,
) -> impl Future<Output = ()> + Send + 'static {
    async move {
        match serve_requests(stream, peer, router.as_ref(), &mut shutdown).await {
            ConnectionOutcome::Closed => {}
            ConnectionOutcome::EventStream(stream) => {
                run_event_stream(stream, peer, &hub, source.as_ref(), &mut shutdown).await;
            }
        }
    }
}

/// Streams snapshot frames to one `/events` client until either side quits.
async fn run_event_stream(
    mut stream: TcpStream,
    peer: SocketAddr,
    hub: &SseHub,
    source: &dyn SnapshotSource,
    shutdown: &mut watch::Receiver<bool>,
) {
    if let Err(e) = stream.write_all(&event_stream_head()).await {
        debug!("{peer}: failed to open event stream: {e}");
        return;
    }
    let (id, mut frames) = match hub.register(source) {
        Ok(registered) => registered,
        Err(e) => {
            debug!("{peer}: failed to encode initial snapshot: {e}");
            let _ = stream.shutdown().await;
            return;
        }
    };
    info!("{peer}: event stream {id} opened");

    let result = pump_frames(&mut stream, &mut frames, shutdown).await;
    hub.drop_client(id);
    let _ = stream.shutdown().await;
    match result {
        Ok(()) => info!("{peer}: event stream {id} closed"),
        Err(e) => debug!("{peer}: event stream {id} ended: {e:#}"),
    }
}

async fn pump_frames(
    stream: &mut TcpStream,
    frames: &mut mpsc::Receiver<String>,
    shutdown: &mut watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let (mut reader, mut writer) = stream.split();
    let mut discard = [0u8; 512];
    if *shutdown.borrow() {
        return Ok(());
    }
    loop {
        tokio::select! {
            frame = frames.recv() => match frame {
                Some(frame) => writer
                    .write_all(frame.as_bytes())
                    .await
                    .context("failed to write SSE frame")?,
                // Dropped by the hub.
                None => return Ok(()),
            },
            read = reader.read(&mut discard) => {
                // Clients never send after the request; EOF means they left.
                if read.context("failed to read from SSE client")? == 0 {
                    return Ok(());
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return Ok(());
                }
            }
        }
    }
}
