//! JSON API server (`base_port + 1`).

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::application::ApiRouter;
use crate::domain::{RemoteTextSink, SnapshotSource};
use crate::infrastructure::connection::serve_requests;
use crate::infrastructure::listener::{bind, spawn_accept_loop, ServerError, ServerHandle};

/// Binds the API server and starts its accept loop.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the address cannot be bound.
pub async fn start_api_server(
    addr: SocketAddr,
    source: Arc<dyn SnapshotSource>,
    sink: Arc<dyn RemoteTextSink>,
) -> Result<ServerHandle, ServerError> {
    let (listener, local_addr) = bind(addr).await?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let router = Arc::new(ApiRouter::new(source, sink));

    let accept = spawn_accept_loop("api", listener, shutdown_rx, move |stream, peer, mut shutdown| {
        let router = Arc::clone(&router);
        async move {
            // The API router never upgrades, so the outcome is always Closed.
            serve_requests(stream, peer, router.as_ref(), &mut shutdown).await;
        }
    });

    info!("API server listening on http://{local_addr}");
    Ok(ServerHandle::new("api", local_addr, shutdown_tx, vec![accept], None))
}
