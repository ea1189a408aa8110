//! Per-connection request loop shared by both servers.
//!
//! Reads into a [`RequestFramer`] until one complete request is available,
//! routes it, writes the response, and half-closes the socket.  A `GET
//! /events` request instead hands the socket back to the caller so it can be
//! turned into an event stream.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use ezcp_core::{FrameError, RequestFramer, Response};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::application::{Dispatch, RequestHandler};

/// Size of each socket read.
const READ_CHUNK: usize = 8 * 1024;

/// How long to keep reading after the response so the peer sees a FIN
/// rather than a reset for bytes it already sent.
const LINGER: Duration = Duration::from_secs(1);

/// What the caller should do with the socket after [`serve_requests`].
#[derive(Debug)]
pub(crate) enum ConnectionOutcome {
    /// The connection is finished and has been closed.
    Closed,
    /// The client asked for `/events`; the socket is still open.
    EventStream(TcpStream),
}

enum Next {
    Responded,
    Upgrade,
    Abandon,
}

/// Serves one connection until a response has been written, the peer goes
/// away, or shutdown is signalled.  Never fails: socket errors end the
/// connection and are logged at `debug!`.
pub(crate) async fn serve_requests<H>(
    mut stream: TcpStream,
    peer: SocketAddr,
    handler: &H,
    shutdown: &mut watch::Receiver<bool>,
) -> ConnectionOutcome
where
    H: RequestHandler + ?Sized,
{
    match run_requests(&mut stream, peer, handler, shutdown).await {
        Ok(Next::Upgrade) => ConnectionOutcome::EventStream(stream),
        Ok(Next::Responded) => {
            close_gracefully(stream, peer).await;
            ConnectionOutcome::Closed
        }
        Ok(Next::Abandon) => ConnectionOutcome::Closed,
        Err(e) => {
            debug!("{peer}: connection error: {e:#}");
            ConnectionOutcome::Closed
        }
    }
}

async fn run_requests<H>(
    stream: &mut TcpStream,
    peer: SocketAddr,
    handler: &H,
    shutdown: &mut watch::Receiver<bool>,
) -> anyhow::Result<Next>
where
    H: RequestHandler + ?Sized,
{
    let mut framer = RequestFramer::new();
    let mut chunk = vec![0u8; READ_CHUNK];

    loop {
        match framer.next_request() {
            Ok(Some(request)) => {
                debug!("{peer}: {} {}", request.method, request.path);
                let response = match handler.handle(&request) {
                    Ok(Dispatch::Respond(response)) => response,
                    Ok(Dispatch::OpenEventStream) => return Ok(Next::Upgrade),
                    Err(e) => {
                        warn!("{peer}: {} {} failed: {e}", request.method, request.path);
                        Response::internal_error()
                    }
                };
                stream
                    .write_all(&response.to_bytes())
                    .await
                    .context("failed to write response")?;
                return Ok(Next::Responded);
            }
            Ok(None) => {}
            Err(FrameError::PayloadTooLarge { declared, limit }) => {
                info!("{peer}: rejecting body of {declared} bytes (limit {limit})");
                stream
                    .write_all(&Response::payload_too_large().to_bytes())
                    .await
                    .context("failed to write 413 response")?;
                return Ok(Next::Responded);
            }
            Err(FrameError::HeaderTooLarge { limit }) => {
                info!("{peer}: rejecting header block over {limit} bytes");
                stream
                    .write_all(&Response::header_fields_too_large().to_bytes())
                    .await
                    .context("failed to write 431 response")?;
                return Ok(Next::Responded);
            }
        }

        let read = tokio::select! {
            read = stream.read(&mut chunk) => read.context("failed to read request")?,
            _ = shutdown.changed() => return Ok(Next::Abandon),
        };
        if read == 0 {
            if framer.buffered_len() > 0 {
                debug!("{peer}: closed with {} unparsed bytes", framer.buffered_len());
            }
            return Ok(Next::Abandon);
        }
        framer.push(&chunk[..read]);
    }
}

/// Half-closes the write side, then discards input until EOF or [`LINGER`].
async fn close_gracefully(mut stream: TcpStream, peer: SocketAddr) {
    if let Err(e) = stream.shutdown().await {
        debug!("{peer}: shutdown failed: {e}");
        return;
    }
    let mut sink = [0u8; 1024];
    let _ = timeout(LINGER, async {
        loop {
            match stream.read(&mut sink).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
        }
    })
    .await;
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use ezcp_core::{ParsedRequest, Status};
    use tokio::net::TcpListener;

    use super::*;
    use crate::application::HandlerError;

    /// Echoes the request path, upgrades `/events`, fails `/boom`.
    struct EchoHandler;

    impl RequestHandler for EchoHandler {
        fn handle(&self, request: &ParsedRequest) -> Result<Dispatch, HandlerError> {
            match request.path.as_str() {
                "/events" => Ok(Dispatch::OpenEventStream),
                "/boom" => Err(HandlerError::Json(
                    serde_json::from_str::<u8>("x").unwrap_err(),
                )),
                path => Ok(Dispatch::Respond(Response::text(Status::Ok, path))),
            }
        }
    }

    async fn connected_pair() -> (TcpStream, TcpStream, SocketAddr) {
        let listener = TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, peer) = listener.accept().await.unwrap();
        (client, server, peer)
    }

    async fn exchange(raw: &[u8]) -> (String, bool) {
        let (mut client, server, peer) = connected_pair().await;
        let (_tx, mut rx) = watch::channel(false);
        let serve = tokio::spawn(async move {
            matches!(
                serve_requests(server, peer, &EchoHandler, &mut rx).await,
                ConnectionOutcome::EventStream(_)
            )
        });
        client.write_all(raw).await.unwrap();
        client.shutdown().await.unwrap();
        let mut reply = Vec::new();
        client.read_to_end(&mut reply).await.unwrap();
        let upgraded = serve.await.unwrap();
        (String::from_utf8(reply).unwrap(), upgraded)
    }

    #[tokio::test]
    async fn test_response_written_then_closed() {
        let (reply, upgraded) = exchange(b"GET /hello HTTP/1.1\r\n\r\n").await;
        assert!(!upgraded);
        assert!(reply.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(reply.contains("Connection: close\r\n"));
        assert!(reply.ends_with("\r\n\r\n/hello"));
    }

    #[tokio::test]
    async fn test_handler_error_becomes_500() {
        let (reply, _) = exchange(b"GET /boom HTTP/1.1\r\n\r\n").await;
        assert!(reply.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(reply.ends_with("\r\n\r\nError"));
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected_before_it_arrives() {
        let (reply, _) =
            exchange(b"POST /data HTTP/1.1\r\nContent-Length: 2000000\r\n\r\nonly a little").await;
        assert!(reply.starts_with("HTTP/1.1 413 Payload Too Large\r\n"));
        assert!(reply.ends_with("Too large"));
    }

    #[tokio::test]
    async fn test_endless_header_block_is_rejected_with_431() {
        let mut raw = b"GET / HTTP/1.1\r\nX-Filler: ".to_vec();
        raw.resize(ezcp_core::MAX_HEADER_BYTES + 4096, b'a');

        let (reply, upgraded) = exchange(&raw).await;

        assert!(!upgraded);
        assert!(reply.starts_with("HTTP/1.1 431 Request Header Fields Too Large\r\n"));
        assert!(reply.ends_with("Headers too large"));
    }

    #[tokio::test]
    async fn test_events_returns_open_socket() {
        let (_reply, upgraded) = exchange(b"GET /events HTTP/1.1\r\n\r\n").await;
        assert!(upgraded);
    }

    #[tokio::test]
    async fn test_incomplete_request_then_eof_sends_nothing() {
        let (reply, upgraded) = exchange(b"GET /partial HTTP/1.1\r\nHost: x").await;
        assert!(!upgraded);
        assert!(reply.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_abandons_idle_connection() {
        // Arrange: a client that never sends anything
        let (mut client, server, peer) = connected_pair().await;
        let (tx, mut rx) = watch::channel(false);
        let serve = tokio::spawn(async move {
            matches!(
                serve_requests(server, peer, &EchoHandler, &mut rx).await,
                ConnectionOutcome::Closed
            )
        });

        // Act
        tx.send_replace(true);

        // Assert: task ends and the client sees EOF
        assert!(serve.await.unwrap());
        let mut reply = Vec::new();
        client.read_to_end(&mut reply).await.unwrap();
        assert!(reply.is_empty());
    }
}
