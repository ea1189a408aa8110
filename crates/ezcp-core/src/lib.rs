//! # ezcp-core
//!
//! Shared protocol library for the ezcp shared-text host: a hand-rolled
//! HTTP/1.1 request framer, the response writer, Server-Sent-Events frame
//! encoders, and the snapshot record that every server reads.
//!
//! This crate has no dependencies on sockets or an async runtime.  The host
//! crate feeds it raw bytes from a `TcpStream` and writes back the bytes it
//! produces.
//!
//! # Architecture overview
//!
//! - **`protocol`** – How bytes travel over the network.  The
//!   [`RequestFramer`] accumulates bytes from a connection until a complete
//!   request (header block plus `Content-Length` body) is available, and
//!   [`Response`] turns a status and body into wire bytes with the CORS and
//!   cache headers every ezcp response carries.
//!
//! - **`domain`** – The [`Snapshot`] record (`{text, updatedAt}`) and the
//!   JSON payload shape served by `GET /data` and pushed over SSE.

pub mod domain;
pub mod protocol;

pub use domain::snapshot::{Snapshot, SnapshotPayload};
pub use protocol::framer::{FrameError, RequestFramer, MAX_BODY_BYTES, MAX_HEADER_BYTES};
pub use protocol::request::ParsedRequest;
pub use protocol::response::{Response, Status};
