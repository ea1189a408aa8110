//! ezcp-host library crate.
//!
//! Hosts one shared text blob on the local network.  Two protocol servers run
//! side by side on raw TCP sockets:
//!
//! ```text
//! Browser ──HTTP──▶ web server  (base port)     /, /styles.css, /app.js,
//!                                               /data, /data.json, /events (SSE)
//! Script  ──HTTP──▶ API server  (base port + 1) GET/POST /data, /ping
//!                        │
//!                        ▼
//!                 snapshot store ──debounced──▶ data.json
//! ```
//!
//! # Layers
//!
//! - `domain` – configuration and the collaborator traits the servers read
//!   from and write to.  No I/O.
//! - `application` – routing: `ParsedRequest` in, `Response` or an SSE
//!   upgrade out.  Also the in-memory snapshot store.
//! - `infrastructure` – listeners, per-connection tasks, the SSE hub and its
//!   timers, and on-disk persistence.

/// Domain layer: configuration and collaborator traits.
pub mod domain;

/// Application layer: request routing and the snapshot store.
pub mod application;

/// Infrastructure layer: TCP servers, SSE broadcasting, persistence.
pub mod infrastructure;
