//! Infrastructure layer for the host.
//!
//! Contains the OS-facing adapters: TCP listeners and connection tasks, the
//! SSE hub with its timers, and file-system persistence.
//!
//! **Dependency rule**: this layer may depend on `application`, `domain`, and
//! `ezcp_core`, but MUST NOT be imported by the `application` or `domain`
//! layers.

pub mod api_server;
pub(crate) mod connection;
pub mod listener;
pub mod persistence;
pub mod sse_hub;
pub mod ui_bridge;
pub mod web_root;
pub mod web_server;

pub use api_server::start_api_server;
pub use listener::{ServerError, ServerHandle};
pub use persistence::{DebouncedPersister, PersistError};
pub use sse_hub::SseHub;
pub use ui_bridge::HostTextSink;
pub use web_root::WebRoot;
pub use web_server::{start_web_server, WebServerOptions};
