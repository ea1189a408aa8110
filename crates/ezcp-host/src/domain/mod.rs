//! Domain layer for ezcp-host.
//!
//! Pure types with no sockets, files, or async runtime: the host
//! configuration and the traits through which the servers reach the
//! snapshot owner.

pub mod collaborators;
pub mod config;

pub use collaborators::{RemoteTextSink, SnapshotSource, StaticAssets};
pub use config::{ConfigError, FileConfig, HostConfig};
