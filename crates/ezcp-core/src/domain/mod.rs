//! Domain types shared by both ezcp servers.

pub mod snapshot;

pub use snapshot::{Snapshot, SnapshotPayload};
