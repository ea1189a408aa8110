//! Seams between the protocol servers and the rest of the host.
//!
//! The servers never own the snapshot.  They read it through
//! [`SnapshotSource`] and report text submitted over the API through
//! [`RemoteTextSink`]; whoever implements the sink decides how (and when)
//! the snapshot is updated and persisted.

use ezcp_core::Snapshot;

/// Synchronous read accessor for the current snapshot.
///
/// Implementations must return a consistent copy; a reader may see a value
/// that is slightly stale but never a half-written one.
#[cfg_attr(test, mockall::automock)]
pub trait SnapshotSource: Send + Sync {
    /// Returns the current `{text, updatedAt}` record.
    fn snapshot(&self) -> Snapshot;
}

/// Fire-and-forget notification that a remote client submitted text.
#[cfg_attr(test, mockall::automock)]
pub trait RemoteTextSink: Send + Sync {
    /// Called once per accepted `POST /data`.
    fn on_remote_text(&self, text: String);
}

/// Static page content served by the web server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticAssets {
    pub index_html: &'static str,
    pub styles_css: &'static str,
    pub app_js: &'static str,
}

impl StaticAssets {
    /// The browser client compiled into the binary.
    pub fn bundled() -> Self {
        Self {
            index_html: include_str!("../../assets/index.html"),
            styles_css: include_str!("../../assets/styles.css"),
            app_js: include_str!("../../assets/app.js"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
