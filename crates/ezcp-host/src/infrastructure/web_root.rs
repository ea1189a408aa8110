//! The on-disk web root: exported page assets plus `data.json`.

use std::path::{Path, PathBuf};

use ezcp_core::domain::snapshot::now_timestamp;
use ezcp_core::Snapshot;
use tracing::{info, warn};

use crate::domain::StaticAssets;
use crate::infrastructure::persistence::{read_snapshot_file, write_snapshot_file, PersistError};

/// Name of the persisted snapshot inside the web root.
pub const DATA_FILE: &str = "data.json";

/// Directory holding `index.html`, `styles.css`, `app.js`, and `data.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebRoot {
    dir: PathBuf,
}

impl WebRoot {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of `data.json`.
    pub fn data_file(&self) -> PathBuf {
        self.dir.join(DATA_FILE)
    }

    /// Creates the directory, (re)writes the page assets, and returns the
    /// persisted snapshot.
    ///
    /// A missing `data.json` is created with empty text.  An unreadable or
    /// corrupt one is logged and replaced in memory by an empty snapshot
    /// stamped with the current time; the file itself is overwritten on the
    /// next save.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Io`] if the directory or an asset cannot be
    /// written.
    pub fn prepare(&self, assets: &StaticAssets) -> Result<Snapshot, PersistError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| PersistError::Io {
            path: self.dir.clone(),
            source,
        })?;
        for (name, content) in [
            ("index.html", assets.index_html),
            ("styles.css", assets.styles_css),
            ("app.js", assets.app_js),
        ] {
            let path = self.dir.join(name);
            std::fs::write(&path, content).map_err(|source| PersistError::Io { path, source })?;
        }

        let data_file = self.data_file();
        if !data_file.exists() {
            let empty = Snapshot::new("", now_timestamp());
            write_snapshot_file(&data_file, &empty)?;
            info!("created {}", data_file.display());
            return Ok(empty);
        }

        match read_snapshot_file(&data_file) {
            Ok(snapshot) => {
                info!(
                    "loaded {} ({} chars)",
                    data_file.display(),
                    snapshot.char_count()
                );
                Ok(snapshot)
            }
            Err(e) => {
                warn!("ignoring unreadable {}: {e}", data_file.display());
                Ok(Snapshot::new("", now_timestamp()))
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const ASSETS: StaticAssets = StaticAssets {
        index_html: "<html></html>",
        styles_css: "body{}",
        app_js: "// js",
    };

    #[test]
    fn test_prepare_creates_directory_assets_and_empty_data() {
        // Arrange
        let tmp = tempfile::tempdir().unwrap();
        let root = WebRoot::new(tmp.path().join("nested").join("ezcp-web"));

        // Act
        let snapshot = root.prepare(&ASSETS).unwrap();

        // Assert
        assert_eq!(snapshot.text, "");
        assert!(snapshot.updated_at.is_some());
        assert_eq!(
            std::fs::read_to_string(root.dir().join("styles.css")).unwrap(),
            "body{}"
        );
        assert!(root.dir().join("index.html").exists());
        assert!(root.dir().join("app.js").exists());
        assert_eq!(read_snapshot_file(&root.data_file()).unwrap(), snapshot);
    }

    #[test]
    fn test_prepare_loads_existing_data() {
        let tmp = tempfile::tempdir().unwrap();
        let root = WebRoot::new(tmp.path());
        write_snapshot_file(&root.data_file(), &Snapshot::new("kept", "t9")).unwrap();

        let snapshot = tokio_test::assert_ok!(root.prepare(&ASSETS));

        assert_eq!(snapshot, Snapshot::new("kept", "t9"));
    }

    #[test]
    fn test_prepare_tolerates_corrupt_data() {
        let tmp = tempfile::tempdir().unwrap();
        let root = WebRoot::new(tmp.path());
        std::fs::write(root.data_file(), "garbage").unwrap();

        let snapshot = root.prepare(&ASSETS).unwrap();

        // Stamped so readers and the broadcaster share one stable marker
        assert_eq!(snapshot.text, "");
        assert!(snapshot.updated_at.as_deref().is_some_and(|m| !m.is_empty()));
        // Left in place for the next save to overwrite.
        assert_eq!(std::fs::read_to_string(root.data_file()).unwrap(), "garbage");
    }

    #[test]
    fn test_prepare_fails_when_dir_is_a_file() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("occupied");
        std::fs::write(&file, "x").unwrap();

        let err = tokio_test::assert_err!(WebRoot::new(&file).prepare(&ASSETS));

        assert!(matches!(err, PersistError::Io { .. }));
    }
}
