use std::path::{Path, PathBuf};

use crate::error::AppError;

/// Well-known locations under the configured data directory.
///
/// Every ingestion session gets its own namespaced folder below `uploads/`
/// and `output_csv/`, so concurrent sessions never share a workspace.
#[derive(Debug, Clone)]
pub struct DataLayout {
    base: PathBuf,
}

impl DataLayout {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            base: data_dir.into(),
        }
    }

    /// Creates all directories the service writes to. Called once at startup.
    pub fn ensure(&self) -> Result<(), AppError> {
        for dir in [
            self.uploads(),
            self.output_csv(),
            self.server_logs(),
            self.properties(),
            self.db_dir(),
        ] {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(())
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Per-session upload folders, `uploads/<session>/`.
    pub fn uploads(&self) -> PathBuf {
        self.base.join("uploads")
    }

    /// Converter output, `output_csv/<session>/`.
    pub fn output_csv(&self) -> PathBuf {
        self.base.join("output_csv")
    }

    /// Destination root for routed `.log` files.
    pub fn server_logs(&self) -> PathBuf {
        self.base.join("server_logs")
    }

    /// Destination root for routed `.properties` files.
    pub fn properties(&self) -> PathBuf {
        self.base.join("properties")
    }

    pub fn db_dir(&self) -> PathBuf {
        self.base.join("db")
    }

    pub fn db_path(&self) -> PathBuf {
        self.db_dir().join("perfdata.db")
    }

    pub fn active_tables_path(&self) -> PathBuf {
        self.base.join("active_tables.json")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.base.join("settings.json")
    }

    pub fn session_upload_dir(&self, session: &str) -> PathBuf {
        self.uploads().join(session)
    }

    pub fn session_output_dir(&self, session: &str) -> PathBuf {
        self.output_csv().join(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_creates_all_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = DataLayout::new(dir.path().join("data"));
        layout.ensure().expect("ensure");

        assert!(layout.uploads().is_dir());
        assert!(layout.output_csv().is_dir());
        assert!(layout.server_logs().is_dir());
        assert!(layout.properties().is_dir());
        assert!(layout.db_dir().is_dir());
        assert!(!layout.db_path().exists());
    }

    #[test]
    fn session_dirs_are_namespaced() {
        let layout = DataLayout::new("/data");
        assert_eq!(
            layout.session_upload_dir("20250101_upload1"),
            PathBuf::from("/data/uploads/20250101_upload1")
        );
        assert_eq!(
            layout.session_output_dir("20250101_upload1"),
            PathBuf::from("/data/output_csv/20250101_upload1")
        );
    }
}
