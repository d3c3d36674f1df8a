use std::{fmt, path::Path};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Identifier of one upload-to-import pipeline run, `YYYYMMDD_uploadN`.
///
/// The numeric suffix counts existing same-day session folders plus one, so
/// re-uploading on the same calendar day yields `_upload1`, `_upload2`, ...
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Allocates the next session id for `date` by scanning `uploads_root`.
    pub fn allocate(uploads_root: &Path, date: NaiveDate) -> Result<Self, AppError> {
        let prefix = format!("{}_upload", date.format("%Y%m%d"));

        let mut existing = 0usize;
        if uploads_root.is_dir() {
            for entry in std::fs::read_dir(uploads_root)? {
                let entry = entry?;
                if !entry.path().is_dir() {
                    continue;
                }
                if entry.file_name().to_string_lossy().starts_with(&prefix) {
                    existing = existing.saturating_add(1);
                }
            }
        }

        Ok(Self(format!("{}{}", prefix, existing.saturating_add(1))))
    }

    /// Wraps an existing folder name, e.g. when reactivating a historical
    /// session or re-importing a persisted output folder.
    pub fn from_folder_name(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date")
    }

    #[test]
    fn first_session_of_the_day() {
        let dir = tempfile::tempdir().expect("tempdir");
        let id = SessionId::allocate(dir.path(), day()).expect("allocate");
        assert_eq!(id.as_str(), "20250101_upload1");
    }

    #[test]
    fn suffix_increments_per_existing_folder() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("20250101_upload1")).expect("mkdir");
        std::fs::create_dir(dir.path().join("20250101_upload2")).expect("mkdir");
        // Folders from other days do not count.
        std::fs::create_dir(dir.path().join("20241231_upload1")).expect("mkdir");
        // Plain files do not count either.
        std::fs::write(dir.path().join("20250101_upload9"), b"").expect("write");

        let id = SessionId::allocate(dir.path(), day()).expect("allocate");
        assert_eq!(id.as_str(), "20250101_upload3");
    }

    #[test]
    fn allocation_tolerates_missing_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let id = SessionId::allocate(&dir.path().join("absent"), day()).expect("allocate");
        assert_eq!(id.as_str(), "20250101_upload1");
    }
}
