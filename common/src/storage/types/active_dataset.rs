use std::{
    io::Write,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{error::AppError, storage::db::SqliteClient};

/// The singleton record naming the dataset all query endpoints resolve
/// against: `{ "folder": <session>|null, "tables": [..] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveDataset {
    pub folder: Option<String>,
    #[serde(default)]
    pub tables: Vec<String>,
}

/// Persistence for the active-dataset pointer.
///
/// Injected wherever "current data" must be resolved; never a process-wide
/// global.
#[derive(Debug, Clone)]
pub struct ActiveDatasetStore {
    path: PathBuf,
}

impl ActiveDatasetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the current pointer. A missing or corrupt file is treated as
    /// "unset": logged, never fatal to callers.
    pub fn get(&self) -> ActiveDataset {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return ActiveDataset::default();
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to read active dataset pointer");
                return ActiveDataset::default();
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(dataset) => dataset,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "active dataset pointer is corrupt, treating as unset");
                ActiveDataset::default()
            }
        }
    }

    /// Atomically overwrites the pointer (write temp, then rename).
    pub fn set(&self, folder: &str, tables: &[String]) -> Result<ActiveDataset, AppError> {
        let dataset = ActiveDataset {
            folder: Some(folder.to_string()),
            tables: tables.to_vec(),
        };

        let parent = self
            .path
            .parent()
            .ok_or_else(|| AppError::InternalError("pointer path has no parent directory".into()))?;
        std::fs::create_dir_all(parent)?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        serde_json::to_writer_pretty(&mut tmp, &dataset)?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|err| AppError::Io(err.error))?;

        info!(folder, table_count = dataset.tables.len(), "active dataset pointer updated");
        Ok(dataset)
    }

    /// Recomputes the table list for `folder` by prefix match against all
    /// store tables, then persists the result. Used when reactivating a
    /// historical session whose table list was never persisted or is stale.
    pub fn rederive(&self, db: &SqliteClient, folder: &str) -> Result<ActiveDataset, AppError> {
        let tables: Vec<String> = db
            .list_tables()?
            .into_iter()
            .filter(|table| table.starts_with(folder))
            .collect();

        self.set(folder, &tables)
    }
}
