use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// File the converter may drop next to its CSV output, enumerating what it
/// produced. Consulted only when zero CSV files could be imported.
pub const MANIFEST_FILE_NAME: &str = "conversion_summary.json";

/// One produced logical table as declared by the converter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(rename = "tableName")]
    pub table_name: String,
    #[serde(default)]
    pub rows: u64,
}

/// Loads the manifest from a session output directory, tolerating a missing
/// file, a non-array document, and malformed elements. Best-effort by
/// contract: the converter owns this file and may not write it at all.
pub fn load_conversion_manifest(output_dir: &Path) -> Vec<ManifestEntry> {
    let path = output_dir.join(MANIFEST_FILE_NAME);
    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "conversion manifest not found");
            return Vec::new();
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to read conversion manifest");
            return Vec::new();
        }
    };

    let document: Value = match serde_json::from_slice(&bytes) {
        Ok(document) => document,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "conversion manifest is not valid JSON");
            return Vec::new();
        }
    };

    let Value::Array(items) = document else {
        warn!(path = %path.display(), "conversion manifest is not a list");
        return Vec::new();
    };

    items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<ManifestEntry>(item).ok())
        .filter(|entry| !entry.table_name.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_manifest_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(load_conversion_manifest(dir.path()).is_empty());
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join(MANIFEST_FILE_NAME),
            r#"[
                {"tableName": "CacheStatistics", "rows": 10665},
                {"rows": 3},
                "not an object",
                {"tableName": "TopSQLStats"}
            ]"#,
        )
        .expect("write");

        let entries = load_conversion_manifest(dir.path());
        assert_eq!(
            entries,
            vec![
                ManifestEntry {
                    table_name: "CacheStatistics".to_string(),
                    rows: 10665,
                },
                ManifestEntry {
                    table_name: "TopSQLStats".to_string(),
                    rows: 0,
                },
            ]
        );
    }

    #[test]
    fn non_array_document_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(MANIFEST_FILE_NAME), r#"{"tableName": "x"}"#)
            .expect("write");
        assert!(load_conversion_manifest(dir.path()).is_empty());
    }
}
