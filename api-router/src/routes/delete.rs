use std::path::Path;

use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::api_state::ApiState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeleteOptions {
    pub database: bool,
    pub output_csv: bool,
    pub logs: bool,
    pub uploads: bool,
}

/// Deletes the selected data categories. Each category reports its own
/// outcome; one failure never blocks the others.
pub async fn delete_data(
    State(state): State<ApiState>,
    Json(options): Json<DeleteOptions>,
) -> impl IntoResponse {
    let mut summary = Map::new();

    if options.database {
        let db_path = state.db.path();
        let outcome = if db_path.exists() {
            match std::fs::remove_file(db_path) {
                Ok(()) => {
                    info!(path = %db_path.display(), "deleted database");
                    "deleted".to_string()
                }
                Err(err) => {
                    warn!(path = %db_path.display(), error = %err, "failed to delete database");
                    format!("error: {err}")
                }
            }
        } else {
            "not found".to_string()
        };
        summary.insert("database".to_string(), Value::from(outcome));
    }

    if options.output_csv {
        summary.insert(
            "output_csv".to_string(),
            Value::from(clear_directory(&state.layout.output_csv())),
        );
    }

    if options.logs {
        summary.insert(
            "logs".to_string(),
            Value::from(clear_directory(&state.layout.server_logs())),
        );
    }

    if options.uploads {
        summary.insert(
            "uploads".to_string(),
            Value::from(clear_directory(&state.layout.uploads())),
        );
    }

    Json(json!({ "summary": summary }))
}

/// Removes everything inside `dir`, keeping the directory itself.
fn clear_directory(dir: &Path) -> String {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return "deleted".to_string();
        }
        Err(err) => {
            warn!(path = %dir.display(), error = %err, "failed to list directory for deletion");
            return format!("error: {err}");
        }
    };

    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        let result = if path.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        if let Err(err) = result {
            warn!(path = %path.display(), error = %err, "failed to delete entry");
            return format!("error: {err}");
        }
    }

    info!(path = %dir.display(), "cleared directory");
    "deleted".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_directory_keeps_the_directory_itself() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("uploads");
        std::fs::create_dir_all(target.join("20250101_upload1")).expect("mkdir");
        std::fs::write(target.join("20250101_upload1/bundle.zip"), b"zip").expect("write");
        std::fs::write(target.join("stray.txt"), b"x").expect("write");

        assert_eq!(clear_directory(&target), "deleted");
        assert!(target.is_dir());
        assert_eq!(std::fs::read_dir(&target).expect("read_dir").count(), 0);
    }

    #[test]
    fn clearing_a_missing_directory_is_not_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(clear_directory(&dir.path().join("nope")), "deleted");
    }
}
