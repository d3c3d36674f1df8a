use std::{
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub folder_name: String,
    pub upload_path: String,
    pub upload_files: Vec<String>,
    pub output_path: Option<String>,
    pub output_files: Vec<String>,
    /// Unix timestamp of the upload folder, so the frontend can pick the
    /// most recent entry.
    pub created_at: f64,
}

/// Lists all past upload sessions with their converter outputs, newest first.
pub async fn upload_history(
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ApiError> {
    let uploads_root = state.layout.uploads();
    let mut folders: Vec<(SystemTime, std::path::PathBuf)> = Vec::new();

    if uploads_root.is_dir() {
        for entry in std::fs::read_dir(&uploads_root).map_err(common::error::AppError::from)? {
            let entry = entry.map_err(common::error::AppError::from)?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|meta| meta.modified())
                .unwrap_or(UNIX_EPOCH);
            folders.push((modified, path));
        }
    }
    folders.sort_by(|a, b| b.0.cmp(&a.0));

    let mut history = Vec::with_capacity(folders.len());
    for (modified, folder) in folders {
        let Some(folder_name) = folder.file_name().map(|n| n.to_string_lossy().into_owned())
        else {
            continue;
        };

        let output_folder = state.layout.session_output_dir(&folder_name);
        let output_files = if output_folder.is_dir() {
            list_files_with_extension(&output_folder, "csv")
        } else {
            Vec::new()
        };

        history.push(HistoryEntry {
            upload_files: list_files(&folder),
            upload_path: folder.display().to_string(),
            output_path: output_folder
                .is_dir()
                .then(|| output_folder.display().to_string()),
            output_files,
            created_at: modified
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs_f64())
                .unwrap_or(0.0),
            folder_name,
        });
    }

    info!(entries = history.len(), "upload history requested");
    Ok(Json(json!({ "history": history })))
}

fn list_files(folder: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(folder) else {
        return Vec::new();
    };
    let mut files: Vec<String> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .map(|path| path.display().to_string())
        .collect();
    files.sort();
    files
}

fn list_files_with_extension(folder: &Path, extension: &str) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(folder) else {
        return Vec::new();
    };
    let mut files: Vec<String> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
                    .unwrap_or(false)
        })
        .map(|path| path.display().to_string())
        .collect();
    files.sort();
    files
}
