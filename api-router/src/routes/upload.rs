use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_typed_multipart::{FieldData, TryFromMultipart, TypedMultipart};
use serde_json::json;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, TryFromMultipart)]
pub struct UploadParams {
    /// The uploaded performance bundle, spooled to a temp file.
    #[form_data(limit = "unlimited")]
    pub file: FieldData<NamedTempFile>,
}

/// Accepts a zip bundle and runs the full ingestion pipeline on it.
///
/// Fatal pipeline stages still answer 200 with a `{ message, error }` body;
/// the dashboard surfaces the message instead of a raw HTTP failure.
pub async fn upload_archive(
    State(state): State<ApiState>,
    TypedMultipart(input): TypedMultipart<UploadParams>,
) -> Result<impl IntoResponse, ApiError> {
    let original_filename = input
        .file
        .metadata
        .file_name
        .clone()
        .unwrap_or_else(|| "upload.zip".to_string());

    info!(file_name = %original_filename, "received upload request");

    let pipeline = state.pipeline.clone();
    let temp_file = input.file.contents;
    let outcome = tokio::task::spawn_blocking(move || {
        let result = pipeline.ingest_archive(temp_file.path(), &original_filename);
        drop(temp_file);
        result
    })
    .await
    .map_err(common::error::AppError::from)?;

    match outcome {
        Ok(report) => Ok((StatusCode::OK, Json(json!(report)))),
        Err(failure) => {
            warn!(message = %failure.message, error = %failure.error, "upload ingestion failed");
            Ok((
                StatusCode::OK,
                Json(json!({
                    "message": failure.message,
                    "error": failure.error,
                })),
            ))
        }
    }
}
