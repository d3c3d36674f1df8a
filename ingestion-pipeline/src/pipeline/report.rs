use common::error::AppError;
use serde::Serialize;

/// One table created (or declared by the manifest fallback) during import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportedTable {
    #[serde(rename = "tableName")]
    pub table_name: String,
    pub rows: u64,
}

/// Structured summary returned on a completed upload. Field names are the
/// wire contract consumed by the dashboard frontend.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub message: String,
    pub converter_success: bool,
    pub csv_count: usize,
    pub tables: Vec<ImportedTable>,
    pub active_folder: String,
    pub active_tables: Vec<String>,
    pub refresh_performance: bool,
}

/// A fatal pipeline stage, shaped for the `{ message, error }` response.
#[derive(Debug)]
pub struct IngestFailure {
    /// Human-readable stage description.
    pub message: String,
    /// Raw error detail.
    pub error: String,
}

impl IngestFailure {
    /// Maps the fatal taxonomy onto the user-visible messages.
    pub fn from_error(err: &AppError, payload_filename: &str) -> Self {
        let (message, error) = match err {
            AppError::CorruptArchive(detail) => ("Invalid zip file".to_string(), detail.clone()),
            AppError::Extraction(detail) => ("Zip extraction failed".to_string(), detail.clone()),
            AppError::PayloadMissing(_) => (
                format!("{payload_filename} not found in uploaded zip"),
                format!("Missing {payload_filename}"),
            ),
            AppError::ConverterFailed(detail) => {
                ("Java converter failed".to_string(), detail.clone())
            }
            other => ("Upload ingestion failed".to_string(), other.to_string()),
        };
        Self { message, error }
    }
}
