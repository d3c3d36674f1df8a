use async_openai::error::OpenAIError;
use thiserror::Error;
use tokio::task::JoinError;

// Core internal errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("OpenAI error: {0}")]
    OpenAI(#[from] OpenAIError),
    #[error("Invalid archive: {0}")]
    CorruptArchive(String),
    #[error("Archive extraction failed: {0}")]
    Extraction(String),
    #[error("Payload missing: {0}")]
    PayloadMissing(String),
    #[error("Converter failed: {0}")]
    ConverterFailed(String),
    #[error("Import failed: {0}")]
    Import(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Task join error: {0}")]
    Join(#[from] JoinError),
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Internal service error: {0}")]
    InternalError(String),
}
