use std::path::PathBuf;

use common::{
    error::AppError,
    storage::{
        db::SqliteClient,
        types::{active_dataset::ActiveDatasetStore, session::SessionId},
    },
    utils::layout::DataLayout,
};
use tracing::error;

use super::{config::PipelineConfig, report::ImportedTable, services::PipelineServices};

/// Mutable state threaded through the pipeline stages of one upload session.
pub struct PipelineContext<'a> {
    pub session: SessionId,
    pub db: &'a SqliteClient,
    pub layout: &'a DataLayout,
    pub active: &'a ActiveDatasetStore,
    pub pipeline_config: &'a PipelineConfig,
    pub services: &'a dyn PipelineServices,
    /// Where the uploaded archive was saved, `uploads/<session>/<name>`.
    pub archive_path: PathBuf,
    /// Transient extraction workspace, `uploads/<session>/_extracted`.
    pub extract_root: PathBuf,
    /// Converter output directory, `output_csv/<session>`.
    pub output_dir: PathBuf,
    pub payload: Option<PathBuf>,
    pub logs_routed: usize,
    pub properties_routed: usize,
    pub imported: Vec<ImportedTable>,
    /// Per-file import failures: (file name, reason). Non-fatal by design.
    pub import_failures: Vec<(String, String)>,
    pub used_manifest_fallback: bool,
    pub pointer_refreshed: bool,
}

impl<'a> PipelineContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session: SessionId,
        archive_path: PathBuf,
        db: &'a SqliteClient,
        layout: &'a DataLayout,
        active: &'a ActiveDatasetStore,
        pipeline_config: &'a PipelineConfig,
        services: &'a dyn PipelineServices,
    ) -> Self {
        let extract_root = layout
            .session_upload_dir(session.as_str())
            .join("_extracted");
        let output_dir = layout.session_output_dir(session.as_str());
        Self {
            session,
            db,
            layout,
            active,
            pipeline_config,
            services,
            archive_path,
            extract_root,
            output_dir,
            payload: None,
            logs_routed: 0,
            properties_routed: 0,
            imported: Vec::new(),
            import_failures: Vec::new(),
            used_manifest_fallback: false,
            pointer_refreshed: false,
        }
    }

    pub fn payload(&self) -> Result<&PathBuf, AppError> {
        self.payload
            .as_ref()
            .ok_or_else(|| AppError::InternalError("payload expected to be located".into()))
    }

    pub fn table_names(&self) -> Vec<String> {
        self.imported
            .iter()
            .map(|table| table.table_name.clone())
            .collect()
    }

    pub fn abort(&mut self, err: AppError) -> AppError {
        error!(
            session = %self.session,
            error = %err,
            "upload ingestion aborted"
        );
        err
    }
}
