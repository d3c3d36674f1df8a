mod config;
mod context;
mod report;
mod services;
mod stages;
mod state;

pub use config::PipelineConfig;
pub use report::{ImportedTable, IngestFailure, IngestReport};
#[allow(clippy::module_name_repetitions)]
pub use services::{DefaultPipelineServices, PipelineServices};

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::Local;
use common::{
    error::AppError,
    storage::{
        db::SqliteClient,
        types::{active_dataset::ActiveDatasetStore, session::SessionId},
    },
    utils::{config::AppConfig, layout::DataLayout},
};
use tracing::{info, warn};

use self::{context::PipelineContext, state::received};
use crate::utils::import::import_csv;

/// Sequences one upload from saved archive to refreshed active-dataset
/// pointer. One pipeline run is a single sequential unit of work; there is
/// no internal parallelism.
#[allow(clippy::module_name_repetitions)]
pub struct IngestionPipeline {
    db: SqliteClient,
    layout: DataLayout,
    active: ActiveDatasetStore,
    pipeline_config: PipelineConfig,
    services: Arc<dyn PipelineServices>,
}

impl IngestionPipeline {
    pub fn new(
        db: SqliteClient,
        layout: DataLayout,
        active: ActiveDatasetStore,
        config: &AppConfig,
    ) -> Self {
        let services = DefaultPipelineServices::new(config.converter_command.clone());
        Self::with_services(
            db,
            layout,
            active,
            PipelineConfig::from_app_config(config),
            Arc::new(services),
        )
    }

    pub fn with_services(
        db: SqliteClient,
        layout: DataLayout,
        active: ActiveDatasetStore,
        pipeline_config: PipelineConfig,
        services: Arc<dyn PipelineServices>,
    ) -> Self {
        Self {
            db,
            layout,
            active,
            pipeline_config,
            services,
        }
    }

    /// Runs the full ingestion pipeline for a saved upload.
    ///
    /// `archive` is wherever the HTTP layer spooled the request body;
    /// `original_filename` is the client-provided name the archive keeps
    /// inside its session folder.
    #[tracing::instrument(skip_all, fields(original_filename))]
    pub fn ingest_archive(
        &self,
        archive: &Path,
        original_filename: &str,
    ) -> Result<IngestReport, IngestFailure> {
        self.drive(archive, original_filename)
            .map_err(|err| IngestFailure::from_error(&err, &self.pipeline_config.payload_filename))
    }

    fn drive(&self, archive: &Path, original_filename: &str) -> Result<IngestReport, AppError> {
        let session = self.create_session()?;
        let archive_path = self.save_archive(archive, original_filename, &session)?;
        info!(session = %session, archive = %archive_path.display(), "starting upload ingestion");

        let mut ctx = PipelineContext::new(
            session.clone(),
            archive_path,
            &self.db,
            &self.layout,
            &self.active,
            &self.pipeline_config,
            self.services.as_ref(),
        );

        let machine = received();
        let pipeline_started = Instant::now();

        let stage_start = Instant::now();
        let machine =
            stages::extract(machine, &mut ctx).map_err(|err| Self::fail(&mut ctx, err))?;
        let extract_duration = stage_start.elapsed();

        let stage_start = Instant::now();
        let machine = stages::route(machine, &mut ctx).map_err(|err| Self::fail(&mut ctx, err))?;
        let route_duration = stage_start.elapsed();

        let stage_start = Instant::now();
        let machine =
            stages::locate_payload(machine, &mut ctx).map_err(|err| Self::fail(&mut ctx, err))?;
        let locate_duration = stage_start.elapsed();

        let stage_start = Instant::now();
        let machine =
            stages::convert(machine, &mut ctx).map_err(|err| Self::fail(&mut ctx, err))?;
        let convert_duration = stage_start.elapsed();

        let stage_start = Instant::now();
        let machine = stages::import(machine, &mut ctx).map_err(|err| Self::fail(&mut ctx, err))?;
        let import_duration = stage_start.elapsed();

        let stage_start = Instant::now();
        let machine =
            stages::update_pointer(machine, &mut ctx).map_err(|err| Self::fail(&mut ctx, err))?;
        let pointer_duration = stage_start.elapsed();

        let stage_start = Instant::now();
        let _machine =
            stages::cleanup(machine, &mut ctx).map_err(|err| Self::fail(&mut ctx, err))?;
        let cleanup_duration = stage_start.elapsed();

        info!(
            session = %ctx.session,
            total_ms = Self::duration_millis(pipeline_started.elapsed()),
            extract_ms = Self::duration_millis(extract_duration),
            route_ms = Self::duration_millis(route_duration),
            locate_ms = Self::duration_millis(locate_duration),
            convert_ms = Self::duration_millis(convert_duration),
            import_ms = Self::duration_millis(import_duration),
            pointer_ms = Self::duration_millis(pointer_duration),
            cleanup_ms = Self::duration_millis(cleanup_duration),
            tables = ctx.imported.len(),
            import_failures = ctx.import_failures.len(),
            manifest_fallback = ctx.used_manifest_fallback,
            "upload ingestion finished"
        );

        Ok(IngestReport {
            message: format!("File uploaded successfully under directory {session}"),
            converter_success: true,
            csv_count: ctx.imported.len(),
            tables: ctx.imported.clone(),
            active_folder: session.to_string(),
            active_tables: ctx.table_names(),
            refresh_performance: ctx.pointer_refreshed,
        })
    }

    /// On startup, re-import every CSV of the most recently modified output
    /// folder so the store reflects the latest dataset after a restart.
    pub fn reimport_latest(&self) -> Result<usize, AppError> {
        let output_root = self.layout.output_csv();
        if !output_root.is_dir() {
            info!("no output folders found to re-import");
            return Ok(0);
        }

        let mut latest: Option<(std::time::SystemTime, PathBuf)> = None;
        for entry in std::fs::read_dir(&output_root)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let modified = entry.metadata()?.modified()?;
            if latest.as_ref().map(|(t, _)| modified > *t).unwrap_or(true) {
                latest = Some((modified, path));
            }
        }
        let Some((_, folder)) = latest else {
            info!("no output folders found to re-import");
            return Ok(0);
        };

        let Some(folder_name) = folder.file_name().map(|n| n.to_string_lossy().into_owned())
        else {
            return Ok(0);
        };
        let session = SessionId::from_folder_name(folder_name);

        let mut csv_files: Vec<PathBuf> = std::fs::read_dir(&folder)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("csv"))
                        .unwrap_or(false)
            })
            .collect();
        csv_files.sort();

        let mut imported = 0usize;
        for csv_file in &csv_files {
            match import_csv(&self.db, csv_file, &session) {
                Ok(table) => {
                    imported = imported.saturating_add(1);
                    info!(table = %table.table_name, rows = table.rows, "re-imported CSV on startup");
                }
                Err(err) => {
                    warn!(file = %csv_file.display(), error = %err, "failed to re-import CSV on startup");
                }
            }
        }

        info!(session = %session, imported, "startup re-ingestion complete");
        Ok(imported)
    }

    fn create_session(&self) -> Result<SessionId, AppError> {
        let uploads_root = self.layout.uploads();
        std::fs::create_dir_all(&uploads_root)?;
        let session = SessionId::allocate(&uploads_root, Local::now().date_naive())?;
        std::fs::create_dir_all(self.layout.session_upload_dir(session.as_str()))?;
        Ok(session)
    }

    fn save_archive(
        &self,
        archive: &Path,
        original_filename: &str,
        session: &SessionId,
    ) -> Result<PathBuf, AppError> {
        // Only the final path component of the client-provided name is used.
        let file_name = Path::new(original_filename)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "upload.zip".to_string());

        let dest = self
            .layout
            .session_upload_dir(session.as_str())
            .join(file_name);
        std::fs::copy(archive, &dest)?;
        Ok(dest)
    }

    fn fail(ctx: &mut PipelineContext<'_>, err: AppError) -> AppError {
        let err = ctx.abort(err);
        stages::remove_session_artifacts(ctx);
        err
    }

    fn duration_millis(duration: Duration) -> u64 {
        u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
    }
}
