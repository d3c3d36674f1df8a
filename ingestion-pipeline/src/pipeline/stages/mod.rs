use common::{error::AppError, storage::types::conversion_manifest::load_conversion_manifest};
use state_machines::core::GuardError;
use tracing::{info, instrument, warn};

use crate::utils::{archive, import::import_csv, routing};

use super::{
    context::PipelineContext,
    report::ImportedTable,
    state::{
        Cleaned, Converted, Extracted, Imported, PayloadLocated, PointerUpdated, Received, Routed,
        UploadMachine,
    },
};

/// Stage 1: unpack the saved archive into the session workspace.
#[instrument(level = "trace", skip_all, fields(session = %ctx.session))]
pub fn extract(
    machine: UploadMachine<(), Received>,
    ctx: &mut PipelineContext<'_>,
) -> Result<UploadMachine<(), Extracted>, AppError> {
    archive::extract_archive(&ctx.archive_path, &ctx.extract_root)?;

    machine
        .extract()
        .map_err(|(_, guard)| map_guard_error("extract", &guard))
}

/// Stage 2: unpack nested archives, then route side files.
///
/// Everything here is best-effort: a nested archive that fails to extract or
/// a file that fails to move is logged and skipped, and a failure routing one
/// extension never blocks the other.
#[instrument(level = "trace", skip_all, fields(session = %ctx.session))]
pub fn route(
    machine: UploadMachine<(), Extracted>,
    ctx: &mut PipelineContext<'_>,
) -> Result<UploadMachine<(), Routed>, AppError> {
    let nested = archive::extract_nested_archives(
        &ctx.extract_root,
        ctx.pipeline_config.max_archive_depth,
    );

    ctx.logs_routed = routing::route_files_by_extension(
        &ctx.extract_root,
        &ctx.session,
        &ctx.pipeline_config.log_extension,
        &ctx.layout.server_logs(),
    );
    ctx.properties_routed = routing::route_files_by_extension(
        &ctx.extract_root,
        &ctx.session,
        &ctx.pipeline_config.properties_extension,
        &ctx.layout.properties(),
    );

    info!(
        session = %ctx.session,
        nested_archives = nested,
        logs = ctx.logs_routed,
        properties = ctx.properties_routed,
        "file routing done"
    );

    machine
        .route()
        .map_err(|(_, guard)| map_guard_error("route", &guard))
}

/// Stage 3: locate the single required payload. Fatal when absent.
#[instrument(level = "trace", skip_all, fields(session = %ctx.session))]
pub fn locate_payload(
    machine: UploadMachine<(), Routed>,
    ctx: &mut PipelineContext<'_>,
) -> Result<UploadMachine<(), PayloadLocated>, AppError> {
    let payload_name = &ctx.pipeline_config.payload_filename;
    let found = routing::find_payload(&ctx.extract_root, payload_name).ok_or_else(|| {
        AppError::PayloadMissing(format!(
            "no {payload_name} under {}",
            ctx.extract_root.display()
        ))
    })?;
    ctx.payload = Some(found);

    machine
        .locate()
        .map_err(|(_, guard)| map_guard_error("locate", &guard))
}

/// Stage 4: run the external converter against the payload.
#[instrument(level = "trace", skip_all, fields(session = %ctx.session))]
pub fn convert(
    machine: UploadMachine<(), PayloadLocated>,
    ctx: &mut PipelineContext<'_>,
) -> Result<UploadMachine<(), Converted>, AppError> {
    std::fs::create_dir_all(&ctx.output_dir)?;
    let payload = ctx.payload()?.clone();
    ctx.services.run_converter(&payload, &ctx.output_dir)?;

    machine
        .convert()
        .map_err(|(_, guard)| map_guard_error("convert", &guard))
}

/// Stage 5: import every produced CSV, folding per-file failures.
///
/// One bad file never aborts the batch. When nothing at all could be
/// imported, the converter's manifest (if any) populates the response
/// instead, without re-derived row counts from the store.
#[instrument(level = "trace", skip_all, fields(session = %ctx.session))]
pub fn import(
    machine: UploadMachine<(), Converted>,
    ctx: &mut PipelineContext<'_>,
) -> Result<UploadMachine<(), Imported>, AppError> {
    let mut csv_files: Vec<_> = routing::walk_files(&ctx.output_dir)
        .into_iter()
        .filter(|path| {
            path.extension()
                .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("csv"))
                .unwrap_or(false)
        })
        .collect();
    csv_files.sort();

    info!(session = %ctx.session, count = csv_files.len(), "importing converter output files");

    for csv_file in &csv_files {
        match import_csv(ctx.db, csv_file, &ctx.session) {
            Ok(imported) => ctx.imported.push(imported),
            Err(err) => {
                warn!(
                    session = %ctx.session,
                    file = %csv_file.display(),
                    error = %err,
                    "failed to import CSV, continuing with remaining files"
                );
                ctx.import_failures
                    .push((csv_file.display().to_string(), err.to_string()));
            }
        }
    }

    if ctx.imported.is_empty() {
        warn!(session = %ctx.session, "no CSV imported, consulting conversion manifest");
        let fallback = load_conversion_manifest(&ctx.output_dir);
        if fallback.is_empty() {
            warn!(session = %ctx.session, "no conversion manifest available either");
        } else {
            ctx.used_manifest_fallback = true;
            ctx.imported = fallback
                .into_iter()
                .map(|entry| ImportedTable {
                    table_name: entry.table_name,
                    rows: entry.rows,
                })
                .collect();
        }
    }

    machine
        .import()
        .map_err(|(_, guard)| map_guard_error("import", &guard))
}

/// Stage 6: point the active dataset at this session.
///
/// A pointer write failure is logged only; the ingestion itself already
/// succeeded.
#[instrument(level = "trace", skip_all, fields(session = %ctx.session))]
pub fn update_pointer(
    machine: UploadMachine<(), Imported>,
    ctx: &mut PipelineContext<'_>,
) -> Result<UploadMachine<(), PointerUpdated>, AppError> {
    let tables = ctx.table_names();
    match ctx.active.set(ctx.session.as_str(), &tables) {
        Ok(_) => ctx.pointer_refreshed = true,
        Err(err) => {
            warn!(session = %ctx.session, error = %err, "failed to write active dataset pointer");
        }
    }

    machine
        .update_pointer()
        .map_err(|(_, guard)| map_guard_error("update_pointer", &guard))
}

/// Stage 7: delete the extraction workspace and, per configuration, the
/// saved archive.
#[instrument(level = "trace", skip_all, fields(session = %ctx.session))]
pub fn cleanup(
    machine: UploadMachine<(), PointerUpdated>,
    ctx: &mut PipelineContext<'_>,
) -> Result<UploadMachine<(), Cleaned>, AppError> {
    remove_session_artifacts(ctx);

    machine
        .cleanup()
        .map_err(|(_, guard)| map_guard_error("cleanup", &guard))
}

/// Best-effort removal of transient session artifacts. Runs on success and
/// on the fatal abort paths alike.
pub fn remove_session_artifacts(ctx: &PipelineContext<'_>) {
    if ctx.pipeline_config.cleanup_extracted {
        remove_path(&ctx.extract_root);
    }
    if ctx.pipeline_config.cleanup_archive {
        remove_path(&ctx.archive_path);
    }
}

fn remove_path(path: &std::path::Path) {
    if !path.exists() {
        return;
    }
    let result = if path.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    match result {
        Ok(()) => info!(path = %path.display(), "cleaned up"),
        Err(err) => warn!(path = %path.display(), error = %err, "cleanup failed"),
    }
}

fn map_guard_error(event: &str, guard: &GuardError) -> AppError {
    AppError::InternalError(format!(
        "invalid upload pipeline transition during {event}: {guard:?}"
    ))
}
