use std::{path::Path, process::Command};

use common::error::AppError;
use tracing::{error, info};

/// External collaborators of the pipeline, behind a seam so tests can run
/// without the real converter binary.
pub trait PipelineServices: Send + Sync {
    /// Runs the converter as `<converter> <payload> <output_dir>` and waits
    /// for it to finish. Exit status is authoritative; stdout/stderr are
    /// captured for the logs only.
    fn run_converter(&self, payload: &Path, output_dir: &Path) -> Result<(), AppError>;
}

/// Default implementation shelling out to the configured converter command.
///
/// No timeout is imposed; a hung converter hangs the request. Known gap,
/// kept behind this trait so a bounded runner can replace it.
pub struct DefaultPipelineServices {
    converter_command: String,
}

impl DefaultPipelineServices {
    pub fn new(converter_command: impl Into<String>) -> Self {
        Self {
            converter_command: converter_command.into(),
        }
    }
}

impl PipelineServices for DefaultPipelineServices {
    fn run_converter(&self, payload: &Path, output_dir: &Path) -> Result<(), AppError> {
        info!(
            command = %self.converter_command,
            payload = %payload.display(),
            output_dir = %output_dir.display(),
            "running converter"
        );

        let output = Command::new(&self.converter_command)
            .arg(payload)
            .arg(output_dir)
            .output()
            .map_err(|err| {
                AppError::ConverterFailed(format!(
                    "failed to launch {}: {err}",
                    self.converter_command
                ))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stdout.trim().is_empty() {
            info!(stdout = %stdout.trim_end(), "converter stdout");
        }
        if !stderr.trim().is_empty() {
            info!(stderr = %stderr.trim_end(), "converter stderr");
        }

        if !output.status.success() {
            error!(status = %output.status, "converter exited with failure");
            return Err(AppError::ConverterFailed(format!(
                "converter exited with {}",
                output.status
            )));
        }

        info!("converter completed successfully");
        Ok(())
    }
}
