use common::utils::config::AppConfig;

/// Tuning knobs for one ingestion run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Name of the single required capture file inside the bundle.
    pub payload_filename: String,
    /// Extension routed to the server-logs area.
    pub log_extension: String,
    /// Extension routed to the properties area.
    pub properties_extension: String,
    /// Upper bound on nested-archive extraction passes.
    pub max_archive_depth: u32,
    /// Delete the extraction workspace after the run.
    pub cleanup_extracted: bool,
    /// Delete the originally uploaded archive after the run.
    pub cleanup_archive: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            payload_filename: "JMXData.gz".to_string(),
            log_extension: "log".to_string(),
            properties_extension: "properties".to_string(),
            max_archive_depth: 4,
            cleanup_extracted: true,
            cleanup_archive: true,
        }
    }
}

impl PipelineConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            payload_filename: config.payload_filename.clone(),
            cleanup_archive: !config.keep_uploaded_archives,
            ..Self::default()
        }
    }
}
