use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Program invoked as `<converter> <payload> <output_dir>`.
    #[serde(default = "default_converter_command")]
    pub converter_command: String,
    /// Filename of the required binary capture inside the uploaded bundle.
    #[serde(default = "default_payload_filename")]
    pub payload_filename: String,
    /// Keep the originally uploaded archive after ingestion.
    #[serde(default)]
    pub keep_uploaded_archives: bool,
    #[serde(default = "default_upload_max_body_bytes")]
    pub upload_max_body_bytes: usize,
    #[serde(default = "default_cors_origin")]
    pub cors_allowed_origin: String,
    #[serde(default = "default_openai_api_key")]
    pub openai_api_key: String,
    #[serde(default = "default_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_insight_model")]
    pub insight_model: String,
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_http_port() -> u16 {
    8000
}

fn default_converter_command() -> String {
    "convert-perf-to-csv".to_string()
}

fn default_payload_filename() -> String {
    "JMXData.gz".to_string()
}

fn default_upload_max_body_bytes() -> usize {
    512 * 1024 * 1024
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_openai_api_key() -> String {
    // Local OpenAI-compatible servers ignore the key but the client requires one.
    "local".to_string()
}

fn default_base_url() -> String {
    "http://localhost:11434/v1".to_string()
}

fn default_insight_model() -> String {
    "llama3".to_string()
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            http_port: default_http_port(),
            converter_command: default_converter_command(),
            payload_filename: default_payload_filename(),
            keep_uploaded_archives: false,
            upload_max_body_bytes: default_upload_max_body_bytes(),
            cors_allowed_origin: default_cors_origin(),
            openai_api_key: default_openai_api_key(),
            openai_base_url: default_base_url(),
            insight_model: default_insight_model(),
        }
    }
}
