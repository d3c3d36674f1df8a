use std::sync::Arc;

use async_openai::config::OpenAIConfig;
use common::{
    storage::{db::SqliteClient, types::active_dataset::ActiveDatasetStore},
    utils::{config::AppConfig, layout::DataLayout},
};
use ingestion_pipeline::IngestionPipeline;

#[derive(Clone)]
pub struct ApiState {
    pub db: SqliteClient,
    pub layout: DataLayout,
    pub active: ActiveDatasetStore,
    pub config: AppConfig,
    pub openai_client: Arc<async_openai::Client<OpenAIConfig>>,
    pub pipeline: Arc<IngestionPipeline>,
}

impl ApiState {
    pub fn new(config: &AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let layout = DataLayout::new(config.data_dir.clone());
        layout.ensure()?;

        let db = SqliteClient::new(layout.db_path());
        let active = ActiveDatasetStore::new(layout.active_tables_path());

        let openai_client = Arc::new(async_openai::Client::with_config(
            OpenAIConfig::new()
                .with_api_key(&config.openai_api_key)
                .with_api_base(&config.openai_base_url),
        ));

        let pipeline = Arc::new(IngestionPipeline::new(
            db.clone(),
            layout.clone(),
            active.clone(),
            config,
        ));

        Ok(Self {
            db,
            layout,
            active,
            config: config.clone(),
            openai_client,
            pipeline,
        })
    }
}
