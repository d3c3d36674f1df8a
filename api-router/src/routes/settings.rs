use axum::{extract::State, response::IntoResponse, Json};
use common::storage::types::app_settings::{AppSettings, SettingsPatch, SUPPORTED_LANGUAGES};
use serde_json::json;
use tracing::info;

use crate::{api_state::ApiState, error::ApiError};

/// Returns the persisted settings, falling back to defaults.
pub async fn get_settings(State(state): State<ApiState>) -> impl IntoResponse {
    let settings = AppSettings::load(&state.layout.settings_path());
    Json(settings)
}

/// Merges a partial update into the persisted settings.
pub async fn update_settings(
    State(state): State<ApiState>,
    Json(patch): Json<SettingsPatch>,
) -> Result<impl IntoResponse, ApiError> {
    let path = state.layout.settings_path();
    let merged = AppSettings::load(&path).apply(patch);
    merged.save(&path)?;

    info!(?merged, "settings updated");
    Ok(Json(json!({
        "message": "Settings saved",
        "settings": merged,
    })))
}

/// Languages the dashboard can offer.
pub async fn supported_languages() -> impl IntoResponse {
    let languages: Vec<_> = SUPPORTED_LANGUAGES
        .iter()
        .map(|(code, label)| json!({ "code": code, "label": label }))
        .collect();
    Json(json!({
        "default": "en",
        "languages": languages,
    }))
}
