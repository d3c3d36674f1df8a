use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{api_state::ApiState, error::ApiError};

/// Lists every table currently in the store.
pub async fn list_all_tables(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let tables = state.db.list_tables()?;
    info!(count = tables.len(), "listed tables");
    Ok(Json(json!({ "tables": tables })))
}

#[derive(Debug, Deserialize)]
pub struct FetchTableParams {
    pub limit: Option<usize>,
}

/// Fetches up to `limit` rows (default 100) from a table. A missing table
/// yields an empty row set, matching how stale active-dataset pointers are
/// resolved.
pub async fn fetch_table(
    State(state): State<ApiState>,
    Path(table_name): Path<String>,
    Query(params): Query<FetchTableParams>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = params.limit.unwrap_or(100);
    let rows = state.db.fetch_rows(&table_name, limit)?;
    Ok(Json(json!({
        "table": table_name,
        "rows": rows,
    })))
}

/// Returns the current active-dataset pointer. An unset or corrupt pointer
/// reads as `{ "folder": null, "tables": [] }`.
pub async fn get_active_tables(State(state): State<ApiState>) -> impl IntoResponse {
    let dataset = state.active.get();
    Json(json!({
        "folder": dataset.folder,
        "tables": dataset.tables,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SetActiveTablesPayload {
    pub folder_name: Option<String>,
}

/// Reactivates a historical session: re-derives its table list by prefix
/// match against the store and persists the result.
pub async fn set_active_tables(
    State(state): State<ApiState>,
    Json(payload): Json<SetActiveTablesPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(folder_name) = payload.folder_name.filter(|name| !name.trim().is_empty()) else {
        return Err(ApiError::ValidationError(
            "folder_name is required".to_string(),
        ));
    };

    let dataset = state.active.rederive(&state.db, &folder_name)?;
    let tables_info: Vec<_> = dataset
        .tables
        .iter()
        .map(|table| json!({ "tableName": table }))
        .collect();

    info!(folder = %folder_name, tables = dataset.tables.len(), "active tables set from history");
    Ok(Json(json!({
        "message": format!("Active tables set from {folder_name}"),
        "folder": folder_name,
        "tables": dataset.tables,
        "tables_info": tables_info,
    })))
}

/// Returns the folder the active-dataset pointer currently names.
pub async fn current_active_folder(State(state): State<ApiState>) -> impl IntoResponse {
    let dataset = state.active.get();
    match dataset.folder {
        Some(folder) => Json(json!({
            "folder": folder,
            "tables": dataset.tables,
        })),
        None => Json(json!({
            "folder": null,
            "message": "No active folder set",
        })),
    }
}
