use api_state::ApiState;
use axum::{
    extract::{DefaultBodyLimit, FromRef},
    routing::{get, post},
    Router,
};
use routes::{
    delete::delete_data,
    history::upload_history,
    insights::generate_insights,
    liveness::live,
    readiness::ready,
    settings::{get_settings, supported_languages, update_settings},
    tables::{current_active_folder, fetch_table, get_active_tables, list_all_tables, set_active_tables},
    upload::upload_archive,
};

pub mod api_state;
pub mod error;
mod routes;

/// Router for the dashboard API.
pub fn api_routes<S>(app_state: &ApiState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    // Probe endpoints (for k8s/systemd)
    let probes = Router::new()
        .route("/ready", get(ready))
        .route("/live", get(live));

    let api = Router::new()
        .route(
            "/upload",
            post(upload_archive).layer(DefaultBodyLimit::max(
                app_state.config.upload_max_body_bytes,
            )),
        )
        .route("/upload/history", get(upload_history))
        .route("/tables", get(list_all_tables))
        .route("/table/{table_name}", get(fetch_table))
        .route("/active-tables", get(get_active_tables))
        .route("/set-active-tables", post(set_active_tables))
        .route("/current-active-folder", get(current_active_folder))
        .route("/settings", get(get_settings).post(update_settings))
        .route("/settings/languages", get(supported_languages))
        .route("/delete-data", post(delete_data))
        .route("/insights", post(generate_insights));

    probes.merge(api)
}
