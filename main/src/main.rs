use api_router::{api_routes, api_state::ApiState};
use axum::{
    http::{HeaderValue, Method},
    Router,
};
use common::utils::config::get_config;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    // Get config
    let config = get_config()?;

    let api_state = ApiState::new(&config)?;

    // Bring the store back in line with the newest converter output before
    // serving queries.
    let pipeline = api_state.pipeline.clone();
    match tokio::task::spawn_blocking(move || pipeline.reimport_latest()).await {
        Ok(Ok(imported)) => info!(imported, "startup re-ingestion finished"),
        Ok(Err(e)) => warn!("Startup re-ingestion failed: {}", e),
        Err(e) => warn!("Startup re-ingestion task panicked: {}", e),
    }

    let cors = CorsLayer::new()
        .allow_origin(config.cors_allowed_origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    // Create Axum router
    let app = Router::new()
        .merge(api_routes(&api_state))
        .layer(cors)
        .with_state(api_state);

    info!("Starting server listening on 0.0.0.0:{}", config.http_port);
    let serve_address = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(serve_address).await?;

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use common::utils::config::AppConfig;
    use tower::ServiceExt;

    fn smoke_test_config(data_dir: &std::path::Path) -> AppConfig {
        AppConfig {
            data_dir: data_dir.to_string_lossy().into_owned(),
            http_port: 0,
            openai_base_url: "http://localhost:1".into(),
            ..Default::default()
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn smoke_startup_serves_probes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = smoke_test_config(dir.path());

        let api_state = ApiState::new(&config).expect("api state");
        let app = Router::new()
            .merge(api_routes(&api_state))
            .with_state(api_state);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/live")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::OK);

        let ready_response = app
            .oneshot(
                Request::builder()
                    .uri("/ready")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("ready response");
        assert_eq!(ready_response.status(), StatusCode::OK);
    }
}
