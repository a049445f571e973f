use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use drive_organizer::config::AppConfig;
use drive_organizer::data::migrations::run_migrations;
use drive_organizer::gateway::drive::HttpDriveGateway;
use drive_organizer::routes;
use drive_organizer::services::classify_service::OpenAiClassifier;
use drive_organizer::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();

    let conn = rusqlite::Connection::open(&config.database_path)
        .with_context(|| format!("opening database at {}", config.database_path))?;
    run_migrations(&conn).context("running migrations")?;

    let drive = Arc::new(HttpDriveGateway::new(
        config.drive_api_base.clone(),
        config.drive_access_token.clone(),
    ));
    let classifier = Arc::new(OpenAiClassifier::new(
        config.openai_api_base.clone(),
        config.openai_api_key.clone(),
        config.openai_model.clone(),
    ));

    let state = Arc::new(AppState::new(conn, drive, classifier));
    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "drive-organizer listening");
    axum::serve(listener, app).await.context("serving")?;

    Ok(())
}
