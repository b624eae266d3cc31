//! services/api/src/bin/api.rs

use api_lib::{
    adapters::FileStore,
    config::Config,
    error::ApiError,
    web::{build_router, rest::ApiDoc, state::AppState},
};
use axum::Router;
use bodycheck_core::SessionManager;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| ApiError::Internal(format!("Failed to install logging: {}", e)))?;
    info!("Configuration loaded. Starting demo shell...");

    // --- 2. Open Storage & Restore the Session ---
    info!("Opening storage at {}", config.storage_path.display());
    let storage = Arc::new(FileStore::open(&config.storage_path).await?);
    let sessions = Arc::new(SessionManager::restore(storage).await);
    info!(
        authenticated = sessions.current_session().authenticated,
        "Session state restored"
    );

    // --- 3. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        sessions,
        config: config.clone(),
    });

    // --- 4. Create the Web Router ---
    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(build_router(app_state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
