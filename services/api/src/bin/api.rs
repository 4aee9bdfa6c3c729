//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, OpenAiTimeAdapter, Rfc3339TimeParser},
    config::Config,
    error::ApiError,
    sweeper::Sweeper,
    web::{build_router, state::AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use exam_prep_core::{Clock, TimeParsingService};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database at {}...", config.database_url);
    let db_adapter = Arc::new(DbAdapter::connect(&config.database_url).await?);
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    if config.seed_sample_data {
        db_adapter.seed_sample_data().await?;
    }

    // --- 3. Initialize the Time Parser ---
    let time_parser: Arc<dyn TimeParsingService> = match config.openai_api_key.as_ref() {
        Some(api_key) => {
            let mut openai_config = OpenAIConfig::new().with_api_key(api_key);
            if let Some(base_url) = config.time_parser_base_url.as_ref() {
                openai_config = openai_config.with_api_base(base_url);
            }
            info!(model = %config.time_parser_model, "Using the LLM time parser");
            Arc::new(OpenAiTimeAdapter::new(
                Client::with_config(openai_config),
                config.time_parser_model.clone(),
            ))
        }
        None => {
            warn!("OPENAI_API_KEY is not set; reminders accept literal timestamps only");
            Arc::new(Rfc3339TimeParser)
        }
    };

    // --- 4. Build the Shared AppState ---
    let clock = Clock::System;
    let app_state = Arc::new(AppState::new(
        config.clone(),
        db_adapter.clone(),
        time_parser,
        clock,
    ));

    // --- 5. Start the Background Sweeper ---
    let shutdown = CancellationToken::new();
    let sweeper = Sweeper::new(db_adapter.clone(), app_state.reminders.clone(), clock);
    let sweeper_handle = tokio::spawn(sweeper.run(config.sweep_interval, shutdown.clone()));

    // --- 6. Create the Web Router ---
    let app = build_router(app_state);

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    // --- 8. Shut Down ---
    shutdown.cancel();
    if let Err(e) = sweeper_handle.await {
        warn!("Sweeper task ended abnormally: {:?}", e);
    }
    db_adapter.close().await;
    info!("Server stopped.");

    Ok(())
}

/// Resolves on Ctrl-C, or when `token` is cancelled elsewhere.
async fn shutdown_signal(token: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("Failed to listen for Ctrl-C: {:?}", e);
            }
            info!("Shutdown signal received.");
        }
        _ = token.cancelled() => {}
    }
    token.cancel();
}
