use axum::{
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::DeskConfig;
use crate::error::DeskError;
use crate::handlers;
use crate::intelligence::llm::{CompletionClient, OpenAiClient};
use crate::intelligence::summary::SummaryGenerator;
use crate::intelligence::IntelligenceDesk;
use crate::storage::sqlite::SqliteBackend;
use crate::storage::{StorageBackend, StorageError};

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn StorageBackend>,
    pub desk: Arc<IntelligenceDesk>,
    pub config: Arc<DeskConfig>,
}

impl AppState {
    /// Wires the intelligence desk over `storage` with the given completion client.
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        client: Arc<dyn CompletionClient>,
        config: DeskConfig,
    ) -> Self {
        let generator = SummaryGenerator::new(client, config.max_tokens);
        let desk = IntelligenceDesk::new(storage.clone(), generator, config.window_days);
        Self {
            storage,
            desk: Arc::new(desk),
            config: Arc::new(config),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "ok"})) }))
        // Auth
        .route("/api/auth/me", get(handlers::auth::me))
        // Intelligence desk
        .route(
            "/api/intelligence-desk/summary",
            get(handlers::intelligence::get_summary),
        )
        .route(
            "/api/intelligence-desk/cron",
            get(handlers::intelligence::run_cron),
        )
        .route(
            "/api/intelligence-desk/reports",
            get(handlers::intelligence::list_reports),
        )
        .route(
            "/api/intelligence-desk/reports/:id",
            get(handlers::intelligence::get_report),
        )
        .route(
            "/api/intelligence-desk/settings",
            get(handlers::settings::get_settings).put(handlers::settings::update_settings),
        )
        // Tasks
        .route(
            "/api/tasks",
            get(handlers::tasks::list_tasks).post(handlers::tasks::create_task),
        )
        .route(
            "/api/tasks/:id",
            get(handlers::tasks::get_task).patch(handlers::tasks::update_task),
        )
        .route(
            "/api/tasks/:id/comments",
            get(handlers::tasks::list_comments).post(handlers::tasks::add_comment),
        )
        // Inbox
        .route("/api/inbox", get(handlers::inbox::list_inbox))
        .route("/api/inbox/ack-all", post(handlers::inbox::ack_all))
        .route("/api/inbox/:id/ack", post(handlers::inbox::ack));

    api.fallback(|| async { DeskError::NotFound("Not found".into()) })
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn run_server(config: DeskConfig, db_path: &str) -> Result<(), ServeError> {
    let backend = Arc::new(SqliteBackend::open(db_path)?);
    if config.llm_api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; summary generation will fail until it is");
    }
    if config.cron_secret.is_none() {
        tracing::warn!("CRON_SECRET is not set; the cron endpoint will reject every call");
    }

    let client = Arc::new(OpenAiClient::from_config(&config));
    let port = config.port;
    let state = AppState::new(backend.clone(), client, config);

    // Graceful shutdown: checkpoint WAL on SIGTERM/SIGINT
    let shutdown_db = backend.clone();
    let shutdown_signal = async move {
        wait_for_signal().await;
        match shutdown_db.checkpoint() {
            Ok(()) => tracing::info!("WAL checkpointed, shutting down gracefully"),
            Err(e) => tracing::error!(error = %e, "WAL checkpoint failed"),
        }
    };

    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    tracing::info!(port, db = db_path, "marketdesk listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal)
        .await?;
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => tracing::info!("received SIGINT"),
                _ = sigterm.recv() => tracing::info!("received SIGTERM"),
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not install SIGTERM handler; waiting for SIGINT only");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("received Ctrl-C");
}

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("failed to open database: {0}")]
    Storage(#[from] StorageError),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}
