//! The parse API the workflow submits to.
//!
//! | Route               | Method | Purpose                                  |
//! |---------------------|--------|------------------------------------------|
//! | `/api/parse`        | POST   | analyse a batch and record it as session |
//! | `/api/data`         | GET    | every recorded session                   |
//! | `/api/data/{id}`    | GET    | one session                              |
//! | `/api/clear`        | POST   | drop all sessions                        |
//! | `/health`           | GET    | liveness                                 |
//!
//! Unmatched paths fall through to an optional static directory.

pub mod analyze;
pub mod handlers;
pub mod sessions;

use crate::config::ServerConfig;
use crate::error::ParserError;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use sessions::SessionStore;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};
use tracing::info;

#[derive(Clone)]
pub struct ServerState {
    pub sessions: Arc<SessionStore>,
}

impl ServerState {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            sessions: Arc::new(SessionStore::new(config.data_dir.clone())),
        }
    }
}

/// Build the application router.
pub fn router(state: ServerState, config: &ServerConfig) -> Router {
    let api = Router::new()
        .route("/api/parse", post(handlers::parse_documents))
        .route("/api/data", get(handlers::all_data))
        .route("/api/data/:id", get(handlers::session_data))
        .route("/api/clear", post(handlers::clear_data))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .with_state(state);

    let app = match &config.static_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api,
    };

    app.layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    )
}

/// Bind `config.addr` and serve until Ctrl-C.
pub async fn serve(config: ServerConfig) -> Result<(), ParserError> {
    let listener = TcpListener::bind(&config.addr)
        .await
        .map_err(|e| ParserError::Serve {
            addr: config.addr.clone(),
            source: e,
        })?;
    serve_on(listener, config, async {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutdown signal received");
    })
    .await
}

/// Serve on an already-bound listener until `shutdown` resolves.
pub async fn serve_on<F>(listener: TcpListener, config: ServerConfig, shutdown: F) -> Result<(), ParserError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| config.addr.clone());
    let app = router(ServerState::new(&config), &config);

    info!(
        "🚀 {} listening on http://{} (data: {})",
        handlers::SERVICE_NAME,
        addr,
        config.data_dir.display()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ParserError::Serve { addr, source: e })?;

    info!("✅ Server stopped");
    Ok(())
}
