//! HTTP server.
//!
//! Serves the dispatcher over a small JSON API. The corpus cache is warmed
//! before the listener is bound, so the first request already sees every
//! loadable version.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns crate version) |
//! | `GET`  | `/versions` | Cached version names |
//! | `GET`  | `/operations` | The three operation allow-lists |
//! | `GET`  | `/{version}/{operation}` | Attribute or derived operation |
//! | `GET`  | `/{version}/{operation}/{ordinal}` | Paragraph operation |
//! | `POST` | `/reload` | Rebuild the cache from the store |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "version 'ZZZ' not found or not loaded" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `timeout` (408),
//! `internal` (500).
//!
//! # Deadlines
//!
//! Each request runs under `[server].request_timeout_secs`. Its
//! cancellation token is a child of the server shutdown token and is
//! cancelled when the handler returns, which stops any vector scan still
//! in flight.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use corpus_lens_core::store::CorpusStore;
use corpus_lens_core::{CorpusError, CorpusResult, StatusClass};

use crate::cache::CorpusCache;
use crate::config::Config;
use crate::db;
use crate::dispatch::{list_operations, Dispatcher, Envelope, OperationCatalog};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    dispatcher: Arc<Dispatcher>,
    request_timeout: Duration,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, request_timeout: Duration, shutdown: CancellationToken) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            request_timeout,
            shutdown,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/versions", get(handle_versions))
        .route("/operations", get(handle_operations))
        .route("/reload", post(handle_reload))
        .route("/{version}/{operation}", get(handle_operation))
        .route("/{version}/{operation}/{ordinal}", get(handle_paragraph_operation))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server.
///
/// Opens the store, warms the cache, binds `[server].bind` and serves until
/// Ctrl-C. Versions that fail to load are logged and left out; an
/// unreachable store still starts the server with an empty cache.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store: Arc<dyn CorpusStore> = Arc::new(db::open_store(config).await?);
    let cache = CorpusCache::warm(Arc::clone(&store), config.cache.warmup_concurrency).await;
    let dispatcher = Dispatcher::new(cache, store, config.vectors);

    let shutdown = CancellationToken::new();
    let state = AppState::new(dispatcher, config.server.request_timeout(), shutdown.clone());
    let app = build_router(state);

    let bind_addr = &config.server.bind;
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    info!(bind = %bind_addr, "corpus server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("corpus server stopped");
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }
    info!("shutting down");
    shutdown.cancel();
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn timeout_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::REQUEST_TIMEOUT,
        code: "timeout".to_string(),
        message: message.into(),
    }
}

fn internal_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

impl From<CorpusError> for AppError {
    fn from(err: CorpusError) -> Self {
        match err.status_class() {
            StatusClass::NotFound => not_found(err.to_string()),
            StatusClass::BadRequest => bad_request(err.to_string()),
            StatusClass::Timeout => timeout_error(err.to_string()),
            StatusClass::Internal => {
                error!(error = %err, "request failed");
                internal_error(err.to_string())
            }
        }
    }
}

/// Run `work` under the request deadline with its own cancellation token.
async fn with_deadline<F, Fut>(state: &AppState, work: F) -> Result<Json<Envelope>, AppError>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = CorpusResult<Envelope>>,
{
    let cancel = state.shutdown.child_token();
    let _guard = cancel.clone().drop_guard();

    match tokio::time::timeout(state.request_timeout, work(cancel)).await {
        Ok(result) => Ok(Json(result?)),
        Err(_) => Err(timeout_error(format!(
            "request exceeded {}s deadline",
            state.request_timeout.as_secs()
        ))),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /versions ============

#[derive(Serialize)]
struct VersionsResponse {
    versions: Vec<String>,
    failed: Vec<String>,
    loaded_at: DateTime<Utc>,
}

async fn handle_versions(State(state): State<AppState>) -> Json<VersionsResponse> {
    let snapshot = state.dispatcher.cache().snapshot();
    Json(VersionsResponse {
        versions: snapshot.versions(),
        failed: snapshot.failed().to_vec(),
        loaded_at: snapshot.loaded_at(),
    })
}

// ============ GET /operations ============

async fn handle_operations() -> Json<OperationCatalog> {
    Json(list_operations())
}

// ============ POST /reload ============

#[derive(Serialize)]
struct ReloadResponse {
    loaded: usize,
    failed: Vec<String>,
}

/// Rebuilds the cache. Requests already in flight keep the old snapshot.
async fn handle_reload(State(state): State<AppState>) -> Json<ReloadResponse> {
    let snapshot = state.dispatcher.cache().reload().await;
    Json(ReloadResponse {
        loaded: snapshot.len(),
        failed: snapshot.failed().to_vec(),
    })
}

// ============ GET /{version}/{operation} ============

async fn handle_operation(
    State(state): State<AppState>,
    Path((version, operation)): Path<(String, String)>,
) -> Result<Json<Envelope>, AppError> {
    let dispatcher = Arc::clone(&state.dispatcher);
    with_deadline(&state, |cancel| async move {
        dispatcher.resolve(&version, &operation, &cancel).await
    })
    .await
}

// ============ GET /{version}/{operation}/{ordinal} ============

async fn handle_paragraph_operation(
    State(state): State<AppState>,
    Path((version, operation, ordinal)): Path<(String, String, String)>,
) -> Result<Json<Envelope>, AppError> {
    let ordinal: i64 = ordinal
        .parse()
        .map_err(|_| bad_request(format!("paragraph ordinal must be an integer, got '{}'", ordinal)))?;

    let dispatcher = Arc::clone(&state.dispatcher);
    with_deadline(&state, |cancel| async move {
        dispatcher
            .resolve_paragraph(&version, &operation, ordinal, &cancel)
            .await
    })
    .await
}
