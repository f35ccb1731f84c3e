use crate::config::{Config, GatewayConfig};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{any, get},
};
use casket_core::{Backend, BlobStore, Result, StorageBackend, StoreError, StoreOptions};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

mod external;
mod types;

use external::{del_blob, get_blob, health, info, missing_key, set_blob};
pub(crate) use types::*;

pub struct ServerState<B> {
    pub(crate) store: Arc<BlobStore<B>>,
    pub(crate) gateway: GatewayConfig,
    pub(crate) backend_name: String,
}

pub async fn run_server(config: Config) -> Result<()> {
    let db_file = config.storage.db_file();
    let backend = StorageBackend::open(config.storage.backend, &db_file)?;
    let backend_name = backend.kind().to_string();

    let store = BlobStore::open(
        backend,
        StoreOptions {
            segments: config.storage.segments,
        },
    )?;
    tracing::info!(
        "Casket using {} backend at {:?} with {} segments",
        backend_name,
        db_file,
        store.segment_count()
    );

    let state = Arc::new(ServerState {
        store: Arc::new(store),
        gateway: config.gateway.clone(),
        backend_name,
    });
    let app = build_router(state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Casket listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|error| StoreError::Http(error.to_string()))?;

    tracing::info!("Casket stopped");
    Ok(())
}

pub fn build_router<B: Backend>(state: Arc<ServerState<B>>) -> Router {
    let max_value_bytes = state.gateway.max_value_bytes;

    Router::new()
        .route("/health", get(health::<B>))
        .route("/info", any(info::<B>))
        .route("/set", any(set_blob::<B>))
        .route("/get/", any(missing_key))
        .route("/get/:key", any(get_blob::<B>))
        .route("/del/", any(missing_key))
        .route("/del/:key", any(del_blob::<B>))
        .layer(DefaultBodyLimit::max(max_value_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for ctrl-c: {}", error);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", error);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

/// Status code for an engine error.
///
/// By default every engine error is a 400 and only transport or internal
/// failures are a 500. With `strict` set, misses, duplicates and unfinished
/// operations get their own codes as well.
pub(crate) fn status_for(error: &StoreError, strict: bool) -> StatusCode {
    if is_internal(error) {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    if !strict {
        return StatusCode::BAD_REQUEST;
    }

    match error {
        StoreError::NilValue | StoreError::ZeroValue | StoreError::InvalidKey(_) => {
            StatusCode::BAD_REQUEST
        }
        StoreError::NotFound => StatusCode::NOT_FOUND,
        StoreError::Existing => StatusCode::CONFLICT,
        StoreError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
        StoreError::DiskFull => StatusCode::INSUFFICIENT_STORAGE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn is_internal(error: &StoreError) -> bool {
    matches!(
        error,
        StoreError::Backend(_)
            | StoreError::Io(_)
            | StoreError::Config(_)
            | StoreError::Http(_)
            | StoreError::Abandoned
            | StoreError::Internal(_)
    )
}

pub(crate) fn response_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, message.into()).into_response()
}

#[cfg(test)]
mod tests;
