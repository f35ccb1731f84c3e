use super::{HealthResponse, ServerState, response_error, status_for};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use casket_core::{Backend, Key, StoreError};
use std::sync::Arc;

pub(crate) async fn health<B: Backend>(State(state): State<Arc<ServerState<B>>>) -> impl IntoResponse {
    let stats = match state.store.stats().await {
        Ok(stats) => Some(stats),
        Err(error) => {
            tracing::warn!("Failed to read ledger for health check: {}", error);
            None
        }
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        backend: state.backend_name.clone(),
        segments: state.store.segment_count(),
        stats,
    })
}

pub(crate) async fn set_blob<B: Backend>(
    State(state): State<Arc<ServerState<B>>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method != Method::POST {
        return wrong_method(Method::POST, &method);
    }

    // an absent body is a nil value, an explicit zero-length one is empty
    let value = if body.is_empty() && !headers.contains_key(header::CONTENT_LENGTH) {
        None
    } else {
        Some(body)
    };

    match state.store.put(value).await {
        Ok(key) => (StatusCode::OK, key.to_hex()).into_response(),
        Err(error) => engine_error(&state, "set", error),
    }
}

pub(crate) async fn get_blob<B: Backend>(
    State(state): State<Arc<ServerState<B>>>,
    method: Method,
    Path(raw_key): Path<String>,
) -> Response {
    if method != Method::GET {
        return wrong_method(Method::GET, &method);
    }

    let key = match Key::from_hex(&raw_key) {
        Ok(key) => key,
        Err(error) => return engine_error(&state, "get", error),
    };

    match state.store.get(key).await {
        Ok(value) => (StatusCode::OK, value).into_response(),
        Err(error) => engine_error(&state, "get", error),
    }
}

pub(crate) async fn del_blob<B: Backend>(
    State(state): State<Arc<ServerState<B>>>,
    method: Method,
    Path(raw_key): Path<String>,
) -> Response {
    if method != Method::GET {
        return wrong_method(Method::GET, &method);
    }

    let key = match Key::from_hex(&raw_key) {
        Ok(key) => key,
        Err(error) => return engine_error(&state, "del", error),
    };

    match state.store.del(key).await {
        Ok(value) => (StatusCode::OK, value).into_response(),
        Err(error) => engine_error(&state, "del", error),
    }
}

pub(crate) async fn info<B: Backend>(
    State(state): State<Arc<ServerState<B>>>,
    method: Method,
) -> Response {
    if method != Method::GET {
        return wrong_method(Method::GET, &method);
    }

    match state.store.info().await {
        Ok(summary) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            summary,
        )
            .into_response(),
        Err(error) => engine_error(&state, "info", error),
    }
}

pub(crate) async fn missing_key() -> Response {
    let error = StoreError::InvalidKey("key not provided".to_string());
    tracing::warn!("request without a key: {}", error);
    response_error(StatusCode::BAD_REQUEST, error.to_string())
}

fn wrong_method(expected: Method, actual: &Method) -> Response {
    response_error(
        StatusCode::BAD_REQUEST,
        format!("expect {} method - have {}", expected, actual),
    )
}

fn engine_error<B>(state: &ServerState<B>, op: &str, error: StoreError) -> Response {
    let status = status_for(&error, state.gateway.strict_status);
    tracing::warn!("{} failed with {}: {}", op, status, error);
    response_error(status, error.to_string())
}
