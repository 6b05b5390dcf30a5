//! HTTP routers
//!
//! - Peer protocol: `GET {base_path}{group}/{key}` returns the raw value bytes
//! - Front-end API: `GET /api?key=...` against a single group
//! - `GET /health`, `GET /metrics`

use crate::common::metrics::to_prometheus;
use crate::common::tracing_middleware::request_id_middleware;
use crate::common::utils::decode_segment;
use crate::group::{Group, GroupRegistry};
use crate::Error;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode, Uri},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state of the peer router
#[derive(Clone)]
pub struct PeerState {
    pub groups: Arc<GroupRegistry>,
    /// This node's address, for logs and health output
    pub node: String,
    pub base_path: String,
}

pub fn create_peer_router(state: PeerState) -> Router {
    let route = format!("{}*path", state.base_path);
    Router::new()
        .route(&route, get(serve_peer))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .fallback(fallback)
        .with_state(state)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
}

async fn serve_peer(State(state): State<PeerState>, uri: Uri) -> Response {
    // Segments are split before decoding so an escaped '/' stays inside its segment
    let path = uri.path().strip_prefix(&state.base_path).unwrap_or_default();
    tracing::debug!("[Server {}] GET {}{}", state.node, state.base_path, path);

    let Some((group_name, key)) = path.split_once('/') else {
        return (StatusCode::BAD_REQUEST, "Bad Request").into_response();
    };
    let (group_name, key) = match (decode_segment(group_name), decode_segment(key)) {
        (Ok(group_name), Ok(key)) => (group_name, key),
        (Err(e), _) | (_, Err(e)) => {
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    let Some(group) = state.groups.get_group(&group_name) else {
        let err = Error::GroupNotFound(group_name);
        return (err.to_http_status(), err.to_string()).into_response();
    };

    group.record_server_request();
    lookup(&group, &key).await
}

async fn fallback(State(state): State<PeerState>, uri: Uri) -> Response {
    // Under the base path but not of the form {group}/{key}
    if uri.path().starts_with(&state.base_path) {
        (StatusCode::BAD_REQUEST, "Bad Request").into_response()
    } else {
        (StatusCode::NOT_FOUND, "Not Found").into_response()
    }
}

async fn health(State(state): State<PeerState>) -> impl IntoResponse {
    axum::Json(json!({
        "status": "ok",
        "node": state.node,
        "groups": state.groups.names(),
    }))
}

async fn metrics(State(state): State<PeerState>) -> impl IntoResponse {
    let reports: Vec<_> = state.groups.groups().iter().map(|g| g.report()).collect();
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        to_prometheus(&reports),
    )
}

/// Look up `key` and render the outcome as an HTTP response
async fn lookup(group: &Group, key: &str) -> Response {
    match group.get(key).await {
        Ok(view) => (
            [(header::CONTENT_TYPE, "application/octet-stream")],
            view.bytes(),
        )
            .into_response(),
        Err(e) => (e.to_http_status(), e.to_string()).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiQuery {
    #[serde(default)]
    pub key: String,
}

/// Front-end API over one group
pub fn create_api_router(group: Arc<Group>) -> Router {
    Router::new()
        .route("/api", get(api_get))
        .with_state(group)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
}

async fn api_get(State(group): State<Arc<Group>>, Query(query): Query<ApiQuery>) -> Response {
    lookup(&group, &query.key).await
}
