//! HTTP Handlers for the highlight read/replace contract

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::api::{ErrorResponse, ExistsResponse, PathQuery, ReplaceHighlightsRequest};
use crate::model::HighlightDocument;
use crate::store::HighlightStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<HighlightStore>,
}

fn success<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

fn bad_request(msg: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: msg.to_string(),
        }),
    )
        .into_response()
}

fn internal_error(msg: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: msg.to_string(),
        }),
    )
        .into_response()
}

pub async fn healthcheck() -> impl IntoResponse {
    tracing::info!("got healthcheck request");
    Json(serde_json::json!({ "status": "ok" }))
}

/// Read contract: the canonical highlight document for a path, empty if
/// none was ever saved. Never an error for missing or corrupt records.
pub async fn get_highlights(
    State(state): State<AppState>,
    Query(params): Query<PathQuery>,
) -> Response {
    if params.path.trim().is_empty() {
        return bad_request("Query parameter 'path' is required");
    }

    success(state.store.load(&params.path))
}

/// Write contract: full-replace the highlight list for a path, returning
/// the document as persisted (ids generated, timestamps stamped).
pub async fn replace_highlights(
    State(state): State<AppState>,
    Query(params): Query<PathQuery>,
    Json(payload): Json<ReplaceHighlightsRequest>,
) -> Response {
    if params.path.trim().is_empty() {
        return bad_request("Query parameter 'path' is required");
    }

    let mut doc = HighlightDocument::empty(&params.path);
    doc.url = payload.url;
    doc.title = payload.title;
    doc.highlights = payload.highlights;

    match state.store.save(&params.path, doc) {
        Ok(saved) => success(saved),
        Err(e) => {
            tracing::error!(error = %crate::unpack_error(&e), path = %params.path, "failed to save highlights");
            internal_error("Failed to save highlights")
        }
    }
}

/// Presence probe for index and report builders that only need to know
/// whether a document carries highlights.
pub async fn highlights_exist(
    State(state): State<AppState>,
    Query(params): Query<PathQuery>,
) -> Response {
    if params.path.trim().is_empty() {
        return bad_request("Query parameter 'path' is required");
    }

    success(ExistsResponse {
        path: HighlightStore::normalize_path(&params.path),
        exists: state.store.exists(&params.path),
    })
}
