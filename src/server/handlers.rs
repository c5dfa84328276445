use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::server::{
    analyze::{self, IncomingDocument},
    ServerState,
};

pub const SERVICE_NAME: &str = "KrushFlow Document Parser API";

type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

#[derive(Deserialize)]
pub struct ParseRequest {
    #[serde(default)]
    documents: Vec<IncomingDocument>,
}

fn internal(err: impl std::fmt::Display) -> (StatusCode, Json<Value>) {
    error!("Request failed: {err}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "error": err.to_string() })),
    )
}

pub async fn parse_documents(
    State(state): State<ServerState>,
    Json(payload): Json<ParseRequest>,
) -> ApiResult {
    if payload.documents.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "No documents provided" })),
        ));
    }

    let parsed = tokio::task::spawn_blocking(move || {
        payload
            .documents
            .into_iter()
            .map(analyze::parse_document)
            .collect::<Vec<_>>()
    })
    .await
    .map_err(|e| internal(format!("Analysis task panicked: {e}")))?;

    let session = state.sessions.append(parsed).await.map_err(internal)?;
    info!(
        "Session {} stored with {} documents",
        session.id, session.document_count
    );

    Ok(Json(json!({
        "success": true,
        "session_id": session.id,
        "parsed_documents": session.documents,
        "total_documents": session.document_count,
        "message": "Documents parsed and saved successfully",
    })))
}

pub async fn all_data(State(state): State<ServerState>) -> ApiResult {
    let data = state.sessions.load().await.map_err(internal)?;
    let total = data.sessions.len();
    Ok(Json(json!({
        "success": true,
        "data": data,
        "total_sessions": total,
    })))
}

pub async fn session_data(State(state): State<ServerState>, Path(id): Path<u64>) -> ApiResult {
    match state.sessions.get(id).await.map_err(internal)? {
        Some(session) => Ok(Json(json!({ "success": true, "session": session }))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": "Session not found" })),
        )),
    }
}

pub async fn clear_data(State(state): State<ServerState>) -> ApiResult {
    state.sessions.clear().await.map_err(internal)?;
    info!("All server data cleared");
    Ok(Json(json!({
        "success": true,
        "message": "All server data cleared",
    })))
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "service": SERVICE_NAME,
    }))
}
