use crate::position::Position;
use crate::server::AppState;
use crate::Error;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Page size applied when the caller does not pass a limit
pub const DEFAULT_REFERENCES_LIMIT: usize = 100;

#[derive(Deserialize)]
pub struct PositionParams {
    pub repository_id: i64,
    pub commit: String,
    pub path: String,
    pub line: u32,
    pub character: u32,
}

#[derive(Deserialize)]
pub struct ReferenceParams {
    pub repository_id: i64,
    pub commit: String,
    pub path: String,
    pub line: u32,
    pub character: u32,
    pub limit: Option<usize>,
    pub cursor: Option<String>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(err: Error) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &err {
        Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        Error::Cancelled | Error::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        Error::Store { .. } | Error::MetadataStore { .. } => StatusCode::BAD_GATEWAY,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

pub async fn get_hover(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PositionParams>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ErrorResponse>)> {
    let resolver = state.resolver(params.repository_id, &params.commit, &params.path);
    let position = Position::new(params.line, params.character);

    let hover = resolver
        .hover(&state.context(), position)
        .await
        .map_err(error_response)?;

    Ok(Json(match hover {
        Some(hover) => serde_json::json!({
            "text": hover.text,
            "range": hover.range,
            "exists": true,
        }),
        None => serde_json::json!({"exists": false}),
    }))
}

pub async fn get_definitions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PositionParams>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ErrorResponse>)> {
    let resolver = state.resolver(params.repository_id, &params.commit, &params.path);
    let position = Position::new(params.line, params.character);

    let locations = resolver
        .definitions(&state.context(), position)
        .await
        .map_err(error_response)?;

    Ok(Json(serde_json::json!({"locations": locations})))
}

pub async fn get_references(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReferenceParams>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ErrorResponse>)> {
    let resolver = state.resolver(params.repository_id, &params.commit, &params.path);
    let position = Position::new(params.line, params.character);
    let limit = params.limit.unwrap_or(DEFAULT_REFERENCES_LIMIT);

    let page = resolver
        .references(&state.context(), position, limit, params.cursor.as_deref())
        .await
        .map_err(error_response)?;

    Ok(Json(serde_json::json!({
        "locations": page.locations,
        "total": page.total,
        "cursor": page.cursor,
    })))
}
