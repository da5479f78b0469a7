use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job::Job;
use crate::models::request::SearchRequest;
use crate::search::service::{GenerateResponse, ResultQuery, SearchPage};
use crate::state::AppState;

/// POST /api/v1/searches
/// 200 with the requested page, or 202 with a job id when `asynchronous`.
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Response, AppError> {
    let response = state.search.generate(req).await?;
    let status = match response {
        GenerateResponse::Completed(_) => StatusCode::OK,
        GenerateResponse::Accepted { .. } => StatusCode::ACCEPTED,
    };
    Ok((status, Json(response)).into_response())
}

/// GET /api/v1/searches/:key/results
pub async fn handle_get_results(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<ResultQuery>,
) -> Result<Json<SearchPage>, AppError> {
    let page = state.search.results(&key, &query).await?;
    Ok(Json(page))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Job>, AppError> {
    Ok(Json(state.search.job_status(id)?))
}
