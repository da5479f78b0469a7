use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::scoring::ScoringError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad thickness bounds/step or out-of-domain traffic parameters.
    #[error("Invalid constraint: {0}")]
    InvalidConstraint(String),

    /// A cross-section the mechanics model cannot evaluate (e.g. no layers).
    #[error("Invalid candidate: {0}")]
    InvalidCandidate(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Collaborator scoring failure. Enrichment degrades the candidate to
    /// unscored instead of surfacing this; it only escapes from direct calls.
    #[error("Upstream scoring failure: {0}")]
    UpstreamScoring(#[from] ScoringError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code, also used as the failure prefix of jobs.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidConstraint(_) => "INVALID_CONSTRAINT",
            AppError::InvalidCandidate(_) => "INVALID_CANDIDATE",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::UpstreamScoring(_) => "UPSTREAM_SCORING_FAILURE",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match &self {
            AppError::InvalidConstraint(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InvalidCandidate(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::UpstreamScoring(e) => {
                tracing::error!("Scoring error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "A scoring collaborator failed".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
