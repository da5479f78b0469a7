use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::optimizer::objectives::FallbackCosts;
use crate::optimizer::pareto::{ensure_pareto_size, pareto_front, ParetoFront};
use crate::optimizer::ranking::{weighted_ranking, RankedCandidate, Weights};
use crate::optimizer::sensitivity::{sensitivity_analysis, SensitivityReport};
use crate::state::AppState;

const DEFAULT_INCREMENT: f64 = 0.1;
const DEFAULT_ROBUST_THRESHOLD_PERCENT: f64 = 20.0;

#[derive(Deserialize)]
pub struct RankingRequest {
    pub cache_key: String,
    #[serde(default)]
    pub weights: Weights,
    #[serde(default)]
    pub fallback: FallbackCosts,
    /// Truncates the ranking to the best `limit` candidates.
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct RankingResponse {
    pub cache_key: String,
    pub weights: Weights,
    pub total: usize,
    pub ranking: Vec<RankedCandidate>,
}

#[derive(Deserialize)]
pub struct ParetoRequest {
    pub cache_key: String,
    #[serde(default)]
    pub fallback: FallbackCosts,
}

#[derive(Serialize)]
pub struct ParetoResponse {
    pub cache_key: String,
    pub fronts: Vec<ParetoFront>,
}

#[derive(Deserialize)]
pub struct SensitivityRequest {
    pub cache_key: String,
    #[serde(default = "default_increment")]
    pub increment: f64,
    #[serde(default = "default_robust_threshold")]
    pub robust_threshold_percent: f64,
    #[serde(default)]
    pub fallback: FallbackCosts,
}

fn default_increment() -> f64 {
    DEFAULT_INCREMENT
}

fn default_robust_threshold() -> f64 {
    DEFAULT_ROBUST_THRESHOLD_PERCENT
}

/// Runs a CPU-bound optimizer pass off the async executor.
async fn run_blocking<T, F>(f: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in optimizer: {e}")))?
}

/// POST /api/v1/optimize/ranking
pub async fn handle_ranking(
    State(state): State<AppState>,
    Json(req): Json<RankingRequest>,
) -> Result<Json<RankingResponse>, AppError> {
    let candidates = state.search.candidates(&req.cache_key).await?;
    let weights = req.weights.normalized();
    let fallback = req.fallback;
    let mut ranking =
        run_blocking(move || Ok(weighted_ranking(&candidates, &weights, &fallback))).await?;

    let total = ranking.len();
    if let Some(limit) = req.limit {
        ranking.truncate(limit);
    }
    Ok(Json(RankingResponse {
        cache_key: req.cache_key,
        weights,
        total,
        ranking,
    }))
}

/// POST /api/v1/optimize/pareto
pub async fn handle_pareto(
    State(state): State<AppState>,
    Json(req): Json<ParetoRequest>,
) -> Result<Json<ParetoResponse>, AppError> {
    let candidates = state.search.candidates(&req.cache_key).await?;
    ensure_pareto_size(candidates.len())?;
    let fallback = req.fallback;
    let fronts = run_blocking(move || Ok(pareto_front(&candidates, &fallback))).await?;
    Ok(Json(ParetoResponse {
        cache_key: req.cache_key,
        fronts,
    }))
}

/// POST /api/v1/optimize/sensitivity
pub async fn handle_sensitivity(
    State(state): State<AppState>,
    Json(req): Json<SensitivityRequest>,
) -> Result<Json<SensitivityReport>, AppError> {
    let candidates = state.search.candidates(&req.cache_key).await?;
    let SensitivityRequest {
        increment,
        robust_threshold_percent,
        fallback,
        ..
    } = req;
    let report = run_blocking(move || {
        sensitivity_analysis(&candidates, increment, robust_threshold_percent, &fallback)
    })
    .await?;
    Ok(Json(report))
}
