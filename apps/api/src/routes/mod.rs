pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::optimizer::handlers as optimize;
use crate::search::handlers as search;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Design-space search
        .route("/api/v1/searches", post(search::handle_generate))
        .route(
            "/api/v1/searches/:key/results",
            get(search::handle_get_results),
        )
        .route("/api/v1/jobs/:id", get(search::handle_get_job))
        // Optimizer over a cached search
        .route("/api/v1/optimize/ranking", post(optimize::handle_ranking))
        .route("/api/v1/optimize/pareto", post(optimize::handle_pareto))
        .route(
            "/api/v1/optimize/sensitivity",
            post(optimize::handle_sensitivity),
        )
        .with_state(state)
}
