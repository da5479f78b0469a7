//! Objective collaborators: environmental footprint and economic cost.
//!
//! Both are reached through narrow async traits so the search never depends
//! on how a score is produced:
//!
//! - [`ReferenceScorer`]: deterministic in-process factors and unit prices (default).
//! - [`HttpScorer`]: delegates to an external scoring service over JSON/HTTP.
//!
//! `SearchService` holds `Arc<dyn EmissionsScorer>` / `Arc<dyn CostScorer>`,
//! chosen at startup from `SCORING_SERVICE_URL`.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::candidate::{Candidate, CostScore, EmissionsScore, MassBuckets};
use crate::models::request::{Distances, Pricing, ProcessParameters};

pub mod http;
pub mod reference;

pub use http::HttpScorer;
pub use reference::ReferenceScorer;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Scoring service error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unavailable after {retries} retries")]
    Exhausted { retries: u32 },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Scoring input rejected: {0}")]
    InvalidInput(String),

    #[error("Scoring service returned an empty response")]
    EmptyResponse,
}

/// Footprint of one candidate's material mix, haulage and plant heating.
#[async_trait]
pub trait EmissionsScorer: Send + Sync {
    async fn compute_emissions(
        &self,
        buckets: &MassBuckets,
        distances: &Distances,
        process: &ProcessParameters,
    ) -> Result<EmissionsScore, ScoringError>;
}

/// Cost breakdown of one candidate per square metre.
#[async_trait]
pub trait CostScorer: Send + Sync {
    async fn compute_cost(
        &self,
        candidate: &Candidate,
        pricing: &Pricing,
        distances: &Distances,
    ) -> Result<CostScore, ScoringError>;
}
