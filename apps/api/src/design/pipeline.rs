//! Generation pipeline: one synchronous run of the design-space search.
//!
//! Flow: traffic → NEC → enumerate (capped) → verify each candidate →
//!       keep viable → enrich concurrently → outcome.
//!
//! Enumeration and verification are CPU-bound and run together inside
//! `spawn_blocking`; enrichment starts only once verification has finished,
//! so scoring can never reorder or stall the verification stage.

use std::sync::Arc;

use tracing::{debug, info};

use crate::design::enrichment::{enrich_all, EnrichmentContext};
use crate::design::enumerator::enumerate;
use crate::design::traffic::nec;
use crate::design::verification::{verify, MechanicsConfig};
use crate::errors::AppError;
use crate::models::candidate::{Candidate, EvaluatedCandidate, VerificationResult};
use crate::models::request::SearchRequest;
use crate::scoring::{CostScorer, EmissionsScorer};

/// Progress checkpoints reported while a run is in flight.
pub const PROGRESS_VERIFIED: u8 = 60;
pub const PROGRESS_ENRICHED: u8 = 90;

/// Collaborators and settings a run needs beyond the request itself.
#[derive(Clone)]
pub struct PipelineDeps {
    pub mechanics: MechanicsConfig,
    pub emissions: Arc<dyn EmissionsScorer>,
    pub cost: Arc<dyn CostScorer>,
    pub default_cap: usize,
    pub enrich_concurrency: usize,
}

/// Everything one run produced, in deterministic enumeration order.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub candidates: Vec<EvaluatedCandidate>,
    pub total_combinations_seen: usize,
    pub truncated: bool,
    /// Candidates that failed the viability check.
    pub rejected: usize,
    pub nec: f64,
}

struct VerifiedSet {
    viable: Vec<(Candidate, VerificationResult)>,
    total_combinations_seen: usize,
    truncated: bool,
    rejected: usize,
}

/// Runs the full pipeline for `request`.
///
/// `progress` receives [`PROGRESS_VERIFIED`] and [`PROGRESS_ENRICHED`].
pub async fn run_generation(
    request: &SearchRequest,
    deps: &PipelineDeps,
    progress: &(dyn Fn(u8) + Send + Sync),
) -> Result<GenerationOutcome, AppError> {
    request.validate()?;
    let nec = nec(&request.traffic)?;
    let cap = request.effective_cap(deps.default_cap);
    info!(
        "Generating {:?} search: {} layers, cap {}, NEC {:.0}",
        request.tipology,
        request.layers.len(),
        cap,
        nec
    );

    // CPU-bound stage: owned inputs for the 'static closure.
    let layers = request.layers.clone();
    let filters = request.filters.clone();
    let foundation = request.foundation.clone();
    let mechanics = deps.mechanics.clone();
    let verified = tokio::task::spawn_blocking(move || -> Result<VerifiedSet, AppError> {
        let enumeration = enumerate(&layers, cap, &filters)?;
        let mut viable = Vec::new();
        let mut rejected = 0usize;
        for candidate in enumeration.candidates {
            let result = verify(&candidate.layers, nec, &foundation, &mechanics)?;
            if result.viable {
                viable.push((candidate, result));
            } else {
                rejected += 1;
            }
        }
        Ok(VerifiedSet {
            viable,
            total_combinations_seen: enumeration.total_combinations_seen,
            truncated: enumeration.truncated,
            rejected,
        })
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in verification: {e}")))??;

    debug!(
        "Verification done: {} viable, {} rejected",
        verified.viable.len(),
        verified.rejected
    );
    progress(PROGRESS_VERIFIED);

    let ctx = EnrichmentContext {
        tipology: request.tipology,
        distances: &request.distances,
        pricing: &request.pricing,
        process: &request.process,
        emissions: deps.emissions.as_ref(),
        cost: deps.cost.as_ref(),
        concurrency: deps.enrich_concurrency,
    };
    let candidates = enrich_all(verified.viable, &ctx).await;
    progress(PROGRESS_ENRICHED);

    let unscored = candidates
        .iter()
        .filter(|c| !c.emissions.is_scored() || !c.cost.is_scored())
        .count();
    info!(
        "Generated {} viable candidates from {} combinations ({} rejected, {} partially unscored, truncated={})",
        candidates.len(),
        verified.total_combinations_seen,
        verified.rejected,
        unscored,
        verified.truncated
    );

    Ok(GenerationOutcome {
        candidates,
        total_combinations_seen: verified.total_combinations_seen,
        truncated: verified.truncated,
        rejected: verified.rejected,
        nec,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::layer::{LayerRole, LayerSpec};
    use crate::models::request::fixtures::{deep_section_request, two_layer_request};
    use crate::scoring::ReferenceScorer;
    use parking_lot::Mutex;

    fn deps() -> PipelineDeps {
        let scorer = Arc::new(ReferenceScorer::default());
        PipelineDeps {
            mechanics: MechanicsConfig::default(),
            emissions: scorer.clone(),
            cost: scorer,
            default_cap: 150_000,
            enrich_concurrency: 4,
        }
    }

    #[tokio::test]
    async fn test_deep_sections_all_pass() {
        let request = deep_section_request();
        let outcome = run_generation(&request, &deps(), &|_| {}).await.unwrap();
        assert_eq!(outcome.total_combinations_seen, 9);
        assert_eq!(outcome.candidates.len(), 9);
        assert_eq!(outcome.rejected, 0);
        assert!(!outcome.truncated);
        assert!(outcome
            .candidates
            .iter()
            .all(|c| c.emissions.is_scored() && c.cost.is_scored()));
    }

    #[tokio::test]
    async fn test_thin_sections_rejected_but_counted() {
        let request = two_layer_request();
        let outcome = run_generation(&request, &deps(), &|_| {}).await.unwrap();
        assert_eq!(outcome.total_combinations_seen, 9);
        assert_eq!(outcome.candidates.len() + outcome.rejected, 9);
        assert!(outcome.rejected > 0);
    }

    #[tokio::test]
    async fn test_cap_truncates() {
        let mut request = deep_section_request();
        request.combination_cap = Some(4);
        let outcome = run_generation(&request, &deps(), &|_| {}).await.unwrap();
        assert_eq!(outcome.total_combinations_seen, 4);
        assert!(outcome.truncated);
        assert_eq!(outcome.candidates.len(), 4);
    }

    #[tokio::test]
    async fn test_heavy_traffic_rejects_everything() {
        let mut request = deep_section_request();
        request.traffic.average_daily_traffic = 40_000.0;
        request.traffic.heavy_vehicle_percent = 20.0;
        let outcome = run_generation(&request, &deps(), &|_| {}).await.unwrap();
        assert_eq!(outcome.candidates.len(), 0);
        assert_eq!(outcome.rejected, 9);
    }

    #[tokio::test]
    async fn test_regeneration_is_identical() {
        let request = deep_section_request();
        let a = run_generation(&request, &deps(), &|_| {}).await.unwrap();
        let b = run_generation(&request, &deps(), &|_| {}).await.unwrap();
        assert_eq!(a.candidates, b.candidates);
        assert_eq!(
            serde_json::to_vec(&a.candidates).unwrap(),
            serde_json::to_vec(&b.candidates).unwrap()
        );
    }

    #[tokio::test]
    async fn test_progress_checkpoints_in_order() {
        let seen = Mutex::new(Vec::new());
        let request = two_layer_request();
        run_generation(&request, &deps(), &|p| seen.lock().push(p))
            .await
            .unwrap();
        assert_eq!(*seen.lock(), vec![PROGRESS_VERIFIED, PROGRESS_ENRICHED]);
    }

    #[tokio::test]
    async fn test_invalid_layer_fails_before_work() {
        let mut request = two_layer_request();
        request.layers.push(LayerSpec::new(LayerRole::Subbase, 20.0, 10.0, 5.0, 300.0));
        let err = run_generation(&request, &deps(), &|_| {}).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidConstraint(_)));
    }
}
