//! Candidate Enricher: attaches collaborator scores to viable candidates.
//!
//! Per candidate: areal mass per layer → mass buckets (binder / aggregate /
//! reclaimed) → `compute_emissions` + `compute_cost`. A collaborator failure
//! degrades that score to `Unscored`; it never drops the candidate.
//!
//! Candidates are scored concurrently through an order-preserving bounded
//! stream, so the output order always matches the input order.

use futures::stream::{self, StreamExt};
use tracing::warn;

use crate::models::candidate::{
    Candidate, EvaluatedCandidate, MassBuckets, Score, VerificationResult,
};
use crate::models::layer::{Layer, LayerRole};
use crate::models::request::{Distances, Pricing, ProcessParameters, Tipology};
use crate::scoring::{CostScorer, EmissionsScorer};

/// Bulk density per role in kg/m³.
pub fn density(role: LayerRole) -> f64 {
    match role {
        LayerRole::Wearing => 2400.0,
        LayerRole::Intermediate => 2380.0,
        LayerRole::Base => 2350.0,
        LayerRole::Subbase => 2100.0,
        LayerRole::Foundation => 1900.0,
    }
}

/// Binder share of a bound layer's mass. Unbound layers carry none.
pub fn binder_content(role: LayerRole) -> f64 {
    match role {
        LayerRole::Wearing => 0.055,
        LayerRole::Intermediate => 0.050,
        LayerRole::Base => 0.045,
        LayerRole::Subbase | LayerRole::Foundation => 0.0,
    }
}

/// Mass per square metre of pavement (kg/m²). Thickness is in centimetres.
pub fn areal_mass(layer: &Layer) -> f64 {
    layer.thickness / 100.0 * density(layer.role)
}

/// Splits a candidate's mass into the buckets the emissions collaborator
/// expects. The reclaimed ratio only applies under [`Tipology::Recycling`].
pub fn mass_buckets(candidate: &Candidate, tipology: Tipology, reclaimed_ratio: f64) -> MassBuckets {
    let reclaimed_ratio = match tipology {
        Tipology::Recycling => reclaimed_ratio.clamp(0.0, 1.0),
        _ => 0.0,
    };

    let masses: Vec<f64> = candidate.layers.iter().map(areal_mass).collect();
    let total: f64 = masses.iter().sum();

    let mut buckets = MassBuckets {
        binder: 0.0,
        aggregate: 0.0,
        reclaimed: 0.0,
        bound: 0.0,
        total,
        layer_fractions: masses
            .iter()
            .map(|m| if total > 0.0 { m / total } else { 0.0 })
            .collect(),
    };

    for (layer, mass) in candidate.layers.iter().zip(&masses) {
        if layer.role.is_bound() {
            let binder = mass * binder_content(layer.role);
            let aggregate = mass - binder;
            buckets.binder += binder;
            buckets.reclaimed += aggregate * reclaimed_ratio;
            buckets.aggregate += aggregate * (1.0 - reclaimed_ratio);
            buckets.bound += mass;
        } else {
            buckets.aggregate += mass;
        }
    }

    buckets
}

/// Request-level context shared by every candidate of one run.
pub struct EnrichmentContext<'a> {
    pub tipology: Tipology,
    pub distances: &'a Distances,
    pub pricing: &'a Pricing,
    pub process: &'a ProcessParameters,
    pub emissions: &'a dyn EmissionsScorer,
    pub cost: &'a dyn CostScorer,
    pub concurrency: usize,
}

/// Scores every verified candidate; at most `ctx.concurrency` in flight.
pub async fn enrich_all(
    verified: Vec<(Candidate, VerificationResult)>,
    ctx: &EnrichmentContext<'_>,
) -> Vec<EvaluatedCandidate> {
    stream::iter(verified)
        .map(|(candidate, verification)| enrich_one(candidate, verification, ctx))
        .buffered(ctx.concurrency.max(1))
        .collect()
        .await
}

async fn enrich_one(
    candidate: Candidate,
    verification: VerificationResult,
    ctx: &EnrichmentContext<'_>,
) -> EvaluatedCandidate {
    let mass = mass_buckets(&candidate, ctx.tipology, ctx.process.reclaimed_ratio);

    let (emissions, cost) = futures::join!(
        ctx.emissions
            .compute_emissions(&mass, ctx.distances, ctx.process),
        ctx.cost.compute_cost(&candidate, ctx.pricing, ctx.distances),
    );

    let emissions = match emissions {
        Ok(score) => Score::scored(score),
        Err(e) => {
            warn!("Emissions scoring failed for candidate {}: {e}", candidate.id);
            Score::unscored(e.to_string())
        }
    };
    let cost = match cost {
        Ok(score) => Score::scored(score),
        Err(e) => {
            warn!("Cost scoring failed for candidate {}: {e}", candidate.id);
            Score::unscored(e.to_string())
        }
    };

    EvaluatedCandidate {
        candidate,
        verification,
        mass,
        emissions,
        cost,
    }
}
