//! In-process reference scorer. Deterministic, no I/O, fully testable.
//!
//! Emissions: cradle-to-site factors per tonne of binder / aggregate /
//! reclaimed material, haulage per tonne-km, and plant heating of the bound
//! mass above ambient.
//! Cost: per-layer material, haulage, production (bound layers only) and
//! placement, all per square metre.

use async_trait::async_trait;

use crate::design::enrichment::{areal_mass, binder_content};
use crate::models::candidate::{
    Candidate, CostScore, EmissionLevel, EmissionsScore, LayerCost, MassBuckets,
};
use crate::models::request::{Distances, Pricing, ProcessParameters};
use crate::scoring::{CostScorer, EmissionsScorer, ScoringError};

const AMBIENT_TEMPERATURE_C: f64 = 20.0;

/// kg CO2e factors.
#[derive(Debug, Clone)]
pub struct EmissionFactors {
    pub binder_per_tonne: f64,
    pub aggregate_per_tonne: f64,
    pub reclaimed_per_tonne: f64,
    pub transport_per_tonne_km: f64,
    /// Per tonne of bound mix and per °C above ambient.
    pub heating_per_tonne_degree: f64,
    /// Upper bound (exclusive) of the low band, per tonne.
    pub low_threshold: f64,
    /// Upper bound (exclusive) of the medium band, per tonne.
    pub medium_threshold: f64,
}

impl Default for EmissionFactors {
    fn default() -> Self {
        Self {
            binder_per_tonne: 480.0,
            aggregate_per_tonne: 4.5,
            reclaimed_per_tonne: 1.5,
            transport_per_tonne_km: 0.09,
            heating_per_tonne_degree: 0.08,
            low_threshold: 35.0,
            medium_threshold: 50.0,
        }
    }
}

impl EmissionFactors {
    pub fn level(&self, per_tonne: f64) -> EmissionLevel {
        if per_tonne < self.low_threshold {
            EmissionLevel::Low
        } else if per_tonne < self.medium_threshold {
            EmissionLevel::Medium
        } else {
            EmissionLevel::High
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceScorer {
    pub factors: EmissionFactors,
}

#[async_trait]
impl EmissionsScorer for ReferenceScorer {
    async fn compute_emissions(
        &self,
        buckets: &MassBuckets,
        distances: &Distances,
        process: &ProcessParameters,
    ) -> Result<EmissionsScore, ScoringError> {
        compute_reference_emissions(&self.factors, buckets, distances, process)
    }
}

#[async_trait]
impl CostScorer for ReferenceScorer {
    async fn compute_cost(
        &self,
        candidate: &Candidate,
        pricing: &Pricing,
        distances: &Distances,
    ) -> Result<CostScore, ScoringError> {
        compute_reference_cost(candidate, pricing, distances)
    }
}

fn compute_reference_emissions(
    f: &EmissionFactors,
    buckets: &MassBuckets,
    distances: &Distances,
    process: &ProcessParameters,
) -> Result<EmissionsScore, ScoringError> {
    if !buckets.total.is_finite() || buckets.total <= 0.0 {
        return Err(ScoringError::InvalidInput(
            "mass buckets carry no material".to_string(),
        ));
    }

    // kg → t
    let binder = buckets.binder / 1000.0;
    let aggregate = buckets.aggregate / 1000.0;
    let reclaimed = buckets.reclaimed / 1000.0;
    let bound = buckets.bound / 1000.0;
    let total = buckets.total / 1000.0;

    let materials = binder * f.binder_per_tonne
        + aggregate * f.aggregate_per_tonne
        + reclaimed * f.reclaimed_per_tonne;

    let haul = f.transport_per_tonne_km
        * (aggregate * (distances.quarry_to_plant_km + distances.plant_to_site_km)
            + binder * (distances.binder_supply_km + distances.plant_to_site_km)
            + reclaimed * distances.plant_to_site_km);

    let heating = bound
        * (process.mixing_temperature_c - AMBIENT_TEMPERATURE_C).max(0.0)
        * f.heating_per_tonne_degree;

    let total_per_area = materials + haul + heating;
    let total_per_tonne = total_per_area / total;

    Ok(EmissionsScore {
        total_per_tonne,
        total_per_area,
        level: f.level(total_per_tonne),
    })
}

fn compute_reference_cost(
    candidate: &Candidate,
    pricing: &Pricing,
    distances: &Distances,
) -> Result<CostScore, ScoringError> {
    if candidate.layers.is_empty() {
        return Err(ScoringError::InvalidInput(
            "candidate has no layers".to_string(),
        ));
    }

    let haul_km = distances.quarry_to_plant_km + distances.plant_to_site_km;
    let mut score = CostScore {
        material_per_area: 0.0,
        transport_per_area: 0.0,
        production_per_area: 0.0,
        placement_per_area: 0.0,
        total_per_area: 0.0,
        per_layer: Vec::with_capacity(candidate.layers.len()),
    };

    for layer in &candidate.layers {
        let tonnes = areal_mass(layer) / 1000.0;
        let binder_share = binder_content(layer.role);

        let material = tonnes
            * (binder_share * pricing.binder_per_tonne
                + (1.0 - binder_share) * pricing.aggregate_per_tonne);
        let transport = tonnes * haul_km * pricing.transport_per_tonne_km;
        let production = if layer.role.is_bound() {
            tonnes * pricing.production_per_tonne
        } else {
            0.0
        };
        let placement = tonnes * pricing.placement_per_tonne;

        score.material_per_area += material;
        score.transport_per_area += transport;
        score.production_per_area += production;
        score.placement_per_area += placement;
        score.per_layer.push(LayerCost {
            name: layer.name.clone(),
            cost_per_area: material + transport + production + placement,
        });
    }

    score.total_per_area = score.material_per_area
        + score.transport_per_area
        + score.production_per_area
        + score.placement_per_area;

    Ok(score)
}
