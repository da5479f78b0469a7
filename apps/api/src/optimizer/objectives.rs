//! Turns an evaluated candidate into the three
//! minimised objectives the optimizer works on.
//!
//! structural = 0.45·fatigue + 0.45·uplift + 0.10·min(1, deformation / 25)
//! emissions  = emissions per tonne, or total thickness · per-cm factor
//! economic   = cost per m², or Σ layer thickness · per-role unit cost

use serde::{Deserialize, Serialize};

use crate::models::candidate::{EvaluatedCandidate, VerificationResult};
use crate::models::layer::LayerRole;
use crate::optimizer::normalize::normalize;

const FATIGUE_WEIGHT: f64 = 0.45;
const UPLIFT_WEIGHT: f64 = 0.45;
const DEFORMATION_WEIGHT: f64 = 0.10;
const DEFORMATION_REFERENCE_MM: f64 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveVector {
    pub structural: f64,
    pub emissions: f64,
    pub economic: f64,
}

impl ObjectiveVector {
    pub fn as_array(&self) -> [f64; 3] {
        [self.structural, self.emissions, self.economic]
    }

    pub fn from_array([structural, emissions, economic]: [f64; 3]) -> Self {
        Self {
            structural,
            emissions,
            economic,
        }
    }
}

/// Per-role unit cost per centimetre of thickness, per m².
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleUnitCosts {
    pub wearing: f64,
    pub intermediate: f64,
    pub base: f64,
    pub subbase: f64,
    pub foundation: f64,
}

impl Default for RoleUnitCosts {
    fn default() -> Self {
        Self {
            wearing: 1.9,
            intermediate: 1.6,
            base: 1.3,
            subbase: 0.45,
            foundation: 0.3,
        }
    }
}

impl RoleUnitCosts {
    pub fn for_role(&self, role: LayerRole) -> f64 {
        match role {
            LayerRole::Wearing => self.wearing,
            LayerRole::Intermediate => self.intermediate,
            LayerRole::Base => self.base,
            LayerRole::Subbase => self.subbase,
            LayerRole::Foundation => self.foundation,
        }
    }
}

/// Stand-ins for unscored objectives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackCosts {
    /// kg CO2e per tonne, per centimetre of total thickness.
    pub emissions_per_cm: f64,
    pub unit_costs: RoleUnitCosts,
}

impl Default for FallbackCosts {
    fn default() -> Self {
        Self {
            emissions_per_cm: 1.1,
            unit_costs: RoleUnitCosts::default(),
        }
    }
}

pub fn structural_score(v: &VerificationResult) -> f64 {
    FATIGUE_WEIGHT * v.fatigue_ratio
        + UPLIFT_WEIGHT * v.uplift_ratio
        + DEFORMATION_WEIGHT * (v.deformation_mm / DEFORMATION_REFERENCE_MM).min(1.0)
}

pub fn objectives(candidate: &EvaluatedCandidate, fallback: &FallbackCosts) -> ObjectiveVector {
    let emissions = match candidate.emissions.value() {
        Some(score) => score.total_per_tonne,
        None => candidate.candidate.total_thickness * fallback.emissions_per_cm,
    };
    let economic = match candidate.cost.value() {
        Some(score) => score.total_per_area,
        None => candidate
            .candidate
            .layers
            .iter()
            .map(|l| l.thickness * fallback.unit_costs.for_role(l.role))
            .sum(),
    };

    ObjectiveVector {
        structural: structural_score(&candidate.verification),
        emissions,
        economic,
    }
}

/// Objectives of a candidate set, raw and normalized, in input order.
#[derive(Debug, Clone)]
pub struct ObjectiveSet {
    pub ids: Vec<String>,
    pub raw: Vec<ObjectiveVector>,
    pub normalized: Vec<ObjectiveVector>,
    /// Whether either score came from the fallback.
    pub fallback_used: Vec<bool>,
}

impl ObjectiveSet {
    pub fn from_candidates(candidates: &[EvaluatedCandidate], fallback: &FallbackCosts) -> Self {
        let raw: Vec<ObjectiveVector> = candidates.iter().map(|c| objectives(c, fallback)).collect();
        Self {
            ids: candidates.iter().map(|c| c.id().to_string()).collect(),
            normalized: normalize(&raw),
            fallback_used: candidates
                .iter()
                .map(|c| !c.emissions.is_scored() || !c.cost.is_scored())
                .collect(),
            raw,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::evaluated;
    use super::*;

    #[test]
    fn test_structural_formula() {
        let mut c = evaluated(0.0, 0.5, 0.25, Some(40.0), Some(30.0));
        c.verification.deformation_mm = 50.0;
        // 0.45·0.5 + 0.45·0.25 + 0.10·1
        assert!((structural_score(&c.verification) - 0.4375).abs() < 1e-12);

        c.verification.deformation_mm = 12.5;
        assert!((structural_score(&c.verification) - 0.3875).abs() < 1e-12);
    }

    #[test]
    fn test_scored_values_pass_through() {
        let c = evaluated(0.0, 0.1, 0.1, Some(42.0), Some(31.5));
        let v = objectives(&c, &FallbackCosts::default());
        assert_eq!(v.emissions, 42.0);
        assert_eq!(v.economic, 31.5);
    }

    #[test]
    fn test_fallbacks_for_unscored() {
        let c = evaluated(0.0, 0.1, 0.1, None, None);
        let fallback = FallbackCosts::default();
        let v = objectives(&c, &fallback);
        // 5 cm wearing + 20 cm base
        assert!((v.emissions - 25.0 * fallback.emissions_per_cm).abs() < 1e-9);
        let expected = 5.0 * fallback.unit_costs.wearing + 20.0 * fallback.unit_costs.base;
        assert!((v.economic - expected).abs() < 1e-9);

        let set = ObjectiveSet::from_candidates(&[c], &fallback);
        assert_eq!(set.fallback_used, vec![true]);
    }
}
