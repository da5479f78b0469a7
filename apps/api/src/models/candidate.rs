use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::layer::Layer;

// ────────────────────────────────────────────────────────────────────────────
// Candidate
// ────────────────────────────────────────────────────────────────────────────

/// An ordered cross-section, top layer first.
///
/// `id` is a content hash over (role, thickness, modulus, poisson) of every
/// layer in declared order. The display name is not part of the identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub layers: Vec<Layer>,
    pub total_thickness: f64,
}

impl Candidate {
    pub fn new(layers: Vec<Layer>) -> Self {
        let total_thickness = round3(layers.iter().map(|l| l.thickness).sum());
        let id = content_hash(&layers);
        Self {
            id,
            layers,
            total_thickness,
        }
    }
}

/// SHA-256 over the ordered layer tuple, hex encoded. Never re-sorts.
pub fn content_hash(layers: &[Layer]) -> String {
    let mut hasher = Sha256::new();
    for layer in layers {
        hasher.update(
            format!(
                "{}:{:.3}:{:.3}:{:.4};",
                layer.role.as_str(),
                layer.thickness,
                layer.modulus,
                layer.poisson
            )
            .as_bytes(),
        );
    }
    hex::encode(hasher.finalize())
}

pub(crate) fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

// ────────────────────────────────────────────────────────────────────────────
// Verification
// ────────────────────────────────────────────────────────────────────────────

/// Output of the structural viability model for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub viable: bool,
    pub fatigue_ratio: f64,
    pub uplift_ratio: f64,
    pub tensile_microstrain: f64,
    pub compressive_microstrain: f64,
    pub deformation_mm: f64,
    pub admissible_fatigue_cycles: f64,
    pub admissible_rutting_cycles: f64,
    pub nec: f64,
    pub equivalent_modulus: f64,
    pub bituminous_modulus: f64,
    pub total_thickness: f64,
}

// ────────────────────────────────────────────────────────────────────────────
// Collaborator scores
// ────────────────────────────────────────────────────────────────────────────

/// A collaborator score that may be missing. Scoring failures never discard
/// a viable candidate; they land here as `Unscored`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Score<T> {
    Scored { value: T },
    Unscored { reason: String },
}

impl<T> Score<T> {
    pub fn scored(value: T) -> Self {
        Score::Scored { value }
    }

    pub fn unscored(reason: impl Into<String>) -> Self {
        Score::Unscored {
            reason: reason.into(),
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Score::Scored { value } => Some(value),
            Score::Unscored { .. } => None,
        }
    }

    pub fn is_scored(&self) -> bool {
        matches!(self, Score::Scored { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmissionLevel {
    Low,
    Medium,
    High,
}

/// Footprint per tonne of placed material and per square metre of pavement (kg CO2e).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionsScore {
    pub total_per_tonne: f64,
    pub total_per_area: f64,
    pub level: EmissionLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerCost {
    pub name: String,
    pub cost_per_area: f64,
}

/// Cost breakdown per square metre of pavement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostScore {
    pub material_per_area: f64,
    pub transport_per_area: f64,
    pub production_per_area: f64,
    pub placement_per_area: f64,
    pub total_per_area: f64,
    pub per_layer: Vec<LayerCost>,
}

/// Areal mass split used by the emissions collaborator (kg per m²).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MassBuckets {
    pub binder: f64,
    pub aggregate: f64,
    pub reclaimed: f64,
    /// Mass of the bound (hot-mix) layers, a subset of `total`.
    pub bound: f64,
    pub total: f64,
    /// Share of the total mass contributed by each layer, in layer order.
    pub layer_fractions: Vec<f64>,
}

/// A viable candidate with its verification verdict and collaborator scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedCandidate {
    pub candidate: Candidate,
    pub verification: VerificationResult,
    pub mass: MassBuckets,
    pub emissions: Score<EmissionsScore>,
    pub cost: Score<CostScore>,
}

impl EvaluatedCandidate {
    pub fn id(&self) -> &str {
        &self.candidate.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::layer::LayerRole;

    fn layer(role: LayerRole, name: &str, thickness: f64) -> Layer {
        Layer {
            role,
            name: name.to_string(),
            thickness,
            modulus: 4000.0,
            poisson: 0.35,
        }
    }

    #[test]
    fn test_hash_is_stable_and_order_sensitive() {
        let a = vec![
            layer(LayerRole::Wearing, "w", 4.0),
            layer(LayerRole::Base, "b", 10.0),
        ];
        let b = vec![
            layer(LayerRole::Base, "b", 10.0),
            layer(LayerRole::Wearing, "w", 4.0),
        ];
        assert_eq!(Candidate::new(a.clone()).id, Candidate::new(a.clone()).id);
        assert_ne!(Candidate::new(a).id, Candidate::new(b).id);
    }

    #[test]
    fn test_hash_ignores_display_name() {
        let a = vec![layer(LayerRole::Wearing, "AC 0/12", 4.0)];
        let b = vec![layer(LayerRole::Wearing, "SMA", 4.0)];
        assert_eq!(content_hash(&a), content_hash(&b));
    }

    #[test]
    fn test_total_thickness() {
        let c = Candidate::new(vec![
            layer(LayerRole::Wearing, "w", 4.1),
            layer(LayerRole::Base, "b", 10.2),
        ]);
        assert_eq!(c.total_thickness, 14.3);
        assert_eq!(c.id.len(), 64);
    }

    #[test]
    fn test_score_serializes_with_state_tag() {
        let s: Score<f64> = Score::unscored("timeout");
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["state"], "unscored");
        assert_eq!(json["reason"], "timeout");
        assert!(s.value().is_none());

        let s = Score::scored(1.5);
        assert_eq!(s.value(), Some(&1.5));
    }
}
