//! Weighted-sum ranking over normalized objectives. Lower score is better.

use serde::{Deserialize, Serialize};

use crate::models::candidate::EvaluatedCandidate;
use crate::optimizer::objectives::{FallbackCosts, ObjectiveSet, ObjectiveVector};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub structural: f64,
    pub emissions: f64,
    pub economic: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self::equal()
    }
}

impl Weights {
    pub fn equal() -> Self {
        Self {
            structural: 1.0 / 3.0,
            emissions: 1.0 / 3.0,
            economic: 1.0 / 3.0,
        }
    }

    /// Scales to sum 1. Negative or non-finite components count as 0; a
    /// non-positive sum falls back to equal thirds.
    pub fn normalized(&self) -> Self {
        let clean = |w: f64| if w.is_finite() && w > 0.0 { w } else { 0.0 };
        let (s, e, c) = (clean(self.structural), clean(self.emissions), clean(self.economic));
        let sum = s + e + c;
        if sum <= 0.0 {
            return Self::equal();
        }
        Self {
            structural: s / sum,
            emissions: e / sum,
            economic: c / sum,
        }
    }

    fn apply(&self, v: &ObjectiveVector) -> f64 {
        self.structural * v.structural + self.emissions * v.emissions + self.economic * v.economic
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    /// 1-based position.
    pub rank: usize,
    pub id: String,
    pub score: f64,
    pub objectives: ObjectiveVector,
    pub normalized: ObjectiveVector,
    pub fallback_used: bool,
}

pub fn weighted_ranking(
    candidates: &[EvaluatedCandidate],
    weights: &Weights,
    fallback: &FallbackCosts,
) -> Vec<RankedCandidate> {
    rank_set(&ObjectiveSet::from_candidates(candidates, fallback), weights)
}

/// Ranks a precomputed objective set. Ties keep input order.
pub fn rank_set(set: &ObjectiveSet, weights: &Weights) -> Vec<RankedCandidate> {
    let weights = weights.normalized();
    let mut order = scored_order(set, &weights);
    order.sort_by(|a, b| a.1.total_cmp(&b.1));

    order
        .into_iter()
        .enumerate()
        .map(|(pos, (i, score))| RankedCandidate {
            rank: pos + 1,
            id: set.ids[i].clone(),
            score,
            objectives: set.raw[i],
            normalized: set.normalized[i],
            fallback_used: set.fallback_used[i],
        })
        .collect()
}

/// Index and score of the best candidate under already-normalized weights.
/// The earliest candidate wins a tie.
pub(crate) fn best_index(set: &ObjectiveSet, weights: &Weights) -> Option<(usize, f64)> {
    scored_order(set, weights)
        .into_iter()
        .fold(None, |best, (i, score)| match best {
            Some((_, best_score)) if score >= best_score => best,
            _ => Some((i, score)),
        })
}

fn scored_order(set: &ObjectiveSet, weights: &Weights) -> Vec<(usize, f64)> {
    set.normalized
        .iter()
        .enumerate()
        .map(|(i, v)| (i, weights.apply(v)))
        .collect()
}
