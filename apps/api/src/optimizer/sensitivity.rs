//! Weight-sensitivity analysis. Sweeps the weight simplex and records which
//! candidate ranks best at every point.
//!
//! With increment `h` and `k = ⌊1/h⌋`, the sweep visits every
//! (i·h, j·h, 1 − i·h − j·h) with `i + j ≤ k`. A candidate that is best at
//! `robust_threshold_percent` % of the points or more is reported as robust.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::candidate::EvaluatedCandidate;
use crate::optimizer::objectives::{FallbackCosts, ObjectiveSet};
use crate::optimizer::ranking::{best_index, Weights};

/// Finest increment accepted; bounds the sweep at 5 151 weight triples.
pub const MIN_INCREMENT: f64 = 0.01;
const STEP_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityRow {
    pub weights: Weights,
    pub best_id: String,
    pub best_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinTally {
    pub id: String,
    pub wins: usize,
    pub frequency_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityReport {
    pub increment: f64,
    pub robust_threshold_percent: f64,
    /// Weight triples visited.
    pub combinations: usize,
    /// Every candidate that won at least once, most wins first.
    pub tallies: Vec<WinTally>,
    pub robust: Vec<WinTally>,
    pub matrix: Vec<SensitivityRow>,
}

pub fn sensitivity_analysis(
    candidates: &[EvaluatedCandidate],
    increment: f64,
    robust_threshold_percent: f64,
    fallback: &FallbackCosts,
) -> Result<SensitivityReport, AppError> {
    if !increment.is_finite() || increment <= 0.0 || increment > 1.0 {
        return Err(AppError::InvalidConstraint(format!(
            "increment must be within (0, 1], got {increment}"
        )));
    }
    if increment < MIN_INCREMENT {
        return Err(AppError::InvalidConstraint(format!(
            "increment must be at least {MIN_INCREMENT}, got {increment}"
        )));
    }
    if !robust_threshold_percent.is_finite() || !(0.0..=100.0).contains(&robust_threshold_percent) {
        return Err(AppError::InvalidConstraint(format!(
            "robust_threshold_percent must be within [0, 100], got {robust_threshold_percent}"
        )));
    }

    let set = ObjectiveSet::from_candidates(candidates, fallback);
    let mut report = SensitivityReport {
        increment,
        robust_threshold_percent,
        combinations: 0,
        tallies: Vec::new(),
        robust: Vec::new(),
        matrix: Vec::new(),
    };
    if set.is_empty() {
        return Ok(report);
    }

    let steps = (1.0 / increment + STEP_EPSILON).floor() as usize;
    let mut wins = vec![0usize; set.len()];
    for i in 0..=steps {
        for j in 0..=(steps - i) {
            let weights = simplex_point(i, j, increment);
            if let Some((best, best_score)) = best_index(&set, &weights) {
                wins[best] += 1;
                report.matrix.push(SensitivityRow {
                    weights,
                    best_id: set.ids[best].clone(),
                    best_score,
                });
            }
        }
    }
    report.combinations = report.matrix.len();

    let mut tallies: Vec<WinTally> = wins
        .iter()
        .enumerate()
        .filter(|&(_, &w)| w > 0)
        .map(|(i, &w)| WinTally {
            id: set.ids[i].clone(),
            wins: w,
            frequency_percent: w as f64 * 100.0 / report.combinations as f64,
        })
        .collect();
    // Stable: equal win counts keep generation order.
    tallies.sort_by(|a, b| b.wins.cmp(&a.wins));
    report.tallies = tallies;
    report.robust = report
        .tallies
        .iter()
        .filter(|t| t.frequency_percent >= robust_threshold_percent)
        .cloned()
        .collect();

    Ok(report)
}

/// Weight triple at grid point (i, j); the economic weight takes the rest.
fn simplex_point(i: usize, j: usize, increment: f64) -> Weights {
    let structural = round6(i as f64 * increment);
    let emissions = round6(j as f64 * increment);
    let economic = round6((1.0 - structural - emissions).max(0.0));
    Weights {
        structural,
        emissions,
        economic,
    }
    .normalized()
}

fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::objectives::fixtures::evaluated;

    fn trade_off_set() -> Vec<EvaluatedCandidate> {
        vec![
            // Best structurally.
            evaluated(0.0, 0.1, 0.1, Some(60.0), Some(40.0)),
            // Best on emissions.
            evaluated(1.0, 0.9, 0.9, Some(30.0), Some(39.0)),
            // Best on cost.
            evaluated(2.0, 0.8, 0.8, Some(58.0), Some(20.0)),
        ]
    }

    #[test]
    fn test_sweep_size() {
        let report =
            sensitivity_analysis(&trade_off_set(), 0.1, 20.0, &FallbackCosts::default()).unwrap();
        // (k+1)(k+2)/2 with k = 10
        assert_eq!(report.combinations, 66);
        assert_eq!(report.matrix.len(), 66);
        let total: usize = report.tallies.iter().map(|t| t.wins).sum();
        assert_eq!(total, 66);
        for row in &report.matrix {
            let w = row.weights;
            assert!((w.structural + w.emissions + w.economic - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_corners_pick_the_specialists() {
        let candidates = trade_off_set();
        let report = sensitivity_analysis(&candidates, 0.5, 0.0, &FallbackCosts::default()).unwrap();
        let best_at = |s: f64, e: f64| {
            report
                .matrix
                .iter()
                .find(|r| r.weights.structural == s && r.weights.emissions == e)
                .map(|r| r.best_id.clone())
                .unwrap()
        };
        assert_eq!(best_at(1.0, 0.0), candidates[0].id());
        assert_eq!(best_at(0.0, 1.0), candidates[1].id());
        assert_eq!(best_at(0.0, 0.0), candidates[2].id());
    }

    #[test]
    fn test_dominant_candidate_is_robust_everywhere() {
        let candidates = vec![
            evaluated(0.0, 0.1, 0.1, Some(30.0), Some(20.0)),
            evaluated(1.0, 0.5, 0.5, Some(40.0), Some(30.0)),
        ];
        let report = sensitivity_analysis(&candidates, 0.25, 90.0, &FallbackCosts::default()).unwrap();
        assert_eq!(report.robust.len(), 1);
        assert_eq!(report.robust[0].id, candidates[0].id());
        assert!((report.robust[0].frequency_percent - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_increment() {
        for bad in [0.0, -0.1, 1.5, f64::NAN, 0.001] {
            assert!(matches!(
                sensitivity_analysis(&trade_off_set(), bad, 20.0, &FallbackCosts::default()),
                Err(AppError::InvalidConstraint(_))
            ));
        }
        assert!(sensitivity_analysis(&trade_off_set(), 0.1, 120.0, &FallbackCosts::default()).is_err());
    }

    #[test]
    fn test_empty_candidates() {
        let report = sensitivity_analysis(&[], 0.1, 20.0, &FallbackCosts::default()).unwrap();
        assert_eq!(report.combinations, 0);
        assert!(report.matrix.is_empty() && report.robust.is_empty());
    }

    #[test]
    fn test_non_dividing_increment_keeps_weights_on_simplex() {
        let report = sensitivity_analysis(&trade_off_set(), 0.3, 0.0, &FallbackCosts::default()).unwrap();
        // k = 3
        assert_eq!(report.combinations, 10);
        assert!(report.matrix.iter().all(|r| r.weights.economic >= 0.0));
    }
}
