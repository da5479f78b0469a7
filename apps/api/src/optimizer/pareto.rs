//! Pareto fronts over normalized objectives (all minimised).
//!
//! Fast non-dominated sorting assigns every candidate to a front; crowding
//! distance orders each front from most to least isolated.
//!
//! # References
//!
//! - Deb et al. (2002), "A Fast and Elitist Multiobjective Genetic Algorithm: NSGA-II"

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::candidate::EvaluatedCandidate;
use crate::optimizer::objectives::{FallbackCosts, ObjectiveSet, ObjectiveVector};

/// Largest candidate set the front computation accepts. Sorting compares
/// every pair, so the cost grows with the square of the set size.
pub const MAX_PARETO_CANDIDATES: usize = 20_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParetoMember {
    pub id: String,
    /// Infinite for boundary members; serialized as `null`.
    pub crowding_distance: f64,
    pub objectives: ObjectiveVector,
    pub normalized: ObjectiveVector,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParetoFront {
    /// 1 = non-dominated.
    pub rank: usize,
    pub members: Vec<ParetoMember>,
}

pub fn pareto_front(candidates: &[EvaluatedCandidate], fallback: &FallbackCosts) -> Vec<ParetoFront> {
    fronts_for_set(&ObjectiveSet::from_candidates(candidates, fallback))
}

pub fn ensure_pareto_size(len: usize) -> Result<(), AppError> {
    if len > MAX_PARETO_CANDIDATES {
        return Err(AppError::InvalidConstraint(format!(
            "{len} candidates exceed the Pareto limit of {MAX_PARETO_CANDIDATES}; narrow the search filters"
        )));
    }
    Ok(())
}

pub fn fronts_for_set(set: &ObjectiveSet) -> Vec<ParetoFront> {
    let points: Vec<[f64; 3]> = set.normalized.iter().map(|v| v.as_array()).collect();
    let sorted = non_dominated_sort(&points);

    sorted
        .fronts
        .iter()
        .enumerate()
        .map(|(k, front)| {
            let front_points: Vec<[f64; 3]> = front.iter().map(|&i| points[i]).collect();
            let distances = crowding_distance(&front_points);

            let mut members: Vec<ParetoMember> = front
                .iter()
                .zip(distances)
                .map(|(&i, crowding_distance)| ParetoMember {
                    id: set.ids[i].clone(),
                    crowding_distance,
                    objectives: set.raw[i],
                    normalized: set.normalized[i],
                })
                .collect();
            members.sort_by(|a, b| b.crowding_distance.total_cmp(&a.crowding_distance));

            ParetoFront {
                rank: k + 1,
                members,
            }
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Non-dominated sorting
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub(crate) struct NondominatedSortResult {
    /// Point indices grouped by front, each in input order.
    pub fronts: Vec<Vec<usize>>,
}

#[derive(Debug, PartialEq)]
enum Dominance {
    Left,
    Right,
    Neither,
}

/// `a` dominates `b` when it is no worse everywhere and strictly better somewhere.
fn dominance_cmp(a: &[f64], b: &[f64]) -> Dominance {
    let mut a_better = false;
    let mut b_better = false;
    for (&va, &vb) in a.iter().zip(b) {
        if va < vb {
            a_better = true;
        } else if vb < va {
            b_better = true;
        }
    }
    match (a_better, b_better) {
        (true, false) => Dominance::Left,
        (false, true) => Dominance::Right,
        _ => Dominance::Neither,
    }
}

/// Memory stays linear in `points`: instead of storing who dominates whom,
/// each peeled front is compared against the points still waiting.
pub(crate) fn non_dominated_sort(points: &[[f64; 3]]) -> NondominatedSortResult {
    let n = points.len();
    let mut domination_count = vec![0usize; n];

    for i in 0..n {
        for j in (i + 1)..n {
            match dominance_cmp(&points[i], &points[j]) {
                Dominance::Left => domination_count[j] += 1,
                Dominance::Right => domination_count[i] += 1,
                Dominance::Neither => {}
            }
        }
    }

    let (mut current, mut waiting): (Vec<usize>, Vec<usize>) =
        (0..n).partition(|&i| domination_count[i] == 0);
    let mut fronts = Vec::new();
    while !current.is_empty() {
        for &j in &waiting {
            for &i in &current {
                if dominance_cmp(&points[i], &points[j]) == Dominance::Left {
                    domination_count[j] -= 1;
                }
            }
        }
        let (next, rest): (Vec<usize>, Vec<usize>) =
            waiting.into_iter().partition(|&j| domination_count[j] == 0);
        fronts.push(current);
        current = next;
        waiting = rest;
    }

    NondominatedSortResult { fronts }
}

/// Boundary points per objective get `INFINITY`; interior points accumulate
/// their neighbours' gap divided by the objective's span in this front.
pub(crate) fn crowding_distance(points: &[[f64; 3]]) -> Vec<f64> {
    let n = points.len();
    if n <= 2 {
        return vec![f64::INFINITY; n];
    }

    let mut distances = vec![0.0f64; n];
    for k in 0..3 {
        let mut indices: Vec<usize> = (0..n).collect();
        indices.sort_by(|&a, &b| points[a][k].total_cmp(&points[b][k]));

        distances[indices[0]] = f64::INFINITY;
        distances[indices[n - 1]] = f64::INFINITY;

        let span = points[indices[n - 1]][k] - points[indices[0]][k];
        if span > 0.0 {
            for w in 1..(n - 1) {
                let prev = points[indices[w - 1]][k];
                let next = points[indices[w + 1]][k];
                distances[indices[w]] += (next - prev) / span;
            }
        }
    }
    distances
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::objectives::fixtures::evaluated;
    use proptest::prelude::*;

    fn dominates(a: &[f64; 3], b: &[f64; 3]) -> bool {
        dominance_cmp(a, b) == Dominance::Left
    }

    #[test]
    fn test_clear_dominance_chain() {
        let result = non_dominated_sort(&[[0.0, 0.0, 0.0], [0.5, 0.5, 0.5], [1.0, 1.0, 1.0]]);
        assert_eq!(result.fronts, vec![vec![0], vec![1], vec![2]]);
    }

    #[test]
    fn test_trade_offs_share_a_front() {
        let result = non_dominated_sort(&[
            [0.0, 1.0, 0.5],
            [1.0, 0.0, 0.5],
            [0.5, 0.5, 0.0],
            [0.6, 0.6, 0.6],
        ]);
        assert_eq!(result.fronts, vec![vec![0, 1, 2], vec![3]]);
    }

    #[test]
    fn test_identical_points_do_not_dominate() {
        let result = non_dominated_sort(&[[0.2, 0.2, 0.2]; 3]);
        assert_eq!(result.fronts.len(), 1);
    }

    #[test]
    fn test_long_dominance_chain() {
        let points: Vec<[f64; 3]> = (0..50).map(|i| [i as f64; 3]).collect();
        let result = non_dominated_sort(&points);
        assert_eq!(result.fronts.len(), 50);
        assert!(result.fronts.iter().enumerate().all(|(k, f)| f == &vec![k]));
    }

    #[test]
    fn test_empty_input() {
        let result = non_dominated_sort(&[]);
        assert!(result.fronts.is_empty());
        assert!(crowding_distance(&[]).is_empty());
    }

    #[test]
    fn test_crowding_boundaries_infinite() {
        let d = crowding_distance(&[[0.0, 1.0, 0.0], [0.5, 0.5, 0.0], [1.0, 0.0, 0.0]]);
        assert!(d[0].is_infinite() && d[2].is_infinite());
        // Middle point: 1.0 from each of the two spanning objectives; the flat one adds 0.
        assert!((d[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_front_members_sorted_by_descending_crowding() {
        let candidates = vec![
            evaluated(0.0, 0.1, 0.1, Some(60.0), Some(40.0)),
            evaluated(1.0, 0.5, 0.5, Some(45.0), Some(30.0)),
            evaluated(2.0, 0.55, 0.55, Some(44.0), Some(29.5)),
            evaluated(3.0, 0.9, 0.9, Some(30.0), Some(20.0)),
        ];
        let fronts = pareto_front(&candidates, &FallbackCosts::default());
        assert_eq!(fronts[0].rank, 1);
        assert_eq!(fronts[0].members.len(), 4);
        let d: Vec<f64> = fronts[0].members.iter().map(|m| m.crowding_distance).collect();
        assert!(d.windows(2).all(|w| w[0] >= w[1]));
        assert!(d[0].is_infinite());
    }

    #[test]
    fn test_size_limit() {
        assert!(ensure_pareto_size(MAX_PARETO_CANDIDATES).is_ok());
        assert!(matches!(
            ensure_pareto_size(MAX_PARETO_CANDIDATES + 1),
            Err(AppError::InvalidConstraint(_))
        ));
    }

    #[test]
    fn test_empty_candidates_yield_no_fronts() {
        assert!(pareto_front(&[], &FallbackCosts::default()).is_empty());
    }

    proptest! {
        #[test]
        fn prop_front_structure(
            raw in prop::collection::vec((0.0f64..1.0, 0.0f64..1.0, 0.0f64..1.0), 1..30)
        ) {
            let points: Vec<[f64; 3]> = raw.iter().map(|&(a, b, c)| [a, b, c]).collect();
            let result = non_dominated_sort(&points);

            let total: usize = result.fronts.iter().map(|f| f.len()).sum();
            prop_assert_eq!(total, points.len());

            // Nothing dominates a first-front member.
            for &i in &result.fronts[0] {
                prop_assert!(points.iter().all(|p| !dominates(p, &points[i])));
            }
            // Every later member is dominated by someone one front up.
            for k in 1..result.fronts.len() {
                for &i in &result.fronts[k] {
                    prop_assert!(result.fronts[k - 1]
                        .iter()
                        .any(|&j| dominates(&points[j], &points[i])));
                }
            }
        }
    }
}
