//! Combination Enumerator
//!
//! Bounded walk over the cartesian product of layer grids.
//!
//! [`CombinationIter`] keeps an explicit stack of grid positions (one per
//! layer) and yields one completed [`Candidate`] per step, so a cap stops the
//! walk without materialising the rest of the tree. Order is the depth-first
//! backtracking order: layers in declared order, values ascending, the last
//! layer varying fastest. Identical inputs always yield identical sequences.

use tracing::debug;

use crate::design::grid::thickness_grid;
use crate::errors::AppError;
use crate::models::candidate::Candidate;
use crate::models::layer::{Layer, LayerSpec};
use crate::models::request::EnumerationFilters;

/// Lazy depth-first iterator over every thickness assignment.
#[derive(Debug, Clone)]
pub struct CombinationIter<'a> {
    specs: &'a [LayerSpec],
    grids: Vec<Vec<f64>>,
    /// Current grid index per layer; `None` once exhausted.
    stack: Option<Vec<usize>>,
}

impl<'a> CombinationIter<'a> {
    pub fn new(specs: &'a [LayerSpec]) -> Result<Self, AppError> {
        if specs.is_empty() {
            return Err(AppError::InvalidCandidate(
                "cannot enumerate an empty layer list".to_string(),
            ));
        }
        let grids = specs
            .iter()
            .map(|s| thickness_grid(s.min_thickness, s.max_thickness, s.step))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            specs,
            stack: Some(vec![0; grids.len()]),
            grids,
        })
    }

    /// Total number of combinations, saturating at `usize::MAX`.
    pub fn total(&self) -> usize {
        self.grids
            .iter()
            .try_fold(1usize, |acc, g| acc.checked_mul(g.len()))
            .unwrap_or(usize::MAX)
    }
}

impl Iterator for CombinationIter<'_> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        let stack = self.stack.as_mut()?;

        let layers = self
            .specs
            .iter()
            .zip(stack.iter())
            .zip(self.grids.iter())
            .map(|((spec, &idx), grid)| Layer::from_spec(spec, grid[idx]))
            .collect();
        let candidate = Candidate::new(layers);

        // Backtrack: pop exhausted levels, advance the deepest open one.
        let mut depth = stack.len();
        let exhausted = loop {
            if depth == 0 {
                break true;
            }
            depth -= 1;
            stack[depth] += 1;
            if stack[depth] < self.grids[depth].len() {
                break false;
            }
            stack[depth] = 0;
        };
        if exhausted {
            self.stack = None;
        }

        Some(candidate)
    }
}

/// Result of a capped enumeration.
#[derive(Debug, Clone)]
pub struct Enumeration {
    /// Candidates surviving the post-filters, in enumeration order.
    pub candidates: Vec<Candidate>,
    /// Candidates produced before post-filtering (≤ cap).
    pub total_combinations_seen: usize,
    /// More combinations existed than the cap allowed. Informational only.
    pub truncated: bool,
}

/// Enumerates at most `cap` candidates, then applies the post-filters.
pub fn enumerate(
    specs: &[LayerSpec],
    cap: usize,
    filters: &EnumerationFilters,
) -> Result<Enumeration, AppError> {
    let iter = CombinationIter::new(specs)?;
    let total = iter.total();
    let truncated = total > cap;

    let mut seen = 0usize;
    let candidates: Vec<Candidate> = iter
        .take(cap)
        .inspect(|_| seen += 1)
        .filter(|c| passes_filters(c, filters))
        .collect();

    debug!(
        "Enumerated {} of {} combinations ({} kept, truncated={})",
        seen,
        total,
        candidates.len(),
        truncated
    );

    Ok(Enumeration {
        candidates,
        total_combinations_seen: seen,
        truncated,
    })
}

fn passes_filters(candidate: &Candidate, filters: &EnumerationFilters) -> bool {
    if let Some(max) = filters.max_total_thickness {
        if candidate.total_thickness > max {
            return false;
        }
    }
    if let Some(roles) = &filters.allowed_roles {
        if !candidate.layers.iter().all(|l| roles.contains(&l.role)) {
            return false;
        }
    }
    if let Some(names) = &filters.allowed_names {
        if !candidate
            .layers
            .iter()
            .all(|l| names.iter().any(|n| n.eq_ignore_ascii_case(&l.name)))
        {
            return false;
        }
    }
    true
}
