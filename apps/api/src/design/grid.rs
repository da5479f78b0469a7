//! Discretized thickness values a single layer may take.

use crate::errors::AppError;
use crate::models::candidate::round3;

/// Slack for accumulated float error when deciding whether the last step
/// still lands on or below `max`.
const GRID_EPSILON: f64 = 1e-9;

/// Most values a single layer grid may hold.
pub const MAX_GRID_LEN: usize = 10_000;

/// Returns the ascending values `min, min+step, …` up to `max` inclusive,
/// each rounded to 3 decimals so repeated steps do not drift.
///
/// Length is `floor((max - min) / step) + 1`.
pub fn thickness_grid(min: f64, max: f64, step: f64) -> Result<Vec<f64>, AppError> {
    if !min.is_finite() || !max.is_finite() || !step.is_finite() {
        return Err(AppError::InvalidConstraint(format!(
            "thickness bounds must be finite (min={min}, max={max}, step={step})"
        )));
    }
    if step <= 0.0 {
        return Err(AppError::InvalidConstraint(format!(
            "thickness step must be positive, got {step}"
        )));
    }
    if min <= 0.0 {
        return Err(AppError::InvalidConstraint(format!(
            "minimum thickness must be positive, got {min}"
        )));
    }
    if min > max {
        return Err(AppError::InvalidConstraint(format!(
            "minimum thickness {min} exceeds maximum {max}"
        )));
    }

    let steps = ((max - min) / step + GRID_EPSILON).floor();
    // Also catches an infinite quotient before the cast.
    if steps >= MAX_GRID_LEN as f64 {
        return Err(AppError::InvalidConstraint(format!(
            "thickness grid {min}..={max} by {step} exceeds {MAX_GRID_LEN} values"
        )));
    }
    let count = steps as usize + 1;
    // Computed from the index, never by repeated addition.
    Ok((0..count).map(|i| round3(min + i as f64 * step)).collect())
}
