//! Design-equivalent load cycles (NEC) over the design life.

use crate::errors::AppError;
use crate::models::request::TrafficParams;

const DAYS_PER_YEAR: f64 = 365.0;

/// Cumulative growth multiplier over `years` at `growth_percent` per year.
///
/// Sum of the geometric series `((1+g)^n - 1) / g`; at zero growth the
/// series degenerates to `n`.
pub fn growth_factor(growth_percent: f64, years: f64) -> f64 {
    if growth_percent == 0.0 {
        return years;
    }
    let g = growth_percent / 100.0;
    ((1.0 + g).powf(years) - 1.0) / g
}

/// `365 · ADT · (%heavy/100) · distribution · equivalency · growth_factor`.
pub fn nec(params: &TrafficParams) -> Result<f64, AppError> {
    params.validate()?;
    Ok(DAYS_PER_YEAR
        * params.average_daily_traffic
        * (params.heavy_vehicle_percent / 100.0)
        * params.distribution_factor
        * params.equivalency_factor
        * growth_factor(params.annual_growth_percent, params.design_life_years))
}
