use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::design::grid::thickness_grid;
use crate::errors::AppError;
use crate::models::layer::{LayerRole, LayerSpec};

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 500;

/// Structural design scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tipology {
    NewConstruction,
    Reinforcement,
    Recycling,
    ThinOverlay,
}

/// Traffic inputs for the design cycle count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficParams {
    /// Average daily traffic, all vehicles, both directions.
    pub average_daily_traffic: f64,
    pub heavy_vehicle_percent: f64,
    /// Directional and lane distribution factor (0–1).
    pub distribution_factor: f64,
    /// Load-equivalency factor per heavy vehicle.
    pub equivalency_factor: f64,
    pub design_life_years: f64,
    #[serde(default)]
    pub annual_growth_percent: f64,
}

impl TrafficParams {
    pub fn validate(&self) -> Result<(), AppError> {
        let fields = [
            ("average_daily_traffic", self.average_daily_traffic),
            ("heavy_vehicle_percent", self.heavy_vehicle_percent),
            ("distribution_factor", self.distribution_factor),
            ("equivalency_factor", self.equivalency_factor),
            ("design_life_years", self.design_life_years),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(AppError::InvalidConstraint(format!(
                    "traffic.{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if self.heavy_vehicle_percent > 100.0 {
            return Err(AppError::InvalidConstraint(format!(
                "traffic.heavy_vehicle_percent must be at most 100, got {}",
                self.heavy_vehicle_percent
            )));
        }
        if !self.annual_growth_percent.is_finite() || self.annual_growth_percent <= -100.0 {
            return Err(AppError::InvalidConstraint(format!(
                "traffic.annual_growth_percent must be greater than -100, got {}",
                self.annual_growth_percent
            )));
        }
        Ok(())
    }
}

/// Subgrade supporting the cross-section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Foundation {
    /// Elastic modulus in MPa.
    pub modulus: f64,
    #[serde(default = "default_foundation_poisson")]
    pub poisson: f64,
}

fn default_foundation_poisson() -> f64 {
    crate::models::layer::DEFAULT_POISSON
}

/// Haul distances in km.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Distances {
    pub quarry_to_plant_km: f64,
    pub plant_to_site_km: f64,
    pub binder_supply_km: f64,
}

impl Default for Distances {
    fn default() -> Self {
        Self {
            quarry_to_plant_km: 20.0,
            plant_to_site_km: 30.0,
            binder_supply_km: 150.0,
        }
    }
}

/// Unit prices handed to the cost collaborator (currency per tonne unless noted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pricing {
    pub binder_per_tonne: f64,
    pub aggregate_per_tonne: f64,
    pub transport_per_tonne_km: f64,
    pub production_per_tonne: f64,
    pub placement_per_tonne: f64,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            binder_per_tonne: 550.0,
            aggregate_per_tonne: 18.0,
            transport_per_tonne_km: 0.12,
            production_per_tonne: 6.0,
            placement_per_tonne: 4.0,
        }
    }
}

/// Plant process parameters handed to the emissions collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessParameters {
    /// Hot-mix production temperature in °C.
    pub mixing_temperature_c: f64,
    /// Share of bound-layer aggregate replaced by reclaimed asphalt.
    /// Only honoured under the recycling tipology.
    pub reclaimed_ratio: f64,
}

impl Default for ProcessParameters {
    fn default() -> Self {
        Self {
            mixing_temperature_c: 160.0,
            reclaimed_ratio: 0.0,
        }
    }
}

/// Optional post-filters applied after enumeration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumerationFilters {
    pub max_total_thickness: Option<f64>,
    pub allowed_roles: Option<Vec<LayerRole>>,
    pub allowed_names: Option<Vec<String>>,
}

/// A design-space search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub tipology: Tipology,
    /// Layer constraints in stacking order, top-down.
    pub layers: Vec<LayerSpec>,
    #[serde(default)]
    pub combination_cap: Option<usize>,
    pub traffic: TrafficParams,
    pub foundation: Foundation,
    #[serde(default)]
    pub distances: Distances,
    #[serde(default)]
    pub pricing: Pricing,
    #[serde(default)]
    pub process: ProcessParameters,
    #[serde(default)]
    pub filters: EnumerationFilters,
    #[serde(default)]
    pub asynchronous: bool,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

/// Every request field that changes the generated result. Pagination and the
/// sync/async switch are deliberately absent.
#[derive(Serialize)]
struct CacheKeyView<'a> {
    tipology: Tipology,
    layers: &'a [LayerSpec],
    combination_cap: usize,
    traffic: &'a TrafficParams,
    foundation: &'a Foundation,
    distances: &'a Distances,
    pricing: &'a Pricing,
    process: &'a ProcessParameters,
    filters: &'a EnumerationFilters,
}

impl SearchRequest {
    pub fn effective_cap(&self, default_cap: usize) -> usize {
        self.combination_cap.unwrap_or(default_cap)
    }

    /// Content hash of the request minus pagination. Used as cache and job key.
    pub fn cache_key(&self, default_cap: usize) -> Result<String, AppError> {
        let view = CacheKeyView {
            tipology: self.tipology,
            layers: &self.layers,
            combination_cap: self.effective_cap(default_cap),
            traffic: &self.traffic,
            foundation: &self.foundation,
            distances: &self.distances,
            pricing: &self.pricing,
            process: &self.process,
            filters: &self.filters,
        };
        let canonical = serde_json::to_vec(&view)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize request: {e}")))?;
        Ok(hex::encode(Sha256::digest(&canonical)))
    }

    /// Rejects a request before any work is scheduled.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.layers.is_empty() {
            return Err(AppError::InvalidCandidate(
                "at least one layer constraint is required".to_string(),
            ));
        }
        for spec in &self.layers {
            spec.validate()?;
            thickness_grid(spec.min_thickness, spec.max_thickness, spec.step)?;
        }
        self.traffic.validate()?;

        if !self.foundation.modulus.is_finite() || self.foundation.modulus <= 0.0 {
            return Err(AppError::InvalidConstraint(format!(
                "foundation.modulus must be positive, got {}",
                self.foundation.modulus
            )));
        }
        if !(0.0..=1.0).contains(&self.process.reclaimed_ratio) {
            return Err(AppError::InvalidConstraint(format!(
                "process.reclaimed_ratio must be within [0, 1], got {}",
                self.process.reclaimed_ratio
            )));
        }
        if self.combination_cap == Some(0) {
            return Err(AppError::Validation(
                "combination_cap must be greater than zero".to_string(),
            ));
        }
        if self.page == 0 {
            return Err(AppError::Validation("page starts at 1".to_string()));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(AppError::Validation(format!(
                "page_size must be within 1..={MAX_PAGE_SIZE}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// The two-layer scenario: grids [4,5,6] × [10,12,14].
    pub fn two_layer_request() -> SearchRequest {
        SearchRequest {
            tipology: Tipology::NewConstruction,
            layers: vec![
                LayerSpec::new(LayerRole::Wearing, 4.0, 6.0, 1.0, 5200.0),
                LayerSpec::new(LayerRole::Base, 10.0, 14.0, 2.0, 4200.0),
            ],
            combination_cap: None,
            traffic: TrafficParams {
                average_daily_traffic: 2000.0,
                heavy_vehicle_percent: 5.0,
                distribution_factor: 0.5,
                equivalency_factor: 0.5,
                design_life_years: 20.0,
                annual_growth_percent: 0.0,
            },
            foundation: Foundation {
                modulus: 250.0,
                poisson: 0.35,
            },
            distances: Distances::default(),
            pricing: Pricing::default(),
            process: ProcessParameters::default(),
            filters: EnumerationFilters::default(),
            asynchronous: false,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Same shape with a 34–38 cm base; every candidate passes at the
    /// fixture's traffic (NEC ≈ 1.8e5).
    pub fn deep_section_request() -> SearchRequest {
        let mut request = two_layer_request();
        request.layers[1] = LayerSpec::new(LayerRole::Base, 34.0, 38.0, 2.0, 4200.0);
        request
    }
}
