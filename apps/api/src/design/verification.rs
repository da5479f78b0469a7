//! Structural Viability Evaluator: simplified multilayer elastic check.
//!
//! # Model
//! - Equivalent modulus: thickness-weighted mean over all layers.
//! - Bituminous modulus: the same mean over bound layers only (falls back to
//!   the overall mean when the section has none).
//! - Contact stress `q = P / (π a²)` under a reference wheel.
//! - Tensile strain at the bottom of the bound package, attenuated with
//!   depth by `exp(-h / (a + offset))`.
//! - Compressive strain on the subgrade, reduced by `1 / (1 + k·h)`.
//! - Fatigue and rutting transfer functions give admissible cycles; the
//!   section is viable when both damage ratios are ≤ 1 and the estimated
//!   deformation stays within the threshold.
//!
//! The transfer-function coefficients are calibration values. They are kept
//! as named, overridable fields of [`MechanicsConfig`].

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::candidate::{round3, VerificationResult};
use crate::models::layer::{Layer, DEFAULT_POISSON};
use crate::models::request::Foundation;

/// Floor applied to strains and moduli before exponentiation.
const EXPONENT_FLOOR: f64 = 1.0;

/// Constants of the mechanics model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MechanicsConfig {
    /// Reference wheel load in MN.
    pub wheel_load_mn: f64,
    /// Contact radius in metres.
    pub contact_radius_m: f64,
    /// Added to the contact radius in the attenuation length (metres).
    pub attenuation_offset_m: f64,
    /// `k` in the subgrade reduction `1 / (1 + k·depth)`.
    pub compressive_depth_factor: f64,
    pub fatigue_coefficient: f64,
    pub fatigue_strain_exponent: f64,
    pub fatigue_modulus_exponent: f64,
    pub rutting_coefficient: f64,
    pub rutting_strain_exponent: f64,
    /// Empirical amplification from subgrade strain to surface deformation.
    pub deformation_amplification: f64,
    pub max_deformation_mm: f64,
    pub default_poisson: f64,
}

impl Default for MechanicsConfig {
    fn default() -> Self {
        Self {
            wheel_load_mn: 0.05,
            contact_radius_m: 0.15,
            attenuation_offset_m: 0.04,
            compressive_depth_factor: 4.0,
            fatigue_coefficient: 1.2e12,
            fatigue_strain_exponent: 3.8,
            fatigue_modulus_exponent: 0.2,
            rutting_coefficient: 2.0e19,
            rutting_strain_exponent: 4.2,
            deformation_amplification: 2.5,
            max_deformation_mm: 25.0,
            default_poisson: DEFAULT_POISSON,
        }
    }
}

impl MechanicsConfig {
    /// Contact pressure in MPa.
    pub fn contact_stress(&self) -> f64 {
        self.wheel_load_mn / (PI * self.contact_radius_m.powi(2))
    }

    pub fn is_viable(&self, fatigue_ratio: f64, uplift_ratio: f64, deformation_mm: f64) -> bool {
        fatigue_ratio <= 1.0 && uplift_ratio <= 1.0 && deformation_mm <= self.max_deformation_mm
    }
}

/// Runs the viability model on one cross-section.
///
/// Thicknesses are in centimetres, moduli in MPa.
pub fn verify(
    layers: &[Layer],
    nec: f64,
    foundation: &Foundation,
    config: &MechanicsConfig,
) -> Result<VerificationResult, AppError> {
    if layers.is_empty() {
        return Err(AppError::InvalidCandidate(
            "cannot verify a cross-section without layers".to_string(),
        ));
    }
    let total_thickness: f64 = layers.iter().map(|l| l.thickness).sum();
    if !total_thickness.is_finite() || total_thickness <= 0.0 {
        return Err(AppError::InvalidCandidate(format!(
            "total thickness must be positive, got {total_thickness}"
        )));
    }

    let equivalent_modulus = weighted_modulus(layers.iter()).unwrap_or(EXPONENT_FLOOR);
    let bituminous_modulus =
        weighted_modulus(layers.iter().filter(|l| l.role.is_bound())).unwrap_or(equivalent_modulus);

    let depth_m = total_thickness / 100.0;
    let stress = config.contact_stress();

    let attenuation = (-depth_m / (config.contact_radius_m + config.attenuation_offset_m)).exp();
    let tensile_microstrain = stress / bituminous_modulus.max(EXPONENT_FLOOR) * attenuation * 1e6;

    let subgrade_strain = stress / foundation.modulus.max(EXPONENT_FLOOR)
        / (1.0 + config.compressive_depth_factor * depth_m);
    let compressive_microstrain = subgrade_strain * 1e6;

    let admissible_fatigue_cycles = config.fatigue_coefficient
        * tensile_microstrain
            .max(EXPONENT_FLOOR)
            .powf(-config.fatigue_strain_exponent)
        * bituminous_modulus
            .max(EXPONENT_FLOOR)
            .powf(-config.fatigue_modulus_exponent);

    let admissible_rutting_cycles = config.rutting_coefficient
        * compressive_microstrain
            .max(EXPONENT_FLOOR)
            .powf(-config.rutting_strain_exponent);

    let deformation_mm = subgrade_strain * depth_m * 1000.0 * config.deformation_amplification;

    let fatigue_ratio = nec / admissible_fatigue_cycles.max(1.0);
    let uplift_ratio = nec / admissible_rutting_cycles.max(1.0);

    Ok(VerificationResult {
        viable: config.is_viable(fatigue_ratio, uplift_ratio, deformation_mm),
        fatigue_ratio,
        uplift_ratio,
        tensile_microstrain,
        compressive_microstrain,
        deformation_mm,
        admissible_fatigue_cycles,
        admissible_rutting_cycles,
        nec,
        equivalent_modulus,
        bituminous_modulus,
        total_thickness: round3(total_thickness),
    })
}

/// Thickness-weighted mean modulus, `None` when the layers carry no thickness.
fn weighted_modulus<'a>(layers: impl Iterator<Item = &'a Layer>) -> Option<f64> {
    let (weighted, thickness) = layers.fold((0.0, 0.0), |(w, t), l| {
        (w + l.modulus * l.thickness, t + l.thickness)
    });
    (thickness > 0.0).then(|| weighted / thickness)
}
