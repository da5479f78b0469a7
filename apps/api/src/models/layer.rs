use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Poisson ratio assumed when a layer constraint omits one.
pub const DEFAULT_POISSON: f64 = 0.35;

/// Structural role of a layer, listed top-down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerRole {
    Wearing,
    Intermediate,
    Base,
    Subbase,
    Foundation,
}

impl LayerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerRole::Wearing => "wearing",
            LayerRole::Intermediate => "intermediate",
            LayerRole::Base => "base",
            LayerRole::Subbase => "subbase",
            LayerRole::Foundation => "foundation",
        }
    }

    /// Bituminous (bound) layers. These carry binder and drive the
    /// tensile-strain fatigue check.
    pub fn is_bound(&self) -> bool {
        matches!(
            self,
            LayerRole::Wearing | LayerRole::Intermediate | LayerRole::Base
        )
    }
}

/// Caller-supplied thickness constraint for one layer of the cross-section.
///
/// Thicknesses are in centimetres, the modulus in MPa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub role: LayerRole,
    pub name: String,
    pub min_thickness: f64,
    pub max_thickness: f64,
    pub step: f64,
    pub modulus: f64,
    #[serde(default = "default_poisson")]
    pub poisson: f64,
}

fn default_poisson() -> f64 {
    DEFAULT_POISSON
}

impl LayerSpec {
    /// Checks the material properties. Thickness bounds are checked by the
    /// grid generator, which is the single owner of that rule.
    pub fn validate(&self) -> Result<(), AppError> {
        if !self.modulus.is_finite() || self.modulus <= 0.0 {
            return Err(AppError::InvalidConstraint(format!(
                "layer '{}' must have a positive elastic modulus, got {}",
                self.name, self.modulus
            )));
        }
        if !self.poisson.is_finite() || self.poisson <= 0.0 || self.poisson >= 0.5 {
            return Err(AppError::InvalidConstraint(format!(
                "layer '{}' Poisson ratio must be in (0, 0.5), got {}",
                self.name, self.poisson
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
impl LayerSpec {
    /// Builds a spec with the default Poisson ratio and the role name as display name.
    pub fn new(role: LayerRole, min_thickness: f64, max_thickness: f64, step: f64, modulus: f64) -> Self {
        Self {
            role,
            name: role.as_str().to_string(),
            min_thickness,
            max_thickness,
            step,
            modulus,
            poisson: DEFAULT_POISSON,
        }
    }

    pub fn with_poisson(mut self, poisson: f64) -> Self {
        self.poisson = poisson;
        self
    }
}

/// A concrete layer of a candidate cross-section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub role: LayerRole,
    pub name: String,
    pub thickness: f64,
    pub modulus: f64,
    pub poisson: f64,
}

impl Layer {
    pub fn from_spec(spec: &LayerSpec, thickness: f64) -> Self {
        Self {
            role: spec.role,
            name: spec.name.clone(),
            thickness,
            modulus: spec.modulus,
            poisson: spec.poisson,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bound_roles() {
        assert!(LayerRole::Wearing.is_bound());
        assert!(LayerRole::Base.is_bound());
        assert!(!LayerRole::Subbase.is_bound());
        assert!(!LayerRole::Foundation.is_bound());
    }

    #[test]
    fn test_poisson_defaults_when_omitted() {
        let spec: LayerSpec = serde_json::from_str(
            r#"{"role":"wearing","name":"AC 0/12","min_thickness":4,"max_thickness":6,"step":1,"modulus":5200}"#,
        )
        .unwrap();
        assert_eq!(spec.poisson, DEFAULT_POISSON);
        assert_eq!(spec.role, LayerRole::Wearing);
    }

    #[test]
    fn test_validate_rejects_bad_material() {
        assert!(LayerSpec::new(LayerRole::Base, 10.0, 14.0, 2.0, 0.0)
            .validate()
            .is_err());
        assert!(LayerSpec::new(LayerRole::Base, 10.0, 14.0, 2.0, 4200.0)
            .with_poisson(0.6)
            .validate()
            .is_err());
        assert!(LayerSpec::new(LayerRole::Base, 10.0, 14.0, 2.0, 4200.0)
            .validate()
            .is_ok());
    }
}
