//! Run configuration loaded from JSON.
//!
//! Every field has a default, so a config file only needs to name what it
//! changes. Defaults describe a thin 2D elastic beam resolved with ten
//! particles across its thickness.

use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{SphError, SphResult};
use crate::kernel::{Dimension, Kernel};
use crate::material::{HardeningPlasticSolid, LinearElasticSolid};
use crate::math::Real;
use crate::solid_dynamics::DEFAULT_ACOUSTIC_CFL;
use crate::surface_indication::DEFAULT_THRESHOLD_FACTOR;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialConfig {
    /// Reference density (kg/m^3)
    pub density: Real,
    pub youngs_modulus: Real,
    pub poisson_ratio: Real,
    /// Initial J2 yield stress; only used by plastic bodies
    pub yield_stress: Real,
    /// Linear isotropic hardening modulus
    pub hardening_modulus: Real,
}

impl Default for MaterialConfig {
    fn default() -> Self {
        Self {
            density: 1.0e3,
            youngs_modulus: 1.0e5,
            poisson_ratio: 0.45,
            yield_stress: 1.0e3,
            hardening_modulus: 0.0,
        }
    }
}

impl MaterialConfig {
    pub fn elastic_solid(&self) -> SphResult<LinearElasticSolid> {
        LinearElasticSolid::new(self.density, self.youngs_modulus, self.poisson_ratio)
    }

    pub fn plastic_solid(&self) -> SphResult<HardeningPlasticSolid> {
        HardeningPlasticSolid::new(self.elastic_solid()?, self.yield_stress, self.hardening_modulus)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SphConfig {
    pub dimension: Dimension,
    /// Initial particle spacing dp
    pub particle_spacing: Real,
    /// h = ratio * dp
    pub smoothing_length_ratio: Real,
    /// Free-surface threshold per unit dimension
    pub surface_threshold_factor: Real,
    pub cfl_factor: Real,
    pub material: MaterialConfig,
}

impl Default for SphConfig {
    fn default() -> Self {
        Self {
            dimension: Dimension::Two,
            particle_spacing: 0.001,
            smoothing_length_ratio: 1.3,
            surface_threshold_factor: DEFAULT_THRESHOLD_FACTOR,
            cfl_factor: DEFAULT_ACOUSTIC_CFL,
            material: MaterialConfig::default(),
        }
    }
}

impl SphConfig {
    pub fn smoothing_length(&self) -> Real {
        self.smoothing_length_ratio * self.particle_spacing
    }

    pub fn kernel(&self) -> SphResult<Kernel> {
        Kernel::new(self.smoothing_length())
    }

    /// Particle volume `dp^dim` of a regular lattice.
    pub fn particle_volume(&self) -> Real {
        self.particle_spacing.powi(self.dimension.value() as i32)
    }

    /// Free-surface threshold for this dimension.
    pub fn surface_threshold(&self) -> Real {
        self.surface_threshold_factor * self.dimension.as_real()
    }

    /// Checks the numerical parameters and builds the materials once to
    /// surface their errors.
    pub fn validate(&self) -> SphResult<()> {
        if !(self.particle_spacing.is_finite() && self.particle_spacing > 0.0) {
            return Err(SphError::Configuration(format!(
                "particle spacing must be positive, got {}",
                self.particle_spacing
            )));
        }
        if !(self.smoothing_length_ratio.is_finite() && self.smoothing_length_ratio > 0.0) {
            return Err(SphError::Configuration(format!(
                "smoothing length ratio must be positive, got {}",
                self.smoothing_length_ratio
            )));
        }
        if !(self.surface_threshold_factor > 0.0 && self.surface_threshold_factor < 1.0) {
            return Err(SphError::Configuration(format!(
                "surface threshold factor must lie in (0, 1), got {}",
                self.surface_threshold_factor
            )));
        }
        if !(self.cfl_factor > 0.0 && self.cfl_factor <= 1.0) {
            return Err(SphError::Configuration(format!(
                "CFL factor must lie in (0, 1], got {}",
                self.cfl_factor
            )));
        }
        self.kernel()?;
        self.material.plastic_solid()?;
        Ok(())
    }

    /// Save configuration to JSON file
    pub fn save_json(&self, path: &Path) -> SphResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load and validate configuration from JSON file
    pub fn load_json(path: &Path) -> SphResult<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        info!(
            "loaded {}: {:?}, dp = {}, h = {}",
            path.display(),
            config.dimension,
            config.particle_spacing,
            config.smoothing_length()
        );
        Ok(config)
    }
}
