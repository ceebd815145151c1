//! Constitutive models for weakly compressible solids.
//!
//! - [`LinearElasticSolid`]: Saint Venant-Kirchhoff response from Young's
//!   modulus and Poisson's ratio
//! - [`HardeningPlasticSolid`]: J2 plasticity with linear isotropic hardening,
//!   integrated with a radial return mapping
//!
//! Stresses are second Piola-Kirchhoff stresses of the deformation gradient.
//! Callers guarantee `det F > 0`.

use crate::error::{SphError, SphResult};
use crate::math::{deviatoric, frobenius_norm, trace, Matd, Real, SQRT_2_OVER_3};

/// Lamé parameters (λ, G) from Young's modulus and Poisson's ratio.
pub fn lame_lambda_mu(youngs_modulus: Real, poisson_ratio: Real) -> (Real, Real) {
    (
        youngs_modulus * poisson_ratio / ((1.0 + poisson_ratio) * (1.0 - 2.0 * poisson_ratio)),
        shear_modulus(youngs_modulus, poisson_ratio),
    )
}

pub fn shear_modulus(youngs_modulus: Real, poisson_ratio: Real) -> Real {
    youngs_modulus / (2.0 * (1.0 + poisson_ratio))
}

pub fn bulk_modulus(youngs_modulus: Real, poisson_ratio: Real) -> Real {
    youngs_modulus / (3.0 * (1.0 - 2.0 * poisson_ratio))
}

/// Elastic response used by the stress relaxation schemes.
pub trait ElasticSolid: Send + Sync {
    fn reference_density(&self) -> Real;

    /// Artificial sound speed `c0 = sqrt(K / rho0)`.
    fn sound_speed(&self) -> Real;

    fn stress_pk2(&self, deformation: &Matd) -> Matd;
}

/// Per-particle history of a plastic solid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlasticState {
    /// Inverse of the plastic right Cauchy-Green tensor, `Cp^-1`.
    pub inverse_plastic_strain: Matd,
    /// Accumulated equivalent plastic strain.
    pub hardening_parameter: Real,
}

impl Default for PlasticState {
    fn default() -> Self {
        Self {
            inverse_plastic_strain: Matd::IDENTITY,
            hardening_parameter: 0.0,
        }
    }
}

/// Stress and advanced history of one plastic step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlasticResponse {
    pub stress_pk2: Matd,
    pub state: PlasticState,
    pub yielded: bool,
}

pub trait PlasticSolid: ElasticSolid {
    /// Elastic trial, yield check and return mapping for one particle.
    fn plastic_stress_pk2(&self, deformation: &Matd, state: &PlasticState) -> PlasticResponse;
}

/// Projects the deviatoric part of `trial` onto the J2 surface of radius
/// `sqrt(2/3) * yield_limit`. Inside the surface `trial` is returned as is;
/// the volumetric part is never modified.
pub fn radial_return(trial: &Matd, yield_limit: Real) -> Matd {
    let dev = deviatoric(trial);
    let norm = frobenius_norm(&dev);
    let radius = SQRT_2_OVER_3 * yield_limit;
    if norm <= radius {
        return *trial;
    }
    let volumetric = *trial - dev;
    volumetric + dev * (radius / norm)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearElasticSolid {
    rho0: Real,
    youngs_modulus: Real,
    poisson_ratio: Real,
    lambda0: Real,
    g0: Real,
    k0: Real,
}

impl LinearElasticSolid {
    pub fn new(rho0: Real, youngs_modulus: Real, poisson_ratio: Real) -> SphResult<Self> {
        if !(rho0.is_finite() && rho0 > 0.0) {
            return Err(SphError::Configuration(format!(
                "reference density must be positive, got {rho0}"
            )));
        }
        if !(youngs_modulus.is_finite() && youngs_modulus > 0.0) {
            return Err(SphError::Configuration(format!(
                "Young's modulus must be positive, got {youngs_modulus}"
            )));
        }
        if !(poisson_ratio > -1.0 && poisson_ratio < 0.5) {
            return Err(SphError::Configuration(format!(
                "Poisson's ratio must lie in (-1, 0.5), got {poisson_ratio}"
            )));
        }
        let (lambda0, g0) = lame_lambda_mu(youngs_modulus, poisson_ratio);
        Ok(Self {
            rho0,
            youngs_modulus,
            poisson_ratio,
            lambda0,
            g0,
            k0: bulk_modulus(youngs_modulus, poisson_ratio),
        })
    }

    pub fn youngs_modulus(&self) -> Real {
        self.youngs_modulus
    }

    pub fn poisson_ratio(&self) -> Real {
        self.poisson_ratio
    }

    pub fn lambda0(&self) -> Real {
        self.lambda0
    }

    pub fn shear_modulus(&self) -> Real {
        self.g0
    }

    pub fn bulk_modulus(&self) -> Real {
        self.k0
    }
}

impl ElasticSolid for LinearElasticSolid {
    fn reference_density(&self) -> Real {
        self.rho0
    }

    fn sound_speed(&self) -> Real {
        (self.k0 / self.rho0).sqrt()
    }

    fn stress_pk2(&self, deformation: &Matd) -> Matd {
        let strain = (deformation.transpose() * *deformation - Matd::IDENTITY) * 0.5;
        Matd::IDENTITY * (self.lambda0 * trace(&strain)) + strain * (2.0 * self.g0)
    }
}

/// J2 plasticity with linear isotropic hardening on top of a linear elastic solid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HardeningPlasticSolid {
    elastic: LinearElasticSolid,
    yield_stress: Real,
    hardening_modulus: Real,
}

impl HardeningPlasticSolid {
    pub fn new(
        elastic: LinearElasticSolid,
        yield_stress: Real,
        hardening_modulus: Real,
    ) -> SphResult<Self> {
        if !(yield_stress.is_finite() && yield_stress > 0.0) {
            return Err(SphError::Configuration(format!(
                "yield stress must be positive, got {yield_stress}"
            )));
        }
        if !(hardening_modulus.is_finite() && hardening_modulus >= 0.0) {
            return Err(SphError::Configuration(format!(
                "hardening modulus must be non-negative, got {hardening_modulus}"
            )));
        }
        Ok(Self {
            elastic,
            yield_stress,
            hardening_modulus,
        })
    }

    pub fn elastic(&self) -> &LinearElasticSolid {
        &self.elastic
    }

    pub fn yield_stress(&self) -> Real {
        self.yield_stress
    }

    pub fn hardening_modulus(&self) -> Real {
        self.hardening_modulus
    }

    /// Current yield limit `sigma_Y + K * alpha`.
    pub fn yield_limit(&self, hardening_parameter: Real) -> Real {
        self.yield_stress + self.hardening_modulus * hardening_parameter
    }
}

impl ElasticSolid for HardeningPlasticSolid {
    fn reference_density(&self) -> Real {
        self.elastic.reference_density()
    }

    fn sound_speed(&self) -> Real {
        self.elastic.sound_speed()
    }

    fn stress_pk2(&self, deformation: &Matd) -> Matd {
        self.elastic.stress_pk2(deformation)
    }
}

impl PlasticSolid for HardeningPlasticSolid {
    fn plastic_stress_pk2(&self, deformation: &Matd, state: &PlasticState) -> PlasticResponse {
        let g0 = self.elastic.g0;
        let k0 = self.elastic.k0;
        let f = *deformation;
        let f_inv = f.inverse();
        let j = f.determinant();

        // Elastic trial: isochoric left Cauchy-Green tensor.
        let be = f * state.inverse_plastic_strain * f.transpose();
        let volume_scale = be.determinant().cbrt();
        let normalized_be = be * (1.0 / volume_scale);
        let mean = trace(&normalized_be) / 3.0;
        let trial = (normalized_be - Matd::IDENTITY * mean) * g0;

        let trial_norm = frobenius_norm(&trial);
        let yield_function =
            trial_norm - SQRT_2_OVER_3 * self.yield_limit(state.hardening_parameter);

        let (deviatoric_stress, next_state, yielded) = if yield_function > 0.0 {
            let mu_bar = mean * g0;
            let increment =
                yield_function / (2.0 * mu_bar * (1.0 + self.hardening_modulus / (3.0 * mu_bar)));
            let hardening_parameter = state.hardening_parameter + SQRT_2_OVER_3 * increment;
            let returned = radial_return(&trial, self.yield_limit(hardening_parameter));

            let relaxed_be = (returned * (1.0 / g0) + Matd::IDENTITY * mean) * volume_scale;
            let inverse_plastic_strain = f_inv * relaxed_be * f_inv.transpose();
            // Plastic flow is isochoric.
            let next = PlasticState {
                inverse_plastic_strain: inverse_plastic_strain
                    * inverse_plastic_strain.determinant().cbrt().recip(),
                hardening_parameter,
            };
            (returned, next, true)
        } else {
            (trial, *state, false)
        };

        let kirchhoff = deviatoric_stress + Matd::IDENTITY * (0.5 * k0 * (j * j - 1.0));
        PlasticResponse {
            stress_pk2: f_inv * kirchhoff * f_inv.transpose(),
            state: next_state,
            yielded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vecd;

    fn steel_like() -> LinearElasticSolid {
        LinearElasticSolid::new(1000.0, 1.0e5, 0.45).unwrap()
    }

    fn shear(gamma: Real) -> Matd {
        Matd::from_cols(Vecd::X, Vecd::new(gamma, 1.0, 0.0), Vecd::Z)
    }

    #[test]
    fn test_lame_parameters() {
        let solid = steel_like();
        assert!((solid.shear_modulus() - 1.0e5 / 2.9).abs() < 1e-9);
        assert!((solid.lambda0() - 1.0e5 * 0.45 / (1.45 * 0.1)).abs() < 1e-6);
        assert!((solid.sound_speed() - (1.0e5_f64 / 0.3 / 1000.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert!(LinearElasticSolid::new(0.0, 1.0, 0.3).is_err());
        assert!(LinearElasticSolid::new(1.0, -1.0, 0.3).is_err());
        assert!(LinearElasticSolid::new(1.0, 1.0, 0.5).is_err());
        assert!(HardeningPlasticSolid::new(steel_like(), 0.0, 0.0).is_err());
        assert!(HardeningPlasticSolid::new(steel_like(), 1.0, -1.0).is_err());
    }

    #[test]
    fn test_undeformed_state_is_stress_free() {
        let solid = steel_like();
        assert_eq!(solid.stress_pk2(&Matd::IDENTITY), Matd::ZERO);

        let plastic = HardeningPlasticSolid::new(solid, 100.0, 10.0).unwrap();
        let response = plastic.plastic_stress_pk2(&Matd::IDENTITY, &PlasticState::default());
        assert!(frobenius_norm(&response.stress_pk2) < 1e-9);
        assert!(!response.yielded);
    }

    #[test]
    fn test_radial_return_identity_inside() {
        let trial = Matd::from_cols(
            Vecd::new(2.0, 0.1, 0.0),
            Vecd::new(0.1, 2.0, 0.0),
            Vecd::new(0.0, 0.0, 2.0),
        );
        assert_eq!(radial_return(&trial, 10.0), trial);
    }

    #[test]
    fn test_radial_return_projects_outside() {
        let trial = Matd::from_cols(
            Vecd::new(5.0, 3.0, 0.0),
            Vecd::new(3.0, -1.0, 0.0),
            Vecd::new(0.0, 0.0, 2.0),
        );
        let limit = 1.0;
        let returned = radial_return(&trial, limit);

        let dev_trial = deviatoric(&trial);
        let dev_returned = deviatoric(&returned);
        assert!((frobenius_norm(&dev_returned) - SQRT_2_OVER_3 * limit).abs() < 1e-12);
        assert!((trace(&returned) - trace(&trial)).abs() < 1e-12);
        // Same direction.
        let scale = frobenius_norm(&dev_returned) / frobenius_norm(&dev_trial);
        assert!(frobenius_norm(&(dev_returned - dev_trial * scale)) < 1e-12);
    }

    #[test]
    fn test_small_shear_stays_elastic() {
        let plastic = HardeningPlasticSolid::new(steel_like(), 1.0e4, 0.0).unwrap();
        let state = PlasticState::default();
        let response = plastic.plastic_stress_pk2(&shear(1.0e-3), &state);
        assert!(!response.yielded);
        assert_eq!(response.state, state);
    }

    #[test]
    fn test_large_shear_yields_and_hardens() {
        let plastic = HardeningPlasticSolid::new(steel_like(), 100.0, 1000.0).unwrap();
        let response = plastic.plastic_stress_pk2(&shear(0.2), &PlasticState::default());
        assert!(response.yielded);
        assert!(response.state.hardening_parameter > 0.0);
        assert_ne!(response.state.inverse_plastic_strain, Matd::IDENTITY);

        let cp_inv = response.state.inverse_plastic_strain;
        assert!(frobenius_norm(&(cp_inv - cp_inv.transpose())) < 1e-9);
        assert!(cp_inv.determinant() > 0.0);

        // The relaxed stress is smaller than the purely elastic one.
        let elastic = plastic.stress_pk2(&shear(0.2));
        assert!(
            frobenius_norm(&deviatoric(&response.stress_pk2))
                < frobenius_norm(&deviatoric(&elastic))
        );
    }

    #[test]
    fn test_repeated_yielding_keeps_plastic_strain_isochoric() {
        let plastic = HardeningPlasticSolid::new(steel_like(), 100.0, 1000.0).unwrap();
        let mut state = PlasticState::default();
        let mut yield_steps = 0;
        for step in 1..=20 {
            let response = plastic.plastic_stress_pk2(&shear(0.02 * step as Real), &state);
            if response.yielded {
                yield_steps += 1;
            }
            state = response.state;
        }
        assert!(yield_steps > 10, "yielded in {yield_steps} steps");
        let det = state.inverse_plastic_strain.determinant();
        assert!((det - 1.0).abs() < 1e-12, "det(Cp^-1) = {det}");
    }
}
