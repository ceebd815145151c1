//! Particle storage with named, typed per-particle variables.
//!
//! Fields are dense arrays indexed by particle id. Algorithms register the
//! variables they need by name (registration is idempotent) and then borrow
//! them through typed accessors. The store also carries the body's reference
//! kernel and dimension.

use std::collections::HashMap;

use log::debug;

use crate::error::{SphError, SphResult};
use crate::kernel::{Dimension, Kernel};
use crate::math::{Matd, Real, Vecd};

/// Well-known variable names shared between algorithms.
pub mod names {
    pub const POSITION: &str = "Position";
    pub const VOLUME: &str = "Volume";
    pub const VELOCITY: &str = "Velocity";
    pub const ACCELERATION: &str = "Acceleration";
    pub const PRIOR_ACCELERATION: &str = "AccelerationByPrior";
    pub const DENSITY: &str = "Density";
    pub const DEFORMATION: &str = "DeformationGradient";
    pub const DEFORMATION_RATE: &str = "DeformationRate";
    pub const CORRECTION_MATRIX: &str = "CorrectionMatrix";
    pub const STRESS_PK1_B: &str = "StressPK1OnParticle";
    pub const POSITION_DIVERGENCE: &str = "PositionDivergence";
    pub const INDICATOR: &str = "Indicator";
    pub const PREVIOUS_SURFACE_INDICATOR: &str = "PreviousSurfaceIndicator";
    pub const INVERSE_PLASTIC_STRAIN: &str = "InversePlasticStrain";
    pub const HARDENING_PARAMETER: &str = "HardeningParameter";
}

/// Storage of one registered variable.
#[derive(Clone, Debug)]
pub enum VariableData {
    Real(Vec<Real>),
    Int(Vec<i32>),
    Vector(Vec<Vecd>),
    Matrix(Vec<Matd>),
}

/// Element types that can back a particle variable.
pub trait VariableType: Copy + Send + Sync + 'static {
    const TYPE_NAME: &'static str;

    fn wrap(values: Vec<Self>) -> VariableData;
    fn slice(data: &VariableData) -> Option<&[Self]>;
    fn slice_mut(data: &mut VariableData) -> Option<&mut [Self]>;
}

macro_rules! impl_variable_type {
    ($ty:ty, $variant:ident, $name:literal) => {
        impl VariableType for $ty {
            const TYPE_NAME: &'static str = $name;

            fn wrap(values: Vec<Self>) -> VariableData {
                VariableData::$variant(values)
            }

            fn slice(data: &VariableData) -> Option<&[Self]> {
                match data {
                    VariableData::$variant(values) => Some(values),
                    _ => None,
                }
            }

            fn slice_mut(data: &mut VariableData) -> Option<&mut [Self]> {
                match data {
                    VariableData::$variant(values) => Some(values),
                    _ => None,
                }
            }
        }
    };
}

impl_variable_type!(Real, Real, "Real");
impl_variable_type!(i32, Int, "Int");
impl_variable_type!(Vecd, Vector, "Vecd");
impl_variable_type!(Matd, Matrix, "Matd");

/// Particles of one body.
#[derive(Clone, Debug)]
pub struct BaseParticles {
    total_real_particles: usize,
    kernel: Kernel,
    dimension: Dimension,
    variables: HashMap<String, VariableData>,
}

impl BaseParticles {
    /// Creates a body from particle positions and volumes.
    ///
    /// Registers `Position` and `Volume`.
    pub fn new(
        kernel: Kernel,
        dimension: Dimension,
        positions: Vec<Vecd>,
        volumes: Vec<Real>,
    ) -> SphResult<Self> {
        if positions.len() != volumes.len() {
            return Err(SphError::Configuration(format!(
                "{} positions but {} volumes",
                positions.len(),
                volumes.len()
            )));
        }
        if let Some(bad) = volumes.iter().position(|v| !(v.is_finite() && *v > 0.0)) {
            return Err(SphError::Configuration(format!(
                "particle {bad} has non-positive volume {}",
                volumes[bad]
            )));
        }

        let total_real_particles = positions.len();
        let mut variables = HashMap::new();
        variables.insert(names::POSITION.to_string(), VariableData::Vector(positions));
        variables.insert(names::VOLUME.to_string(), VariableData::Real(volumes));
        debug!("created body with {total_real_particles} particles ({dimension:?})");

        Ok(Self {
            total_real_particles,
            kernel,
            dimension,
            variables,
        })
    }

    /// Creates a body where every particle carries the same volume.
    pub fn with_uniform_volume(
        kernel: Kernel,
        dimension: Dimension,
        positions: Vec<Vecd>,
        volume: Real,
    ) -> SphResult<Self> {
        let volumes = vec![volume; positions.len()];
        Self::new(kernel, dimension, positions, volumes)
    }

    #[inline]
    pub fn total_real_particles(&self) -> usize {
        self.total_real_particles
    }

    #[inline]
    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    #[inline]
    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    /// Registers `name` filled with `initial`. An existing variable of the
    /// same type is left untouched, so re-registration keeps its values.
    pub fn register_variable<T: VariableType>(&mut self, name: &str, initial: T) -> SphResult<()> {
        if let Some(existing) = self.variables.get(name) {
            return match T::slice(existing) {
                Some(_) => Ok(()),
                None => Err(SphError::VariableTypeMismatch {
                    name: name.to_string(),
                    expected: T::TYPE_NAME,
                }),
            };
        }
        self.variables.insert(
            name.to_string(),
            T::wrap(vec![initial; self.total_real_particles]),
        );
        Ok(())
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn variable<T: VariableType>(&self, name: &str) -> SphResult<&[T]> {
        let data = self
            .variables
            .get(name)
            .ok_or_else(|| SphError::UnknownVariable(name.to_string()))?;
        T::slice(data).ok_or_else(|| SphError::VariableTypeMismatch {
            name: name.to_string(),
            expected: T::TYPE_NAME,
        })
    }

    pub fn variable_mut<T: VariableType>(&mut self, name: &str) -> SphResult<&mut [T]> {
        let data = self
            .variables
            .get_mut(name)
            .ok_or_else(|| SphError::UnknownVariable(name.to_string()))?;
        T::slice_mut(data).ok_or_else(|| SphError::VariableTypeMismatch {
            name: name.to_string(),
            expected: T::TYPE_NAME,
        })
    }

    /// Overwrites `name` with one value per particle.
    pub fn assign_variable<T: VariableType>(&mut self, name: &str, values: &[T]) -> SphResult<()> {
        if values.len() != self.total_real_particles {
            return Err(SphError::Configuration(format!(
                "variable {name} expects {} values, got {}",
                self.total_real_particles,
                values.len()
            )));
        }
        self.variable_mut::<T>(name)?.copy_from_slice(values);
        Ok(())
    }

    /// Writes one committed value per particle, as produced by a phase.
    pub(crate) fn scatter<T: VariableType, U>(
        &mut self,
        name: &str,
        values: &[U],
        pick: impl Fn(&U) -> T,
    ) -> SphResult<()> {
        let field = self.variable_mut::<T>(name)?;
        for (slot, value) in field.iter_mut().zip(values) {
            *slot = pick(value);
        }
        Ok(())
    }
}
