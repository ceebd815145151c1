//! Total Lagrangian stress relaxation for weakly compressible solids.
//!
//! One time step is split into two halves, each run as a three-phase
//! [`Dynamics1Level`](crate::dynamics::Dynamics1Level):
//!
//! ```text
//! first half:  pos += v dt/2, F += dF/dt dt/2, rho, PK1 -> acc -> v += (acc + prior) dt
//! second half: pos += v dt/2                     -> dF/dt -> F += dF/dt dt/2
//! ```
//!
//! Relations stay in the reference configuration, so the inner relation is
//! built once and never rebuilt during the run.

use log::warn;

use crate::dynamics::{Initialization, Interaction, Reduce, Update};
use crate::error::{SphError, SphResult};
use crate::material::{ElasticSolid, PlasticSolid, PlasticState};
use crate::math::{outer, Matd, Real, Vecd, TINY_REAL};
use crate::particles::{names, BaseParticles};
use crate::relation::InnerRelation;

/// Registers the fields shared by both halves.
fn register_solid_variables(particles: &mut BaseParticles, rho0: Real) -> SphResult<()> {
    particles.register_variable::<Vecd>(names::VELOCITY, Vecd::ZERO)?;
    particles.register_variable::<Vecd>(names::ACCELERATION, Vecd::ZERO)?;
    particles.register_variable::<Vecd>(names::PRIOR_ACCELERATION, Vecd::ZERO)?;
    particles.register_variable::<Real>(names::DENSITY, rho0)?;
    particles.register_variable::<Matd>(names::DEFORMATION, Matd::IDENTITY)?;
    particles.register_variable::<Matd>(names::DEFORMATION_RATE, Matd::ZERO)?;
    particles.register_variable::<Matd>(names::CORRECTION_MATRIX, Matd::IDENTITY)?;
    particles.register_variable::<Matd>(names::STRESS_PK1_B, Matd::ZERO)?;
    Ok(())
}

/// Kinematic state of one particle after the first half-step drift.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HalfStepState {
    pub position: Vecd,
    pub deformation: Matd,
    pub density: Real,
    pub stress_pk1_b: Matd,
}

/// First half of the stress relaxation: stress, acceleration, velocity.
pub struct StressRelaxationFirstHalf<'a, M> {
    inner: &'a InnerRelation,
    material: &'a M,
    rho0: Real,
    inv_rho0: Real,
}

impl<'a, M: ElasticSolid> StressRelaxationFirstHalf<'a, M> {
    pub fn new(
        particles: &mut BaseParticles,
        inner: &'a InnerRelation,
        material: &'a M,
    ) -> SphResult<Self> {
        let rho0 = material.reference_density();
        register_solid_variables(particles, rho0)?;
        Ok(Self {
            inner,
            material,
            rho0,
            inv_rho0: 1.0 / rho0,
        })
    }

    pub fn material(&self) -> &M {
        self.material
    }

    /// Drifts position and deformation by half a step and updates density.
    /// The stress is left to the caller.
    fn drift(
        &self,
        particles: &BaseParticles,
        index_i: usize,
        dt: Real,
    ) -> SphResult<HalfStepState> {
        let pos = particles.variable::<Vecd>(names::POSITION)?;
        let vel = particles.variable::<Vecd>(names::VELOCITY)?;
        let f = particles.variable::<Matd>(names::DEFORMATION)?;
        let df_dt = particles.variable::<Matd>(names::DEFORMATION_RATE)?;

        let deformation = f[index_i] + df_dt[index_i] * (dt * 0.5);
        let det = deformation.determinant();
        if !(det.is_finite() && det > TINY_REAL) {
            warn!("particle {index_i}: singular deformation gradient, det = {det}");
            return Err(SphError::ConstitutiveSingularity { index: index_i, det });
        }

        Ok(HalfStepState {
            position: pos[index_i] + vel[index_i] * (dt * 0.5),
            deformation,
            density: self.rho0 / det,
            stress_pk1_b: Matd::ZERO,
        })
    }

    fn commit_half_step(
        &self,
        particles: &mut BaseParticles,
        values: &[HalfStepState],
    ) -> SphResult<()> {
        particles.scatter(names::POSITION, values, |v| v.position)?;
        particles.scatter(names::DEFORMATION, values, |v| v.deformation)?;
        particles.scatter(names::DENSITY, values, |v| v.density)?;
        particles.scatter(names::STRESS_PK1_B, values, |v| v.stress_pk1_b)
    }
}

impl<M: ElasticSolid> Initialization for StressRelaxationFirstHalf<'_, M> {
    type Initialized = HalfStepState;

    fn initialization(
        &self,
        particles: &BaseParticles,
        index_i: usize,
        dt: Real,
    ) -> SphResult<HalfStepState> {
        let mut state = self.drift(particles, index_i, dt)?;
        let b = particles.variable::<Matd>(names::CORRECTION_MATRIX)?[index_i];
        let f = state.deformation;
        state.stress_pk1_b = f * self.material.stress_pk2(&f) * b;
        Ok(state)
    }

    fn commit_initialization(
        &self,
        particles: &mut BaseParticles,
        values: Vec<HalfStepState>,
    ) -> SphResult<()> {
        self.commit_half_step(particles, &values)
    }
}

impl<M: ElasticSolid> Interaction for StressRelaxationFirstHalf<'_, M> {
    type Interacted = Vecd;

    fn interaction(&self, particles: &BaseParticles, index_i: usize, _dt: Real) -> SphResult<Vecd> {
        let stress = particles.variable::<Matd>(names::STRESS_PK1_B)?;
        let stress_i = stress[index_i];
        let acceleration = self
            .inner
            .neighborhood(index_i)
            .iter()
            .fold(Vecd::ZERO, |acc, n| {
                acc + (stress_i + stress[n.index_j]) * n.e_ij * n.dw_ijv_j
            });
        Ok(acceleration * self.inv_rho0)
    }

    fn commit_interaction(
        &self,
        particles: &mut BaseParticles,
        values: Vec<Vecd>,
    ) -> SphResult<()> {
        particles.assign_variable(names::ACCELERATION, &values)
    }
}

impl<M: ElasticSolid> Update for StressRelaxationFirstHalf<'_, M> {
    type Updated = Vecd;

    fn update(&self, particles: &BaseParticles, index_i: usize, dt: Real) -> SphResult<Vecd> {
        let vel = particles.variable::<Vecd>(names::VELOCITY)?;
        let acc = particles.variable::<Vecd>(names::ACCELERATION)?;
        let prior = particles.variable::<Vecd>(names::PRIOR_ACCELERATION)?;
        Ok(vel[index_i] + (acc[index_i] + prior[index_i]) * dt)
    }

    fn commit_update(&self, particles: &mut BaseParticles, values: Vec<Vecd>) -> SphResult<()> {
        particles.assign_variable(names::VELOCITY, &values)
    }
}

/// Second half: position drift and deformation rate.
pub struct StressRelaxationSecondHalf<'a> {
    inner: &'a InnerRelation,
}

impl<'a> StressRelaxationSecondHalf<'a> {
    pub fn new(
        particles: &mut BaseParticles,
        inner: &'a InnerRelation,
        material: &impl ElasticSolid,
    ) -> SphResult<Self> {
        register_solid_variables(particles, material.reference_density())?;
        Ok(Self { inner })
    }
}

impl Initialization for StressRelaxationSecondHalf<'_> {
    type Initialized = Vecd;

    fn initialization(
        &self,
        particles: &BaseParticles,
        index_i: usize,
        dt: Real,
    ) -> SphResult<Vecd> {
        let pos = particles.variable::<Vecd>(names::POSITION)?;
        let vel = particles.variable::<Vecd>(names::VELOCITY)?;
        Ok(pos[index_i] + vel[index_i] * (dt * 0.5))
    }

    fn commit_initialization(
        &self,
        particles: &mut BaseParticles,
        values: Vec<Vecd>,
    ) -> SphResult<()> {
        particles.assign_variable(names::POSITION, &values)
    }
}

impl Interaction for StressRelaxationSecondHalf<'_> {
    type Interacted = Matd;

    fn interaction(&self, particles: &BaseParticles, index_i: usize, _dt: Real) -> SphResult<Matd> {
        let vel = particles.variable::<Vecd>(names::VELOCITY)?;
        let b = particles.variable::<Matd>(names::CORRECTION_MATRIX)?;
        let vel_i = vel[index_i];
        let rate = self
            .inner
            .neighborhood(index_i)
            .iter()
            .fold(Matd::ZERO, |rate, n| {
                rate - outer(vel_i - vel[n.index_j], n.e_ij * n.dw_ijv_j)
            });
        Ok(rate * b[index_i])
    }

    fn commit_interaction(
        &self,
        particles: &mut BaseParticles,
        values: Vec<Matd>,
    ) -> SphResult<()> {
        particles.assign_variable(names::DEFORMATION_RATE, &values)
    }
}

impl Update for StressRelaxationSecondHalf<'_> {
    type Updated = Matd;

    fn update(&self, particles: &BaseParticles, index_i: usize, dt: Real) -> SphResult<Matd> {
        let f = particles.variable::<Matd>(names::DEFORMATION)?;
        let df_dt = particles.variable::<Matd>(names::DEFORMATION_RATE)?;
        Ok(f[index_i] + df_dt[index_i] * (dt * 0.5))
    }

    fn commit_update(&self, particles: &mut BaseParticles, values: Vec<Matd>) -> SphResult<()> {
        particles.assign_variable(names::DEFORMATION, &values)
    }
}

/// First half with a plastic return mapping in place of the elastic stress.
///
/// The per-particle plastic history lives in `InversePlasticStrain` and
/// `HardeningParameter`; it only advances when a step is committed.
pub struct PlasticStressRelaxationFirstHalf<'a, M> {
    base: StressRelaxationFirstHalf<'a, M>,
}

impl<'a, M: PlasticSolid> PlasticStressRelaxationFirstHalf<'a, M> {
    pub fn new(
        particles: &mut BaseParticles,
        inner: &'a InnerRelation,
        material: &'a M,
    ) -> SphResult<Self> {
        let base = StressRelaxationFirstHalf::new(particles, inner, material)?;
        let initial = PlasticState::default();
        particles.register_variable::<Matd>(
            names::INVERSE_PLASTIC_STRAIN,
            initial.inverse_plastic_strain,
        )?;
        particles
            .register_variable::<Real>(names::HARDENING_PARAMETER, initial.hardening_parameter)?;
        Ok(Self { base })
    }

    pub fn base(&self) -> &StressRelaxationFirstHalf<'a, M> {
        &self.base
    }
}

impl<M: PlasticSolid> Initialization for PlasticStressRelaxationFirstHalf<'_, M> {
    type Initialized = (HalfStepState, PlasticState);

    fn initialization(
        &self,
        particles: &BaseParticles,
        index_i: usize,
        dt: Real,
    ) -> SphResult<(HalfStepState, PlasticState)> {
        let mut state = self.base.drift(particles, index_i, dt)?;
        let b = particles.variable::<Matd>(names::CORRECTION_MATRIX)?[index_i];
        let history = PlasticState {
            inverse_plastic_strain: particles
                .variable::<Matd>(names::INVERSE_PLASTIC_STRAIN)?[index_i],
            hardening_parameter: particles.variable::<Real>(names::HARDENING_PARAMETER)?[index_i],
        };

        let f = state.deformation;
        let response = self.base.material.plastic_stress_pk2(&f, &history);
        state.stress_pk1_b = f * response.stress_pk2 * b;
        Ok((state, response.state))
    }

    fn commit_initialization(
        &self,
        particles: &mut BaseParticles,
        values: Vec<(HalfStepState, PlasticState)>,
    ) -> SphResult<()> {
        particles.scatter(names::INVERSE_PLASTIC_STRAIN, &values, |(_, p)| {
            p.inverse_plastic_strain
        })?;
        particles.scatter(names::HARDENING_PARAMETER, &values, |(_, p)| p.hardening_parameter)?;
        let kinematics: Vec<HalfStepState> = values.into_iter().map(|(k, _)| k).collect();
        self.base.commit_half_step(particles, &kinematics)
    }
}

impl<M: PlasticSolid> Interaction for PlasticStressRelaxationFirstHalf<'_, M> {
    type Interacted = Vecd;

    fn interaction(&self, particles: &BaseParticles, index_i: usize, dt: Real) -> SphResult<Vecd> {
        self.base.interaction(particles, index_i, dt)
    }

    fn commit_interaction(
        &self,
        particles: &mut BaseParticles,
        values: Vec<Vecd>,
    ) -> SphResult<()> {
        self.base.commit_interaction(particles, values)
    }
}

impl<M: PlasticSolid> Update for PlasticStressRelaxationFirstHalf<'_, M> {
    type Updated = Vecd;

    fn update(&self, particles: &BaseParticles, index_i: usize, dt: Real) -> SphResult<Vecd> {
        self.base.update(particles, index_i, dt)
    }

    fn commit_update(&self, particles: &mut BaseParticles, values: Vec<Vecd>) -> SphResult<()> {
        self.base.commit_update(particles, values)
    }
}

pub const DEFAULT_ACOUSTIC_CFL: Real = 0.6;

/// Global time-step bound from sound speed, velocity and acceleration.
pub struct AcousticTimeStepSize {
    smoothing_length: Real,
    c0: Real,
    cfl: Real,
}

impl AcousticTimeStepSize {
    pub fn new(particles: &mut BaseParticles, material: &impl ElasticSolid) -> SphResult<Self> {
        register_solid_variables(particles, material.reference_density())?;
        Ok(Self {
            smoothing_length: particles.kernel().smoothing_length(),
            c0: material.sound_speed(),
            cfl: DEFAULT_ACOUSTIC_CFL,
        })
    }

    pub fn with_cfl(mut self, cfl: Real) -> Self {
        self.cfl = cfl;
        self
    }
}

impl Reduce for AcousticTimeStepSize {
    fn reduce(&self, particles: &BaseParticles, index_i: usize) -> SphResult<Real> {
        let vel = particles.variable::<Vecd>(names::VELOCITY)?[index_i];
        let acc = particles.variable::<Vecd>(names::ACCELERATION)?[index_i];
        let prior = particles.variable::<Vecd>(names::PRIOR_ACCELERATION)?[index_i];
        let h = self.smoothing_length;
        let acoustic = h / (self.c0 + vel.length());
        let body_force = (h / ((acc + prior).length() + TINY_REAL)).sqrt();
        Ok(acoustic.min(body_force))
    }

    fn reference(&self) -> Real {
        Real::MAX
    }

    fn combine(&self, a: Real, b: Real) -> Real {
        a.min(b)
    }

    fn output(&self, reduced: Real) -> Real {
        self.cfl * reduced
    }
}
