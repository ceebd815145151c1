//! The initialization / interaction / update execution pattern.
//!
//! Every particle law implements one or more of the phase traits. A phase
//! computes one value per particle from shared, committed state and the
//! executor commits the whole batch afterwards, so no particle can observe
//! a value written by another particle in the same phase. Each phase is a
//! full barrier:
//!
//! ```text
//! initialization(all) -> commit -> interaction(all) -> commit -> update(all) -> commit
//! ```
//!
//! Variants compose: a variant owns its base law and calls the base phases
//! before or after its own logic.

use log::trace;
use rayon::prelude::*;

use crate::error::SphResult;
use crate::math::Real;
use crate::particles::BaseParticles;

/// Prepares per-particle state before the interaction phase.
pub trait Initialization: Sync {
    type Initialized: Send;

    fn initialization(
        &self,
        particles: &BaseParticles,
        index_i: usize,
        dt: Real,
    ) -> SphResult<Self::Initialized>;

    fn commit_initialization(
        &self,
        particles: &mut BaseParticles,
        values: Vec<Self::Initialized>,
    ) -> SphResult<()>;
}

/// Accumulates a per-particle quantity over neighbors.
pub trait Interaction: Sync {
    type Interacted: Send;

    fn interaction(
        &self,
        particles: &BaseParticles,
        index_i: usize,
        dt: Real,
    ) -> SphResult<Self::Interacted>;

    fn commit_interaction(
        &self,
        particles: &mut BaseParticles,
        values: Vec<Self::Interacted>,
    ) -> SphResult<()>;
}

/// Finalizes the per-particle state after the interaction phase.
pub trait Update: Sync {
    type Updated: Send;

    fn update(
        &self,
        particles: &BaseParticles,
        index_i: usize,
        dt: Real,
    ) -> SphResult<Self::Updated>;

    fn commit_update(
        &self,
        particles: &mut BaseParticles,
        values: Vec<Self::Updated>,
    ) -> SphResult<()>;
}

/// Whether a phase runs on the calling thread or the rayon pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Execution {
    Sequential,
    Parallel,
}

/// Runs `compute` for every particle; the first error aborts the phase.
pub fn for_each_particle<T, F>(count: usize, execution: Execution, compute: F) -> SphResult<Vec<T>>
where
    T: Send,
    F: Fn(usize) -> SphResult<T> + Sync + Send,
{
    match execution {
        Execution::Sequential => (0..count).map(compute).collect(),
        Execution::Parallel => (0..count).into_par_iter().map(compute).collect(),
    }
}

fn run_initialization<D: Initialization>(
    dynamics: &D,
    particles: &mut BaseParticles,
    dt: Real,
    execution: Execution,
) -> SphResult<()> {
    let shared: &BaseParticles = particles;
    let values = for_each_particle(shared.total_real_particles(), execution, |i| {
        dynamics.initialization(shared, i, dt)
    })?;
    dynamics.commit_initialization(particles, values)
}

fn run_interaction<D: Interaction>(
    dynamics: &D,
    particles: &mut BaseParticles,
    dt: Real,
    execution: Execution,
) -> SphResult<()> {
    let shared: &BaseParticles = particles;
    let values = for_each_particle(shared.total_real_particles(), execution, |i| {
        dynamics.interaction(shared, i, dt)
    })?;
    dynamics.commit_interaction(particles, values)
}

fn run_update<D: Update>(
    dynamics: &D,
    particles: &mut BaseParticles,
    dt: Real,
    execution: Execution,
) -> SphResult<()> {
    let shared: &BaseParticles = particles;
    let values = for_each_particle(shared.total_real_particles(), execution, |i| {
        dynamics.update(shared, i, dt)
    })?;
    dynamics.commit_update(particles, values)
}

/// Update-only law.
pub struct SimpleDynamics<D> {
    dynamics: D,
}

impl<D: Update> SimpleDynamics<D> {
    pub fn new(dynamics: D) -> Self {
        Self { dynamics }
    }

    pub fn dynamics(&self) -> &D {
        &self.dynamics
    }

    pub fn exec(&self, particles: &mut BaseParticles, dt: Real) -> SphResult<()> {
        self.run(particles, dt, Execution::Sequential)
    }

    pub fn parallel_exec(&self, particles: &mut BaseParticles, dt: Real) -> SphResult<()> {
        self.run(particles, dt, Execution::Parallel)
    }

    fn run(&self, particles: &mut BaseParticles, dt: Real, execution: Execution) -> SphResult<()> {
        trace!("simple dynamics step, dt = {dt}");
        run_update(&self.dynamics, particles, dt, execution)
    }
}

/// Interaction followed by update.
pub struct InteractionWithUpdate<D> {
    dynamics: D,
}

impl<D: Interaction + Update> InteractionWithUpdate<D> {
    pub fn new(dynamics: D) -> Self {
        Self { dynamics }
    }

    pub fn dynamics(&self) -> &D {
        &self.dynamics
    }

    pub fn exec(&self, particles: &mut BaseParticles, dt: Real) -> SphResult<()> {
        self.run(particles, dt, Execution::Sequential)
    }

    pub fn parallel_exec(&self, particles: &mut BaseParticles, dt: Real) -> SphResult<()> {
        self.run(particles, dt, Execution::Parallel)
    }

    fn run(&self, particles: &mut BaseParticles, dt: Real, execution: Execution) -> SphResult<()> {
        trace!("interaction with update, dt = {dt}");
        run_interaction(&self.dynamics, particles, dt, execution)?;
        run_update(&self.dynamics, particles, dt, execution)
    }
}

/// Initialization, interaction and update.
pub struct Dynamics1Level<D> {
    dynamics: D,
}

impl<D: Initialization + Interaction + Update> Dynamics1Level<D> {
    pub fn new(dynamics: D) -> Self {
        Self { dynamics }
    }

    pub fn dynamics(&self) -> &D {
        &self.dynamics
    }

    pub fn exec(&self, particles: &mut BaseParticles, dt: Real) -> SphResult<()> {
        self.run(particles, dt, Execution::Sequential)
    }

    pub fn parallel_exec(&self, particles: &mut BaseParticles, dt: Real) -> SphResult<()> {
        self.run(particles, dt, Execution::Parallel)
    }

    fn run(&self, particles: &mut BaseParticles, dt: Real, execution: Execution) -> SphResult<()> {
        trace!("three-phase dynamics, dt = {dt}");
        run_initialization(&self.dynamics, particles, dt, execution)?;
        run_interaction(&self.dynamics, particles, dt, execution)?;
        run_update(&self.dynamics, particles, dt, execution)
    }
}

/// Reduction over all particles, e.g. a global time-step bound.
pub trait Reduce: Sync {
    fn reduce(&self, particles: &BaseParticles, index_i: usize) -> SphResult<Real>;

    /// Identity element of `combine`.
    fn reference(&self) -> Real;

    fn combine(&self, a: Real, b: Real) -> Real;

    /// Final transform of the reduced value.
    fn output(&self, reduced: Real) -> Real {
        reduced
    }
}

pub struct ReduceDynamics<D> {
    dynamics: D,
}

impl<D: Reduce> ReduceDynamics<D> {
    pub fn new(dynamics: D) -> Self {
        Self { dynamics }
    }

    pub fn dynamics(&self) -> &D {
        &self.dynamics
    }

    pub fn exec(&self, particles: &BaseParticles) -> SphResult<Real> {
        let d = &self.dynamics;
        let reduced = (0..particles.total_real_particles()).try_fold(d.reference(), |acc, i| {
            d.reduce(particles, i).map(|value| d.combine(acc, value))
        })?;
        Ok(d.output(reduced))
    }

    pub fn parallel_exec(&self, particles: &BaseParticles) -> SphResult<Real> {
        let d = &self.dynamics;
        let reduced = (0..particles.total_real_particles())
            .into_par_iter()
            .map(|i| d.reduce(particles, i))
            .try_reduce(|| d.reference(), |a, b| Ok(d.combine(a, b)))?;
        Ok(d.output(reduced))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SphError;
    use crate::kernel::{Dimension, Kernel};
    use crate::math::Vecd;

    const SUM: &str = "NeighborSum";

    /// Sums the previous values of the two adjacent particles on a ring.
    struct RingSum;

    impl Interaction for RingSum {
        type Interacted = Real;

        fn interaction(&self, p: &BaseParticles, i: usize, _dt: Real) -> SphResult<Real> {
            let n = p.total_real_particles();
            let values = p.variable::<Real>(SUM)?;
            Ok(values[(i + n - 1) % n] + values[(i + 1) % n])
        }

        fn commit_interaction(&self, p: &mut BaseParticles, values: Vec<Real>) -> SphResult<()> {
            p.assign_variable(SUM, &values)
        }
    }

    impl Update for RingSum {
        type Updated = ();

        fn update(&self, p: &BaseParticles, i: usize, _dt: Real) -> SphResult<()> {
            if p.variable::<Real>(SUM)?[i].is_nan() {
                return Err(SphError::ConstitutiveSingularity { index: i, det: 0.0 });
            }
            Ok(())
        }

        fn commit_update(&self, _p: &mut BaseParticles, _values: Vec<()>) -> SphResult<()> {
            Ok(())
        }
    }

    fn ring(n: usize) -> BaseParticles {
        let kernel = Kernel::new(1.0).unwrap();
        let positions = (0..n).map(|i| Vecd::new(i as Real, 0.0, 0.0)).collect();
        let mut p =
            BaseParticles::with_uniform_volume(kernel, Dimension::One, positions, 1.0).unwrap();
        p.register_variable::<Real>(SUM, 0.0).unwrap();
        let init: Vec<Real> = (0..n).map(|i| i as Real).collect();
        p.assign_variable(SUM, &init).unwrap();
        p
    }

    #[test]
    fn test_interaction_reads_only_committed_state() {
        let mut sequential = ring(5);
        let mut parallel = ring(5);
        let dynamics = InteractionWithUpdate::new(RingSum);
        dynamics.exec(&mut sequential, 0.0).unwrap();
        dynamics.parallel_exec(&mut parallel, 0.0).unwrap();

        // In-place writes would have leaked the new value of particle 0 into particle 1.
        let expected = [5.0, 2.0, 4.0, 6.0, 3.0];
        assert_eq!(sequential.variable::<Real>(SUM).unwrap(), &expected);
        assert_eq!(parallel.variable::<Real>(SUM).unwrap(), &expected);
    }

    struct MaxValue;

    impl Reduce for MaxValue {
        fn reduce(&self, p: &BaseParticles, i: usize) -> SphResult<Real> {
            Ok(p.variable::<Real>(SUM)?[i])
        }

        fn reference(&self) -> Real {
            Real::MIN
        }

        fn combine(&self, a: Real, b: Real) -> Real {
            a.max(b)
        }

        fn output(&self, reduced: Real) -> Real {
            2.0 * reduced
        }
    }

    #[test]
    fn test_reduce_sequential_matches_parallel() {
        let p = ring(100);
        let reduce = ReduceDynamics::new(MaxValue);
        assert_eq!(reduce.exec(&p).unwrap(), 198.0);
        assert_eq!(reduce.parallel_exec(&p).unwrap(), 198.0);
    }

    #[test]
    fn test_error_aborts_step() {
        let mut p = ring(3);
        p.variable_mut::<Real>(SUM).unwrap()[0] = Real::NAN;
        let dynamics = InteractionWithUpdate::new(RingSum);
        assert!(dynamics.parallel_exec(&mut p, 0.0).is_err());
    }
}
