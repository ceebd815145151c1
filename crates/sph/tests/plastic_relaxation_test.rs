//! Plastic stress relaxation: return mapping and a stepped block.

use proptest::prelude::*;
use sph::math::{deviatoric, frobenius_norm, trace, SQRT_2_OVER_3};
use sph::{
    names, radial_return, AcousticTimeStepSize, BaseParticles, CellLinkedList, Dimension,
    Dynamics1Level, HardeningPlasticSolid, InnerRelation, Kernel, LinearElasticSolid, Matd,
    PlasticStressRelaxationFirstHalf, Real, ReduceDynamics, SimpleDynamics, SphError,
    StressRelaxationSecondHalf, Update, Vecd,
};

fn symmetric_matrix() -> impl Strategy<Value = Matd> {
    prop::array::uniform6(-100.0..100.0f64).prop_map(|[a, b, c, d, e, f]| {
        Matd::from_cols(Vecd::new(a, d, e), Vecd::new(d, b, f), Vecd::new(e, f, c))
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn test_return_mapping_identity_inside(trial in symmetric_matrix(), margin in 1.01..10.0f64) {
        let limit = frobenius_norm(&deviatoric(&trial)) / SQRT_2_OVER_3 * margin;
        prop_assert_eq!(radial_return(&trial, limit), trial);
    }

    #[test]
    fn test_return_mapping_projects_outside(
        trial in symmetric_matrix(),
        fraction in 0.01..0.99f64,
    ) {
        let dev_norm = frobenius_norm(&deviatoric(&trial));
        prop_assume!(dev_norm > 1e-6);
        let limit = dev_norm / SQRT_2_OVER_3 * fraction;
        let returned = radial_return(&trial, limit);

        let dev = deviatoric(&returned);
        let tolerance = 1e-9 * dev_norm.max(1.0);
        prop_assert!((frobenius_norm(&dev) - SQRT_2_OVER_3 * limit).abs() < tolerance);
        prop_assert!((trace(&returned) - trace(&trial)).abs() < tolerance);
        let expected = deviatoric(&trial) * fraction;
        prop_assert!(frobenius_norm(&(dev - expected)) < tolerance);
    }
}

const DP: Real = 0.01;
const NX: usize = 8;
const NY: usize = 8;

struct Block {
    particles: BaseParticles,
    inner: InnerRelation,
}

fn block() -> Block {
    let kernel = Kernel::new(1.3 * DP).unwrap();
    let positions = (0..NX)
        .flat_map(|i| {
            (0..NY).map(move |j| Vecd::new((i as Real + 0.5) * DP, (j as Real + 0.5) * DP, 0.0))
        })
        .collect();
    let particles =
        BaseParticles::with_uniform_volume(kernel, Dimension::Two, positions, DP * DP).unwrap();
    let lists = CellLinkedList::new(&particles).unwrap().inner_lists();
    let mut inner = InnerRelation::new(&particles);
    inner.update_configuration(&particles, &lists).unwrap();
    Block { particles, inner }
}

/// Sets a constant body force per unit mass.
struct Gravity(Vecd);

impl Update for Gravity {
    type Updated = Vecd;

    fn update(
        &self,
        _particles: &BaseParticles,
        _index_i: usize,
        _dt: Real,
    ) -> sph::SphResult<Vecd> {
        Ok(self.0)
    }

    fn commit_update(
        &self,
        particles: &mut BaseParticles,
        values: Vec<Vecd>,
    ) -> sph::SphResult<()> {
        particles.assign_variable(names::PRIOR_ACCELERATION, &values)
    }
}

fn total_momentum(particles: &BaseParticles) -> Vecd {
    particles.variable::<Vecd>(names::VELOCITY).unwrap().iter().copied().sum::<Vecd>() * (DP * DP)
}

#[test]
fn test_impacted_block_conserves_momentum_and_yields() {
    let Block { mut particles, inner } = block();
    let elastic = LinearElasticSolid::new(1000.0, 1.0e5, 0.45).unwrap();
    let material = HardeningPlasticSolid::new(elastic, 200.0, 1000.0).unwrap();

    let first = Dynamics1Level::new(
        PlasticStressRelaxationFirstHalf::new(&mut particles, &inner, &material).unwrap(),
    );
    let second = Dynamics1Level::new(
        StressRelaxationSecondHalf::new(&mut particles, &inner, &material).unwrap(),
    );
    let time_step =
        ReduceDynamics::new(AcousticTimeStepSize::new(&mut particles, &material).unwrap());

    // Left half moves right, right half moves left: zero net momentum.
    let velocities: Vec<Vecd> = (0..NX * NY)
        .map(|k| if k / NY < NX / 2 { Vecd::new(1.0, 0.0, 0.0) } else { Vecd::new(-1.0, 0.0, 0.0) })
        .collect();
    particles.assign_variable(names::VELOCITY, &velocities).unwrap();

    let mut time = 0.0;
    for _ in 0..20 {
        let dt = time_step.parallel_exec(&particles).unwrap();
        assert!(dt > 0.0 && dt.is_finite());
        first.parallel_exec(&mut particles, dt).unwrap();
        second.parallel_exec(&mut particles, dt).unwrap();
        time += dt;
    }
    assert!(time > 0.0);

    // Pairwise forces are antisymmetric.
    assert!(total_momentum(&particles).length() < 1e-10, "{:?}", total_momentum(&particles));

    let alpha = particles.variable::<Real>(names::HARDENING_PARAMETER).unwrap();
    assert!(alpha.iter().all(|a| *a >= 0.0 && a.is_finite()));
    assert!(alpha.iter().any(|a| *a > 0.0), "impact never reached the yield surface");
    assert!(particles.variable::<Real>(names::DENSITY).unwrap().iter().all(|rho| *rho > 0.0));
}

#[test]
fn test_body_force_accelerates_uniformly() {
    let Block { mut particles, inner } = block();
    let material = LinearElasticSolid::new(1000.0, 1.0e5, 0.45).unwrap();
    let plastic = HardeningPlasticSolid::new(material, 1.0e6, 0.0).unwrap();

    let gravity = SimpleDynamics::new(Gravity(Vecd::new(0.0, -9.81, 0.0)));
    let first = Dynamics1Level::new(
        PlasticStressRelaxationFirstHalf::new(&mut particles, &inner, &plastic).unwrap(),
    );
    let second = Dynamics1Level::new(
        StressRelaxationSecondHalf::new(&mut particles, &inner, &plastic).unwrap(),
    );
    gravity.exec(&mut particles, 0.0).unwrap();

    let dt = 1e-4;
    for _ in 0..10 {
        first.exec(&mut particles, dt).unwrap();
        second.exec(&mut particles, dt).unwrap();
    }
    // A free body under a uniform field falls without deforming.
    for v in particles.variable::<Vecd>(names::VELOCITY).unwrap() {
        assert!((v.y + 9.81 * 10.0 * dt).abs() < 1e-9, "{v:?}");
    }
    for f in particles.variable::<Matd>(names::DEFORMATION).unwrap() {
        assert!(frobenius_norm(&(*f - Matd::IDENTITY)) < 1e-9);
    }
}

#[test]
fn test_collapsed_particle_reports_singularity() {
    let Block { mut particles, inner } = block();
    let elastic = LinearElasticSolid::new(1000.0, 1.0e5, 0.3).unwrap();
    let material = HardeningPlasticSolid::new(elastic, 100.0, 0.0).unwrap();
    let first = Dynamics1Level::new(
        PlasticStressRelaxationFirstHalf::new(&mut particles, &inner, &material).unwrap(),
    );

    let flattened = Matd::from_cols(Vecd::X, Vecd::X, Vecd::Z);
    particles.variable_mut::<Matd>(names::DEFORMATION).unwrap()[10] = flattened;
    let alpha_before = particles.variable::<Real>(names::HARDENING_PARAMETER).unwrap().to_vec();

    let result = first.parallel_exec(&mut particles, 1e-5);
    assert!(matches!(result, Err(SphError::ConstitutiveSingularity { index: 10, .. })));
    // The failed step committed nothing.
    assert_eq!(
        particles.variable::<Real>(names::HARDENING_PARAMETER).unwrap(),
        alpha_before.as_slice()
    );
}
