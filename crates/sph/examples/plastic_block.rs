//! Plastic Block - two halves of a block driven into each other
//!
//! Steps a 2D J2-plastic block with the two-half stress relaxation scheme
//! and prints the plastic strain and kinetic energy as the impact spreads.
//!
//! Run with: cargo run --example plastic_block --release [-- config.json]
//! Set RUST_LOG=debug to see relation rebuilds.

use std::path::Path;

use log::info;
use sph::{
    names, AcousticTimeStepSize, BaseParticles, CellLinkedList, Dynamics1Level, ElasticSolid,
    InnerRelation, PlasticStressRelaxationFirstHalf, Real, ReduceDynamics, SphConfig, SphResult,
    StressRelaxationSecondHalf, Vecd,
};

const NX: usize = 40;
const NY: usize = 20;
const IMPACT_SPEED: Real = 2.0;
const END_TIME: Real = 0.02;
const OUTPUT_INTERVAL: Real = 0.002;

fn main() -> SphResult<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => SphConfig::load_json(Path::new(&path))?,
        None => SphConfig {
            particle_spacing: 0.005,
            ..SphConfig::default()
        },
    };
    config.validate()?;

    let dp = config.particle_spacing;
    let positions: Vec<Vecd> = (0..NX)
        .flat_map(|i| {
            (0..NY).map(move |j| Vecd::new((i as Real + 0.5) * dp, (j as Real + 0.5) * dp, 0.0))
        })
        .collect();
    let mut block = BaseParticles::with_uniform_volume(
        config.kernel()?,
        config.dimension,
        positions,
        config.particle_volume(),
    )?;

    // Total Lagrangian: one relation in the reference configuration.
    let lists = CellLinkedList::new(&block)?.inner_lists();
    let mut inner = InnerRelation::new(&block);
    inner.update_configuration(&block, &lists)?;

    let material = config.material.plastic_solid()?;
    let first_half = Dynamics1Level::new(PlasticStressRelaxationFirstHalf::new(
        &mut block, &inner, &material,
    )?);
    let second_half =
        Dynamics1Level::new(StressRelaxationSecondHalf::new(&mut block, &inner, &material)?);
    let time_step = ReduceDynamics::new(
        AcousticTimeStepSize::new(&mut block, &material)?.with_cfl(config.cfl_factor),
    );

    let velocities: Vec<Vecd> = (0..NX * NY)
        .map(|k| {
            let sign = if k / NY < NX / 2 { 1.0 } else { -1.0 };
            Vecd::new(sign * IMPACT_SPEED, 0.0, 0.0)
        })
        .collect();
    block.assign_variable(names::VELOCITY, &velocities)?;

    info!(
        "{} particles, c0 = {:.2} m/s, yield stress = {}",
        block.total_real_particles(),
        material.sound_speed(),
        material.yield_stress()
    );

    println!(
        "{:>10} {:>8} {:>14} {:>14} {:>12}",
        "time", "steps", "kinetic", "max alpha", "yielded"
    );
    let mut time = 0.0;
    let mut steps = 0usize;
    let mut next_output = 0.0;
    while time < END_TIME {
        let dt = time_step.parallel_exec(&block)?;
        first_half.parallel_exec(&mut block, dt)?;
        second_half.parallel_exec(&mut block, dt)?;
        time += dt;
        steps += 1;

        if time >= next_output {
            report(&block, time, steps, config.material.density * config.particle_volume())?;
            next_output += OUTPUT_INTERVAL;
        }
    }
    Ok(())
}

fn report(block: &BaseParticles, time: Real, steps: usize, mass: Real) -> SphResult<()> {
    let vel = block.variable::<Vecd>(names::VELOCITY)?;
    let alpha = block.variable::<Real>(names::HARDENING_PARAMETER)?;
    let kinetic: Real = vel.iter().map(|v| 0.5 * mass * v.length_squared()).sum();
    let max_alpha = alpha.iter().copied().fold(0.0, Real::max);
    let yielded = alpha.iter().filter(|a| **a > 0.0).count();
    println!("{time:>10.5} {steps:>8} {kinetic:>14.6e} {max_alpha:>14.6e} {yielded:>12}");
    Ok(())
}
