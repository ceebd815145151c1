//! Surface Detection - free-surface indication on a block with a cavity
//!
//! Builds a 2D block with a circular void, runs the spatial-temporal
//! free-surface indication and prints the indicator as an ASCII map
//! ('#' free surface, '.' interior). A wall body closes the bottom face
//! through a contact relation.
//!
//! Run with: cargo run --example surface_detection

use log::info;
use sph::surface_indication::FREE_SURFACE;
use sph::{
    names, BaseParticles, CellLinkedList, ContactRelation, FreeSurfaceIndication, InnerRelation,
    InteractionWithUpdate, Real, SpatialTemporalFreeSurfaceIndication, SphConfig, SphResult, Vecd,
};

const NX: usize = 40;
const NY: usize = 24;
const WALL_LAYERS: usize = 3;

fn main() -> SphResult<()> {
    env_logger::init();

    let config = SphConfig {
        particle_spacing: 0.01,
        ..SphConfig::default()
    };
    config.validate()?;
    let dp = config.particle_spacing;
    let kernel = config.kernel()?;

    let center = Vecd::new(NX as Real * dp * 0.5, NY as Real * dp * 0.5, 0.0);
    let radius = 0.25 * NY as Real * dp;
    let cells: Vec<(usize, usize)> = (0..NY)
        .flat_map(|j| (0..NX).map(move |i| (i, j)))
        .filter(|&(i, j)| {
            let p = Vecd::new((i as Real + 0.5) * dp, (j as Real + 0.5) * dp, 0.0);
            (p - center).length() > radius
        })
        .collect();
    let positions = cells
        .iter()
        .map(|&(i, j)| Vecd::new((i as Real + 0.5) * dp, (j as Real + 0.5) * dp, 0.0))
        .collect();
    let mut water = BaseParticles::with_uniform_volume(
        kernel,
        config.dimension,
        positions,
        config.particle_volume(),
    )?;

    let wall_positions = (0..WALL_LAYERS)
        .flat_map(|layer| {
            (0..NX).map(move |i| {
                Vecd::new((i as Real + 0.5) * dp, -(layer as Real + 0.5) * dp, 0.0)
            })
        })
        .collect();
    let wall = BaseParticles::with_uniform_volume(
        kernel,
        config.dimension,
        wall_positions,
        config.particle_volume(),
    )?;

    let mut inner = InnerRelation::new(&water);
    inner.update_configuration(&water, &CellLinkedList::new(&water)?.inner_lists())?;
    let water_positions = water.variable::<Vecd>(names::POSITION)?.to_vec();
    let mut contact = ContactRelation::new(&water, "wall");
    let wall_lists = CellLinkedList::new(&wall)?.contact_lists(&water_positions);
    contact.update_configuration(&wall, &wall_lists)?;

    let base = FreeSurfaceIndication::new(&mut water, &inner)?
        .with_contacts([&contact])
        .with_threshold(config.surface_threshold());
    let indication =
        InteractionWithUpdate::new(SpatialTemporalFreeSurfaceIndication::new(&mut water, base)?);

    for _ in 0..2 {
        indication.parallel_exec(&mut water, 0.0)?;
    }

    let indicator = water.variable::<i32>(names::INDICATOR)?;
    let surface = indicator.iter().filter(|i| **i == FREE_SURFACE).count();
    info!("{surface} of {} particles on the free surface", indicator.len());

    let mut map = vec![vec![' '; NX]; NY];
    for (&(i, j), &flag) in cells.iter().zip(indicator) {
        map[j][i] = if flag == FREE_SURFACE { '#' } else { '.' };
    }
    for row in map.iter().rev() {
        println!("{}", row.iter().collect::<String>());
    }
    println!("{}", "=".repeat(NX));
    Ok(())
}
