//! Reference neighbor search: a cell-linked list over a uniform grid.
//!
//! Cell size equals the kernel cutoff radius, so all neighbors of a particle
//! lie in the 3x3x3 block of cells around it. Only occupied cells are stored,
//! keyed by their integer coordinates; each holds the head of a singly linked
//! list threaded through `particle_next`.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::error::{SphError, SphResult};
use crate::math::{Real, Vecd};
use crate::particles::{names, BaseParticles};
use crate::relation::{NeighborCandidate, NeighborList};

type CellCoords = [i64; 3];

/// `None` past the edge of the coordinate range.
fn offset_cell(center: CellCoords, offset: CellCoords) -> Option<CellCoords> {
    Some([
        center[0].checked_add(offset[0])?,
        center[1].checked_add(offset[1])?,
        center[2].checked_add(offset[2])?,
    ])
}

pub struct CellLinkedList {
    cell_size: Real,
    cell_head: HashMap<CellCoords, i32>,
    particle_next: Vec<i32>,
    positions: Vec<Vecd>,
}

impl CellLinkedList {
    /// Bins the positions of `particles` into cells of size `cutoff`.
    pub fn new(particles: &BaseParticles) -> SphResult<Self> {
        let positions = particles.variable::<Vecd>(names::POSITION)?.to_vec();
        let cell_size = particles.kernel().cutoff_radius();
        Self::from_positions(positions, cell_size)
    }

    pub fn from_positions(positions: Vec<Vecd>, cell_size: Real) -> SphResult<Self> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(SphError::Configuration(format!(
                "cell size must be positive, got {cell_size}"
            )));
        }
        if let Some(index) = positions.iter().position(|p| !p.is_finite()) {
            return Err(SphError::Configuration(format!(
                "particle {index} has a non-finite position"
            )));
        }
        if i32::try_from(positions.len()).is_err() {
            return Err(SphError::Configuration(format!(
                "{} particles exceed the cell list capacity",
                positions.len()
            )));
        }

        let mut list = Self {
            cell_size,
            cell_head: HashMap::new(),
            particle_next: vec![-1; positions.len()],
            positions,
        };

        for i in 0..list.positions.len() {
            let cell = list.cell_coords(list.positions[i]);
            let head = list.cell_head.entry(cell).or_insert(-1);
            list.particle_next[i] = *head;
            *head = i as i32;
        }
        Ok(list)
    }

    /// Saturates far outside the representable range; the distance check in
    /// `query` still filters any false candidates.
    fn cell_coords(&self, position: Vecd) -> CellCoords {
        let local = position / self.cell_size;
        [
            local.x.floor() as i64,
            local.y.floor() as i64,
            local.z.floor() as i64,
        ]
    }

    /// Indexed particles strictly closer than the cell size to `position`.
    pub fn query(&self, position: Vecd, exclude: Option<usize>) -> NeighborList {
        let center = self.cell_coords(position);
        let mut candidates = Vec::new();
        for dz in -1..=1 {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let Some(&head) = offset_cell(center, [dx, dy, dz])
                        .and_then(|cell| self.cell_head.get(&cell))
                    else {
                        continue;
                    };
                    let mut j = head;
                    while j != -1 {
                        let j_idx = j as usize;
                        if exclude != Some(j_idx) {
                            let displacement = position - self.positions[j_idx];
                            if displacement.length_squared() < self.cell_size * self.cell_size {
                                candidates.push(NeighborCandidate::from_displacement(
                                    j_idx,
                                    displacement,
                                ));
                            }
                        }
                        j = self.particle_next[j_idx];
                    }
                }
            }
        }
        NeighborList::new(candidates)
    }

    /// Inner lists for the particles this list was built from.
    pub fn inner_lists(&self) -> Vec<NeighborList> {
        (0..self.positions.len())
            .into_par_iter()
            .map(|i| self.query(self.positions[i], Some(i)))
            .collect()
    }

    /// Contact lists: neighbors of each `positions` entry among this list's particles.
    pub fn contact_lists(&self, positions: &[Vecd]) -> Vec<NeighborList> {
        positions
            .par_iter()
            .map(|p| self.query(*p, None))
            .collect()
    }
}
