//! Cached neighbor relations.
//!
//! A [`Neighborhood`] holds, for one particle, the neighbor ids, distances,
//! unit directions and the quadrature weight `dW_ijV_j` that every operator
//! uses. Weights are evaluated once per rebuild, not per use.
//!
//! [`InnerRelation`] pairs a body with itself; a [`ContactRelation`] pairs it
//! with one other body. Bodies in contact with several others keep one
//! contact relation per partner.
//!
//! Buffers are over-allocated across rebuilds: only the first
//! `current_size` entries of a neighborhood are valid.

use log::debug;
use rayon::prelude::*;

use crate::error::{SphError, SphResult};
use crate::kernel::{Dimension, Kernel};
use crate::math::{Real, Vecd};
use crate::particles::{names, BaseParticles};

/// Raw neighbor produced by the search collaborator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NeighborCandidate {
    pub index_j: usize,
    pub r_ij: Real,
    /// Unit vector from j to i; zero when the search only supplies distances.
    pub e_ij: Vecd,
}

impl NeighborCandidate {
    pub fn new(index_j: usize, r_ij: Real) -> Self {
        Self {
            index_j,
            r_ij,
            e_ij: Vecd::ZERO,
        }
    }

    /// Builds a candidate from `displacement = pos_i - pos_j`.
    pub fn from_displacement(index_j: usize, displacement: Vecd) -> Self {
        let r_ij = displacement.length();
        let e_ij = if r_ij > 0.0 {
            displacement / r_ij
        } else {
            Vecd::ZERO
        };
        Self { index_j, r_ij, e_ij }
    }
}

/// Candidate list of one particle; only the first `current_size` are valid.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NeighborList {
    pub current_size: usize,
    pub candidates: Vec<NeighborCandidate>,
}

impl NeighborList {
    pub fn new(candidates: Vec<NeighborCandidate>) -> Self {
        Self {
            current_size: candidates.len(),
            candidates,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

/// One valid neighbor entry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NeighborEntry {
    pub index_j: usize,
    pub r_ij: Real,
    pub dw_ijv_j: Real,
    pub e_ij: Vecd,
}

/// Cached neighbors of a single particle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Neighborhood {
    current_size: usize,
    j: Vec<usize>,
    r_ij: Vec<Real>,
    dw_ijv_j: Vec<Real>,
    e_ij: Vec<Vecd>,
}

impl Neighborhood {
    #[inline]
    pub fn current_size(&self) -> usize {
        self.current_size
    }

    /// Entries held in the buffers, valid or not.
    #[inline]
    pub fn allocated_size(&self) -> usize {
        self.j.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.current_size == 0
    }

    #[inline]
    pub fn j(&self) -> &[usize] {
        &self.j[..self.current_size]
    }

    #[inline]
    pub fn r_ij(&self) -> &[Real] {
        &self.r_ij[..self.current_size]
    }

    #[inline]
    pub fn dw_ijv_j(&self) -> &[Real] {
        &self.dw_ijv_j[..self.current_size]
    }

    #[inline]
    pub fn e_ij(&self) -> &[Vecd] {
        &self.e_ij[..self.current_size]
    }

    /// Iterates the valid prefix.
    pub fn iter(&self) -> impl Iterator<Item = NeighborEntry> + '_ {
        (0..self.current_size).map(move |n| NeighborEntry {
            index_j: self.j[n],
            r_ij: self.r_ij[n],
            dw_ijv_j: self.dw_ijv_j[n],
            e_ij: self.e_ij[n],
        })
    }

    fn rebuild(
        &mut self,
        index_i: usize,
        list: &NeighborList,
        neighbor_volumes: &[Real],
        kernel: &Kernel,
        dimension: Dimension,
    ) -> SphResult<()> {
        let inconsistent = |reason: String| SphError::NeighborDataInconsistency { index_i, reason };

        if list.current_size > list.candidates.len() {
            return Err(inconsistent(format!(
                "entry count {} exceeds capacity {}",
                list.current_size,
                list.candidates.len()
            )));
        }

        let cutoff = kernel.cutoff_radius();
        self.current_size = 0;
        for candidate in &list.candidates[..list.current_size] {
            let r_ij = candidate.r_ij;
            if !(r_ij.is_finite() && r_ij >= 0.0) {
                return Err(inconsistent(format!(
                    "invalid distance {r_ij} to neighbor {}",
                    candidate.index_j
                )));
            }
            if r_ij >= cutoff {
                return Err(inconsistent(format!(
                    "neighbor {} at distance {r_ij} is outside the support radius {cutoff}",
                    candidate.index_j
                )));
            }
            let volume_j = *neighbor_volumes.get(candidate.index_j).ok_or_else(|| {
                inconsistent(format!(
                    "neighbor id {} outside body of {} particles",
                    candidate.index_j,
                    neighbor_volumes.len()
                ))
            })?;

            let dw_ijv_j = kernel.dw(dimension, r_ij) * volume_j;
            self.push(candidate.index_j, r_ij, dw_ijv_j, candidate.e_ij);
        }
        Ok(())
    }

    fn push(&mut self, j: usize, r_ij: Real, dw_ijv_j: Real, e_ij: Vecd) {
        let n = self.current_size;
        if n < self.j.len() {
            self.j[n] = j;
            self.r_ij[n] = r_ij;
            self.dw_ijv_j[n] = dw_ijv_j;
            self.e_ij[n] = e_ij;
        } else {
            self.j.push(j);
            self.r_ij.push(r_ij);
            self.dw_ijv_j.push(dw_ijv_j);
            self.e_ij.push(e_ij);
        }
        self.current_size += 1;
    }
}

fn rebuild_all(
    neighborhoods: &mut [Neighborhood],
    lists: &[NeighborList],
    neighbor_volumes: &[Real],
    kernel: &Kernel,
    dimension: Dimension,
) -> SphResult<()> {
    if lists.len() != neighborhoods.len() {
        return Err(SphError::NeighborDataInconsistency {
            index_i: lists.len().min(neighborhoods.len()),
            reason: format!(
                "{} neighbor lists supplied for {} particles",
                lists.len(),
                neighborhoods.len()
            ),
        });
    }
    neighborhoods
        .par_iter_mut()
        .zip(lists.par_iter())
        .enumerate()
        .try_for_each(|(index_i, (neighborhood, list))| {
            neighborhood.rebuild(index_i, list, neighbor_volumes, kernel, dimension)
        })
}

fn total_entries(neighborhoods: &[Neighborhood]) -> usize {
    neighborhoods.iter().map(Neighborhood::current_size).sum()
}

/// Neighbors within the same body.
#[derive(Clone, Debug)]
pub struct InnerRelation {
    kernel: Kernel,
    dimension: Dimension,
    neighborhoods: Vec<Neighborhood>,
}

impl InnerRelation {
    /// Empty relation sized for `particles`.
    pub fn new(particles: &BaseParticles) -> Self {
        Self {
            kernel: *particles.kernel(),
            dimension: particles.dimension(),
            neighborhoods: vec![Neighborhood::default(); particles.total_real_particles()],
        }
    }

    /// Rebuilds every neighborhood from fresh search output.
    pub fn update_configuration(
        &mut self,
        particles: &BaseParticles,
        lists: &[NeighborList],
    ) -> SphResult<()> {
        let volumes = particles.variable::<Real>(names::VOLUME)?;
        rebuild_all(
            &mut self.neighborhoods,
            lists,
            volumes,
            &self.kernel,
            self.dimension,
        )?;
        debug!(
            "inner relation rebuilt: {} particles, {} entries",
            self.neighborhoods.len(),
            total_entries(&self.neighborhoods)
        );
        Ok(())
    }

    #[inline]
    pub fn neighborhood(&self, index_i: usize) -> &Neighborhood {
        &self.neighborhoods[index_i]
    }

    pub fn configuration(&self) -> &[Neighborhood] {
        &self.neighborhoods
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    pub fn len(&self) -> usize {
        self.neighborhoods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighborhoods.is_empty()
    }
}

/// Neighbors of one body's particles inside another body.
#[derive(Clone, Debug)]
pub struct ContactRelation {
    contact_body: String,
    kernel: Kernel,
    dimension: Dimension,
    neighborhoods: Vec<Neighborhood>,
}

impl ContactRelation {
    /// Empty relation of `particles` against the body named `contact_body`.
    pub fn new(particles: &BaseParticles, contact_body: impl Into<String>) -> Self {
        Self {
            contact_body: contact_body.into(),
            kernel: *particles.kernel(),
            dimension: particles.dimension(),
            neighborhoods: vec![Neighborhood::default(); particles.total_real_particles()],
        }
    }

    /// Rebuilds from search output; ids in `lists` index `contact_particles`.
    pub fn update_configuration(
        &mut self,
        contact_particles: &BaseParticles,
        lists: &[NeighborList],
    ) -> SphResult<()> {
        let volumes = contact_particles.variable::<Real>(names::VOLUME)?;
        rebuild_all(
            &mut self.neighborhoods,
            lists,
            volumes,
            &self.kernel,
            self.dimension,
        )?;
        debug!(
            "contact relation with {} rebuilt: {} entries",
            self.contact_body,
            total_entries(&self.neighborhoods)
        );
        Ok(())
    }

    pub fn contact_body(&self) -> &str {
        &self.contact_body
    }

    #[inline]
    pub fn neighborhood(&self, index_i: usize) -> &Neighborhood {
        &self.neighborhoods[index_i]
    }

    pub fn configuration(&self) -> &[Neighborhood] {
        &self.neighborhoods
    }

    pub fn len(&self) -> usize {
        self.neighborhoods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighborhoods.is_empty()
    }
}
