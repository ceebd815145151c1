//! Free-surface indication from the divergence of position.
//!
//! Deep inside a body `div(r)` approaches the dimension; near a free surface
//! the kernel support is truncated and the estimate drops. Particles whose
//! `PositionDivergence` falls below the threshold, or that sit within one
//! smoothing length of such a particle, carry `Indicator = 1`
//! ([`FREE_SURFACE`]); the rest carry `0` ([`INTERIOR`]).

use crate::dynamics::{Interaction, Update};
use crate::error::SphResult;
use crate::math::Real;
use crate::particles::{names, BaseParticles};
use crate::relation::{ContactRelation, InnerRelation, Neighborhood};

pub const FREE_SURFACE: i32 = 1;
pub const INTERIOR: i32 = 0;

/// Default threshold per unit dimension.
pub const DEFAULT_THRESHOLD_FACTOR: Real = 0.75;

/// `-sum dW_ijV_j * r_ij` over the valid entries.
#[inline]
fn position_divergence(neighborhood: &Neighborhood) -> Real {
    neighborhood
        .dw_ijv_j()
        .iter()
        .zip(neighborhood.r_ij())
        .fold(0.0, |pos_div, (dw_ijv_j, r_ij)| pos_div - dw_ijv_j * r_ij)
}

/// Free-surface indication over the inner relation, optionally corrected by
/// contact relations with other bodies.
pub struct FreeSurfaceIndication<'a> {
    inner: &'a InnerRelation,
    contacts: Vec<&'a ContactRelation>,
    threshold_by_dimensions: Real,
    smoothing_length: Real,
}

impl<'a> FreeSurfaceIndication<'a> {
    /// Registers `PositionDivergence` and `Indicator` on `particles`.
    pub fn new(particles: &mut BaseParticles, inner: &'a InnerRelation) -> SphResult<Self> {
        particles.register_variable::<Real>(names::POSITION_DIVERGENCE, 0.0)?;
        particles.register_variable::<i32>(names::INDICATOR, INTERIOR)?;
        Ok(Self {
            inner,
            contacts: Vec::new(),
            threshold_by_dimensions: DEFAULT_THRESHOLD_FACTOR * particles.dimension().as_real(),
            smoothing_length: particles.kernel().smoothing_length(),
        })
    }

    /// Adds contact relations whose contributions are summed into the inner value.
    pub fn with_contacts(
        mut self,
        contacts: impl IntoIterator<Item = &'a ContactRelation>,
    ) -> Self {
        self.contacts.extend(contacts);
        self
    }

    pub fn with_threshold(mut self, threshold: Real) -> Self {
        self.threshold_by_dimensions = threshold;
        self
    }

    pub fn threshold(&self) -> Real {
        self.threshold_by_dimensions
    }

    pub fn inner(&self) -> &InnerRelation {
        self.inner
    }

    fn inner_position_divergence(&self, index_i: usize) -> Real {
        position_divergence(self.inner.neighborhood(index_i))
    }

    fn contact_position_divergence(&self, index_i: usize) -> Real {
        self.contacts
            .iter()
            .map(|relation| position_divergence(relation.neighborhood(index_i)))
            .sum()
    }

    /// Two particle layers: a neighbor within one smoothing length has a
    /// low divergence itself.
    fn is_very_near_free_surface(&self, pos_div: &[Real], index_i: usize) -> bool {
        let neighborhood = self.inner.neighborhood(index_i);
        neighborhood
            .j()
            .iter()
            .zip(neighborhood.r_ij())
            .any(|(&j, &r_ij)| {
                pos_div[j] < self.threshold_by_dimensions && r_ij < self.smoothing_length
            })
    }
}

impl Interaction for FreeSurfaceIndication<'_> {
    type Interacted = Real;

    fn interaction(
        &self,
        _particles: &BaseParticles,
        index_i: usize,
        _dt: Real,
    ) -> SphResult<Real> {
        Ok(self.inner_position_divergence(index_i) + self.contact_position_divergence(index_i))
    }

    fn commit_interaction(
        &self,
        particles: &mut BaseParticles,
        values: Vec<Real>,
    ) -> SphResult<()> {
        particles.assign_variable(names::POSITION_DIVERGENCE, &values)
    }
}

impl Update for FreeSurfaceIndication<'_> {
    type Updated = i32;

    fn update(&self, particles: &BaseParticles, index_i: usize, _dt: Real) -> SphResult<i32> {
        let pos_div = particles.variable::<Real>(names::POSITION_DIVERGENCE)?;
        if pos_div[index_i] > self.threshold_by_dimensions
            && !self.is_very_near_free_surface(pos_div, index_i)
        {
            Ok(INTERIOR)
        } else {
            Ok(FREE_SURFACE)
        }
    }

    fn commit_update(&self, particles: &mut BaseParticles, values: Vec<i32>) -> SphResult<()> {
        particles.assign_variable(names::INDICATOR, &values)
    }
}

/// Free-surface indication with hysteresis against the previous step.
///
/// A particle newly reading below the threshold, away from last step's free
/// surface, is forced to read strongly interior for this step. This
/// suppresses single-step flicker from noisy divergence near transient voids.
pub struct SpatialTemporalFreeSurfaceIndication<'a> {
    base: FreeSurfaceIndication<'a>,
}

impl<'a> SpatialTemporalFreeSurfaceIndication<'a> {
    /// Registers `PreviousSurfaceIndicator` (initially free surface) on top of
    /// the base variables.
    pub fn new(particles: &mut BaseParticles, base: FreeSurfaceIndication<'a>) -> SphResult<Self> {
        particles.register_variable::<i32>(names::PREVIOUS_SURFACE_INDICATOR, FREE_SURFACE)?;
        Ok(Self { base })
    }

    pub fn base(&self) -> &FreeSurfaceIndication<'a> {
        &self.base
    }

    fn is_near_previous_free_surface(&self, previous: &[i32], index_i: usize) -> bool {
        self.base
            .inner
            .neighborhood(index_i)
            .j()
            .iter()
            .any(|&j| previous[j] == FREE_SURFACE)
    }
}

impl Interaction for SpatialTemporalFreeSurfaceIndication<'_> {
    type Interacted = Real;

    /// The override acts on the inner value; contact terms are added after it.
    fn interaction(&self, particles: &BaseParticles, index_i: usize, _dt: Real) -> SphResult<Real> {
        let previous = particles.variable::<i32>(names::PREVIOUS_SURFACE_INDICATOR)?;
        let threshold = self.base.threshold_by_dimensions;

        let mut pos_div = self.base.inner_position_divergence(index_i);
        if pos_div < threshold
            && previous[index_i] != FREE_SURFACE
            && !self.is_near_previous_free_surface(previous, index_i)
        {
            pos_div = 2.0 * threshold;
        }
        Ok(pos_div + self.base.contact_position_divergence(index_i))
    }

    fn commit_interaction(
        &self,
        particles: &mut BaseParticles,
        values: Vec<Real>,
    ) -> SphResult<()> {
        self.base.commit_interaction(particles, values)
    }
}

impl Update for SpatialTemporalFreeSurfaceIndication<'_> {
    type Updated = i32;

    fn update(&self, particles: &BaseParticles, index_i: usize, dt: Real) -> SphResult<i32> {
        self.base.update(particles, index_i, dt)
    }

    fn commit_update(&self, particles: &mut BaseParticles, values: Vec<i32>) -> SphResult<()> {
        particles.assign_variable(names::PREVIOUS_SURFACE_INDICATOR, &values)?;
        self.base.commit_update(particles, values)
    }
}
