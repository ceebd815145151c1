//! SPH particle-dynamics core
//!
//! Meshless building blocks for smoothed particle hydrodynamics:
//! - Wendland C2 smoothing kernel in 1D, 2D and 3D
//! - Cached neighbor relations (inner and contact) with precomputed weights
//! - The initialization / interaction / update execution pattern
//! - Free-surface indication, including a spatial-temporal variant
//! - Elastic and plastic stress relaxation for weakly compressible solids
//!
//! Body geometry, multi-body orchestration and output live with the caller.
//! A reference cell-linked-list search is included for callers without one.

pub mod config;
pub mod dynamics;
pub mod error;
pub mod kernel;
pub mod material;
pub mod math;
pub mod particles;
pub mod relation;
pub mod search;
pub mod solid_dynamics;
pub mod surface_indication;

pub use config::{MaterialConfig, SphConfig};
pub use dynamics::{
    Dynamics1Level, Execution, Initialization, Interaction, InteractionWithUpdate, Reduce,
    ReduceDynamics, SimpleDynamics, Update,
};
pub use error::{SphError, SphResult};
pub use kernel::{Dimension, Kernel};
pub use material::{
    radial_return, ElasticSolid, HardeningPlasticSolid, LinearElasticSolid, PlasticSolid,
    PlasticState,
};
pub use math::{Matd, Real, Vecd};
pub use particles::{names, BaseParticles};
pub use relation::{ContactRelation, InnerRelation, NeighborCandidate, NeighborList, Neighborhood};
pub use search::CellLinkedList;
pub use solid_dynamics::{
    AcousticTimeStepSize, PlasticStressRelaxationFirstHalf, StressRelaxationFirstHalf,
    StressRelaxationSecondHalf,
};
pub use surface_indication::{FreeSurfaceIndication, SpatialTemporalFreeSurfaceIndication};
