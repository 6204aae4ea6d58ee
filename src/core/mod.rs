//! Simulation core: particle state, advection, cell binning, NTC/VHS collisions,
//! speed sampling and the step loop that ties them together.

pub mod advect;
pub mod binning;
pub mod collision;
pub mod particle;
pub mod sampler;
pub mod sim;

pub use advect::Advector;
pub use binning::CellBinner;
pub use collision::{CollisionEngine, CollisionStats, VhsModel};
pub use particle::{ParticleStore, Vec3};
pub use sampler::Sampler;
pub use sim::Simulation;
