//! Direct Simulation Monte Carlo relaxation of a dilute monatomic gas.
//!
//! A 1D periodic box is split into cells; each step particles free-fly, are
//! re-binned, and collide pairwise within their cell using the No-Time-Counter
//! scheme with Variable Hard Sphere cross-sections. Speeds sampled after a
//! warm-up are compared against Maxwell-Boltzmann by the `report` module.
//!
//! ```no_run
//! use dsmcsim::{config::SimConfig, core::Simulation};
//!
//! let mut sim = Simulation::new(SimConfig { seed: Some(1), ..SimConfig::default() })?;
//! let summary = sim.run();
//! println!("{summary}");
//! # Ok::<(), dsmcsim::error::Error>(())
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod report;

#[cfg(feature = "python")]
mod python;

pub use crate::config::SimConfig;
pub use crate::core::Simulation;
pub use crate::error::{Error, Result};
