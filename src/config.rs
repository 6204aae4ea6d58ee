//! Run configuration and the constants derived from it once at setup.
//!
//! `SimConfig` is plain data (serde-loadable from JSON). `SimConfig::derive`
//! validates it and produces a `Derived` value that every component borrows
//! for the whole run; nothing here changes once stepping starts.

use crate::core::collision::VhsModel;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Boltzmann constant [J/K].
pub const BOLTZMANN: f64 = 1.380_649e-23;

/// Loschmidt number density at 273.15 K and 1 atm [1/m^3].
pub const LOSCHMIDT: f64 = 2.686_780_111e25;

/// Species mass and VHS collision parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Species {
    /// Molecular mass [kg].
    pub mass: f64,
    /// VHS reference diameter [m].
    pub d_ref: f64,
    /// VHS reference temperature [K].
    pub t_ref: f64,
    /// Viscosity-temperature exponent.
    pub omega: f64,
}

impl Species {
    /// Argon with Bird's VHS parameters.
    pub fn argon() -> Self {
        Self {
            mass: 6.63e-26,
            d_ref: 4.17e-10,
            t_ref: 273.0,
            omega: 0.81,
        }
    }

    fn validate(&self) -> Result<()> {
        positive("species.mass", self.mass)?;
        positive("species.d_ref", self.d_ref)?;
        positive("species.t_ref", self.t_ref)?;
        // σ·vr ∝ vr^(2 - 2ω) must grow with vr, or σ(vr_max)·vr_max is no upper bound.
        if !self.omega.is_finite() || self.omega <= 0.0 || self.omega >= 1.0 {
            return Err(Error::InvalidParam(
                "species.omega must lie in (0, 1)".into(),
            ));
        }
        Ok(())
    }
}

impl Default for Species {
    fn default() -> Self {
        Self::argon()
    }
}

/// Shape of the velocity components drawn before the rescale to the target temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialDistribution {
    /// Components uniform in a cube (deliberately non-equilibrium).
    #[default]
    Uniform,
    /// Components normally distributed (already Maxwellian).
    Maxwellian,
}

/// What the collision engine does when a candidate's σ·vr exceeds `sigma_vr_max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigmaVrMaxPolicy {
    /// Keep the setup estimate; clamp the acceptance ratio to 1 and count the overshoot.
    #[default]
    Fixed,
    /// Raise the bound to the observed σ·vr for all later candidates.
    Adaptive,
}

/// Everything supplied before a run. Immutable once the simulation is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Length of the periodic box [m].
    pub domain_length: f64,
    /// Transverse area of the box [m^2]; only enters through cell volume and Fnum.
    pub cross_section_area: f64,
    pub num_cells: usize,
    pub particles_per_cell: usize,
    /// Real gas number density [1/m^3].
    pub number_density: f64,
    pub species: Species,
    /// Temperature the initial ensemble is rescaled to [K].
    pub initial_temperature: f64,
    /// Time step [s].
    pub dt: f64,
    /// Total simulated time [s].
    pub total_time: f64,
    /// Simulated time before speed sampling starts [s].
    pub sample_warmup_time: f64,
    /// Sampling cadence in steps.
    pub sample_interval: usize,
    /// Assumed maximum relative speed, in units of the initial thermal speed.
    pub max_speed_multiplier: f64,
    pub initial_distribution: InitialDistribution,
    pub sigma_vr_max_policy: SigmaVrMaxPolicy,
    /// RNG seed; `None` draws one from OS entropy.
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    /// Argon relaxing from a uniform velocity distribution at 273 K.
    fn default() -> Self {
        Self {
            domain_length: 1.0e-6,
            cross_section_area: 1.0,
            num_cells: 50,
            particles_per_cell: 100,
            number_density: LOSCHMIDT,
            species: Species::argon(),
            initial_temperature: 273.0,
            dt: 2.0e-11,
            total_time: 4.0e-9,
            sample_warmup_time: 2.0e-9,
            sample_interval: 5,
            max_speed_multiplier: 5.0,
            initial_distribution: InitialDistribution::Uniform,
            sigma_vr_max_policy: SigmaVrMaxPolicy::Fixed,
            seed: None,
        }
    }
}

/// Constants computed once from a validated `SimConfig`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Derived {
    pub num_particles: usize,
    pub cell_width: f64,
    pub cell_volume: f64,
    /// Real molecules per simulated particle.
    pub fnum: f64,
    /// Most probable speed sqrt(2 k T / m) at the initial temperature [m/s].
    pub thermal_speed: f64,
    /// Relative speed assumed when seeding `sigma_vr_max` [m/s].
    pub vr_max: f64,
    /// Upper bound of σ·vr used by the NTC estimator [m^3/s].
    pub sigma_vr_max: f64,
    pub vhs: VhsModel,
    pub num_steps: usize,
    /// First step index eligible for sampling.
    pub warmup_step: usize,
}

impl SimConfig {
    /// Parse a JSON document; missing fields fall back to `SimConfig::default()`.
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Read and parse a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject configurations that cannot be stepped.
    pub fn validate(&self) -> Result<()> {
        positive("domain_length", self.domain_length)?;
        positive("cross_section_area", self.cross_section_area)?;
        positive("number_density", self.number_density)?;
        positive("initial_temperature", self.initial_temperature)?;
        positive("dt", self.dt)?;
        positive("total_time", self.total_time)?;
        positive("max_speed_multiplier", self.max_speed_multiplier)?;
        if self.num_cells == 0 {
            return Err(Error::InvalidParam("num_cells must be > 0".into()));
        }
        if self.particles_per_cell == 0 {
            return Err(Error::InvalidParam("particles_per_cell must be > 0".into()));
        }
        if self.sample_interval == 0 {
            return Err(Error::InvalidParam("sample_interval must be > 0".into()));
        }
        if !self.sample_warmup_time.is_finite() || self.sample_warmup_time < 0.0 {
            return Err(Error::InvalidParam(
                "sample_warmup_time must be finite and >= 0".into(),
            ));
        }
        if self.total_time < self.dt {
            return Err(Error::InvalidParam(
                "total_time must cover at least one time step".into(),
            ));
        }
        self.species.validate()
    }

    /// Validate and compute the run constants.
    pub fn derive(&self) -> Result<Derived> {
        self.validate()?;

        let num_particles = self
            .num_cells
            .checked_mul(self.particles_per_cell)
            .ok_or_else(|| Error::InvalidParam("particle count overflows".into()))?;
        let cell_width = self.domain_length / self.num_cells as f64;
        let cell_volume = cell_width * self.cross_section_area;
        positive("cell width", cell_width)?;
        positive("cell volume", cell_volume)?;

        let fnum = self.number_density * self.domain_length * self.cross_section_area
            / num_particles as f64;
        positive("fnum", fnum)?;

        let vhs = VhsModel::new(&self.species)?;
        let kt = BOLTZMANN * self.initial_temperature;
        let thermal_speed = (2.0 * kt / self.species.mass).sqrt();
        let vr_max = self.max_speed_multiplier * thermal_speed;
        let sigma_vr_max = vhs.cross_section(vr_max) * vr_max;
        positive("sigma_vr_max", sigma_vr_max)?;

        let num_steps = (self.total_time / self.dt).round() as usize;
        let warmup_step = (self.sample_warmup_time / self.dt).round() as usize;

        Ok(Derived {
            num_particles,
            cell_width,
            cell_volume,
            fnum,
            thermal_speed,
            vr_max,
            sigma_vr_max,
            vhs,
            num_steps,
            warmup_step,
        })
    }
}

fn positive(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(Error::InvalidParam(format!(
            "{name} must be finite and > 0"
        )));
    }
    Ok(())
}
