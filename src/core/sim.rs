use crate::config::{Derived, SimConfig};
use crate::core::advect::Advector;
use crate::core::binning::CellBinner;
use crate::core::collision::{CollisionEngine, CollisionStats};
use crate::core::particle::{ParticleStore, Vec3};
use crate::core::sampler::Sampler;
use crate::error::Result;
use crate::report::RunSummary;
use rand::{rng, rngs::StdRng, Rng, SeedableRng};

/// Step-synchronous DSMC run in a 1D periodic box.
///
/// Each step advects every particle, re-bins them into cells, runs the NTC
/// collision engine cell by cell and, on sampling steps, records particle speeds.
/// All randomness comes from one `StdRng`, so a fixed seed reproduces a run bit for bit.
#[derive(Debug)]
pub struct Simulation {
    config: SimConfig,
    derived: Derived,
    store: ParticleStore,
    advector: Advector,
    binner: CellBinner,
    engine: CollisionEngine,
    sampler: Sampler,
    rng: StdRng,
    step: usize,
    stats: CollisionStats,
    initial_kinetic_energy: f64,
    initial_temperature: f64,
}

impl Simulation {
    /// Validate `config`, derive the run constants and build the initial ensemble.
    ///
    /// Errors: `Error::InvalidParam` for any configuration violation; nothing is stepped.
    pub fn new(config: SimConfig) -> Result<Self> {
        let derived = config.derive()?;

        let mut rng: StdRng = match config.seed {
            Some(s) => SeedableRng::seed_from_u64(s),
            None => SeedableRng::seed_from_u64(rng().random()),
        };

        let store = ParticleStore::initialize(&config, &derived, &mut rng)?;
        let advector = Advector::new(config.dt, config.domain_length);
        let binner = CellBinner::new(config.num_cells, derived.cell_width)?;
        let engine = CollisionEngine::new(&config, &derived);
        let sampler = Sampler::new(derived.warmup_step, config.sample_interval)?;

        let initial_kinetic_energy = store.kinetic_energy();
        let initial_temperature = store.temperature();

        log::info!(
            "DSMC setup: N = {}, cells = {}, steps = {}, Fnum = {:.4e}, sigma_vr_max = {:.4e} m^3/s (vr_max = {:.1} m/s)",
            derived.num_particles,
            config.num_cells,
            derived.num_steps,
            derived.fnum,
            derived.sigma_vr_max,
            derived.vr_max
        );
        log::info!("initial temperature {initial_temperature:.3} K");

        Ok(Self {
            config,
            derived,
            store,
            advector,
            binner,
            engine,
            sampler,
            rng,
            step: 0,
            stats: CollisionStats::default(),
            initial_kinetic_energy,
            initial_temperature,
        })
    }

    /// Advance one time step: advect, bin, collide per cell, then sample if due.
    ///
    /// Returns the collision counters of this step.
    pub fn step(&mut self) -> CollisionStats {
        self.advector.advance(&mut self.store);
        self.binner.bin(&self.store.positions);

        let mut step_stats = CollisionStats::default();
        for members in self.binner.cells() {
            step_stats += self
                .engine
                .collide_cell(&mut self.store.velocities, members, &mut self.rng);
        }
        self.stats += step_stats;

        let sampled = self.sampler.record(self.step, &self.store);
        log::debug!(
            "step {}: {} candidates, {} collisions{}",
            self.step,
            step_stats.candidates,
            step_stats.accepted,
            if sampled { ", sampled" } else { "" }
        );

        self.step += 1;
        step_stats
    }

    /// Run the remaining steps of the configured schedule and summarise.
    pub fn run(&mut self) -> RunSummary {
        while self.step < self.derived.num_steps {
            self.step();
        }
        let summary = self.summary();
        log::info!(
            "DSMC finished after {} steps: T = {:.3} K, ΔE = {:.3e} %, {} collisions",
            summary.steps,
            summary.final_temperature,
            summary.energy_change_percent(),
            summary.collisions.accepted
        );
        summary
    }

    /// Scalar statistics of the run so far.
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            num_particles: self.store.len(),
            steps: self.step,
            initial_temperature: self.initial_temperature,
            final_temperature: self.store.temperature(),
            initial_kinetic_energy: self.initial_kinetic_energy,
            final_kinetic_energy: self.store.kinetic_energy(),
            collisions: self.stats,
            snapshots: self.sampler.snapshots(),
            samples: self.sampler.samples().len(),
            sigma_vr_max: self.engine.sigma_vr_max(),
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn derived(&self) -> &Derived {
        &self.derived
    }

    /// Number of steps completed.
    pub fn current_step(&self) -> usize {
        self.step
    }

    /// Simulated time elapsed [s].
    pub fn time(&self) -> f64 {
        self.step as f64 * self.config.dt
    }

    /// Number of particles.
    pub fn num_particles(&self) -> usize {
        self.store.len()
    }

    pub fn particles(&self) -> &ParticleStore {
        &self.store
    }

    pub fn positions(&self) -> &[f64] {
        &self.store.positions
    }

    pub fn velocities(&self) -> &[Vec3] {
        &self.store.velocities
    }

    /// Compute total kinetic energy (diagnostic).
    pub fn kinetic_energy(&self) -> f64 {
        self.store.kinetic_energy()
    }

    pub fn temperature(&self) -> f64 {
        self.store.temperature()
    }

    /// Speeds sampled so far.
    pub fn samples(&self) -> &[f64] {
        self.sampler.samples()
    }

    /// Collision counters accumulated over all steps.
    pub fn collision_stats(&self) -> CollisionStats {
        self.stats
    }

    /// Particles per cell after the most recent step's binning.
    pub fn cell_counts(&self) -> Vec<usize> {
        self.binner.counts().collect()
    }
}
