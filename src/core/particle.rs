use crate::config::{Derived, InitialDistribution, SimConfig, BOLTZMANN};
use crate::core::advect::wrap_periodic;
use crate::error::{Error, Result};
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Velocity space dimension (positions are 1D).
pub const DIM: usize = 3;

/// A velocity vector [vx, vy, vz].
pub type Vec3 = [f64; DIM];

/// State of all simulated particles, kept as parallel arrays.
///
/// Index `i` in `positions` and `velocities` is the same particle. The number of
/// particles is fixed at construction; nothing in the crate pushes or removes entries.
#[derive(Debug, Clone)]
pub struct ParticleStore {
    /// 1D positions in [0, domain length).
    pub positions: Vec<f64>,
    /// 3D velocities.
    pub velocities: Vec<Vec3>,
    mass: f64,
}

impl ParticleStore {
    /// Wrap existing arrays after validating invariants.
    ///
    /// Errors:
    /// - `Error::InvalidParam` if the arrays differ in length, `mass` is non-positive,
    ///   or any component is NaN/inf.
    pub fn new(positions: Vec<f64>, velocities: Vec<Vec3>, mass: f64) -> Result<Self> {
        if positions.len() != velocities.len() {
            return Err(Error::InvalidParam(format!(
                "positions ({}) and velocities ({}) must have equal length",
                positions.len(),
                velocities.len()
            )));
        }
        if !mass.is_finite() || mass <= 0.0 {
            return Err(Error::InvalidParam("mass must be finite and > 0".into()));
        }
        if !positions.iter().all(|x| x.is_finite()) {
            return Err(Error::InvalidParam("position must be finite".into()));
        }
        if !velocities.iter().flatten().all(|x| x.is_finite()) {
            return Err(Error::InvalidParam("velocity must be finite".into()));
        }
        Ok(Self {
            positions,
            velocities,
            mass,
        })
    }

    /// Build the initial ensemble for a run.
    ///
    /// Particles `c * ppc .. (c + 1) * ppc` are placed uniformly inside cell `c`.
    /// Velocity components are drawn from `config.initial_distribution` and then the
    /// whole ensemble is rescaled so its temperature equals `config.initial_temperature`.
    pub fn initialize<R: Rng + ?Sized>(
        config: &SimConfig,
        derived: &Derived,
        rng: &mut R,
    ) -> Result<Self> {
        let n = derived.num_particles;
        let mut positions = Vec::with_capacity(n);
        for cell in 0..config.num_cells {
            for _ in 0..config.particles_per_cell {
                let x = (cell as f64 + rng.random::<f64>()) * derived.cell_width;
                positions.push(wrap_periodic(x, config.domain_length));
            }
        }

        let mut velocities = vec![[0.0_f64; DIM]; n];
        match config.initial_distribution {
            InitialDistribution::Uniform => {
                for v in velocities.iter_mut().flatten() {
                    *v = rng.random_range(-1.0..1.0);
                }
            }
            InitialDistribution::Maxwellian => {
                let kt = BOLTZMANN * config.initial_temperature;
                let sigma = (kt / config.species.mass).sqrt();
                let normal = Normal::new(0.0, sigma)
                    .map_err(|e| Error::InvalidParam(format!("maxwellian width: {e}")))?;
                for v in velocities.iter_mut().flatten() {
                    *v = normal.sample(rng);
                }
            }
        }

        let mut store = Self::new(positions, velocities, config.species.mass)?;
        store.rescale_to_temperature(config.initial_temperature)?;
        Ok(store)
    }

    /// Number of particles.
    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Particle mass [kg].
    #[inline]
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Total kinetic energy: 1/2 m Σ|v|^2.
    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * self.velocities.iter().map(speed_sq).sum::<f64>()
    }

    /// Kinetic temperature from equipartition: KE = 3/2 N k T.
    pub fn temperature(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        2.0 * self.kinetic_energy() / (3.0 * self.len() as f64 * BOLTZMANN)
    }

    /// Total momentum per unit mass, Σv.
    pub fn momentum(&self) -> Vec3 {
        let mut p = [0.0_f64; DIM];
        for v in &self.velocities {
            for (pk, vk) in p.iter_mut().zip(v) {
                *pk += vk;
            }
        }
        p
    }

    /// Speed of every particle, in storage order.
    pub fn speeds(&self) -> impl Iterator<Item = f64> + '_ {
        self.velocities.iter().map(speed)
    }

    /// Uniformly scale every velocity so the ensemble temperature equals `target`.
    ///
    /// Errors:
    /// - `Error::InvalidParam` if `target` is not positive.
    /// - `Error::MathError` if the ensemble has no kinetic energy to scale.
    pub fn rescale_to_temperature(&mut self, target: f64) -> Result<()> {
        if !target.is_finite() || target <= 0.0 {
            return Err(Error::InvalidParam(
                "target temperature must be finite and > 0".into(),
            ));
        }
        let actual = self.kinetic_energy();
        if !actual.is_finite() || actual <= 0.0 {
            return Err(Error::MathError(
                "cannot rescale an ensemble with zero kinetic energy".into(),
            ));
        }
        let wanted = 1.5 * self.len() as f64 * BOLTZMANN * target;
        let factor = (wanted / actual).sqrt();
        for c in self.velocities.iter_mut().flatten() {
            *c *= factor;
        }
        Ok(())
    }
}

#[inline]
pub fn dot(a: &Vec3, b: &Vec3) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[inline]
pub fn speed_sq(v: &Vec3) -> f64 {
    dot(v, v)
}

#[inline]
pub fn speed(v: &Vec3) -> f64 {
    speed_sq(v).sqrt()
}
