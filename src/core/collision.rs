//! No-Time-Counter pair selection and Variable Hard Sphere collisions within one cell.
//!
//! Per cell and step the engine draws `floor(candidates + u)` random pairs, evaluates
//! the VHS cross-section for each, accepts with probability `σ·vr / sigma_vr_max`
//! and scatters accepted pairs isotropically in their centre-of-mass frame.

use crate::config::{Derived, SigmaVrMaxPolicy, SimConfig, Species, BOLTZMANN};
use crate::core::particle::{speed, Vec3, DIM};
use crate::error::{Error, Result};
use rand::Rng;
use std::f64::consts::PI;
use std::ops::AddAssign;

/// Relative speeds below this are treated as a coincident pair [m/s].
pub const VR_FLOOR: f64 = 1.0e-10;

/// Cross-section reported for a pair below `VR_FLOOR` [m^2].
pub const SIGMA_SENTINEL: f64 = 1.0e-30;

const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEF: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

/// Gamma function via the Lanczos approximation (g = 7), with reflection below 0.5.
pub fn gamma(x: f64) -> f64 {
    if x < 0.5 {
        PI / ((PI * x).sin() * gamma(1.0 - x))
    } else {
        let x = x - 1.0;
        let t = x + LANCZOS_G + 0.5;
        let mut a = LANCZOS_COEF[0];
        for (i, c) in LANCZOS_COEF.iter().enumerate().skip(1) {
            a += c / (x + i as f64);
        }
        (2.0 * PI).sqrt() * t.powf(x + 0.5) * (-t).exp() * a
    }
}

/// VHS total cross-section σ(vr) = π d² (c_ref² / vr²)^(ω − ½) / Γ(5/2 − ω).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VhsModel {
    d_ref: f64,
    omega: f64,
    /// 2 k T_ref / m
    c_ref_sq: f64,
    /// Γ(5/2 − ω), fixed by the species.
    gamma_factor: f64,
}

impl VhsModel {
    pub fn new(species: &Species) -> Result<Self> {
        let c_ref_sq = 2.0 * BOLTZMANN * species.t_ref / species.mass;
        let gamma_factor = gamma(2.5 - species.omega);
        if !c_ref_sq.is_finite() || c_ref_sq <= 0.0 {
            return Err(Error::InvalidParam(
                "VHS reference speed must be finite and > 0".into(),
            ));
        }
        if !gamma_factor.is_finite() || gamma_factor <= 0.0 {
            return Err(Error::MathError(format!(
                "Γ(2.5 - ω) = {gamma_factor} for ω = {}",
                species.omega
            )));
        }
        Ok(Self {
            d_ref: species.d_ref,
            omega: species.omega,
            c_ref_sq,
            gamma_factor,
        })
    }

    /// Total cross-section at relative speed `vr` [m^2].
    ///
    /// Returns `SIGMA_SENTINEL` for `vr < VR_FLOOR` instead of diverging.
    #[inline]
    pub fn cross_section(&self, vr: f64) -> f64 {
        if vr < VR_FLOOR {
            return SIGMA_SENTINEL;
        }
        PI * self.d_ref * self.d_ref * (self.c_ref_sq / (vr * vr)).powf(self.omega - 0.5)
            / self.gamma_factor
    }
}

/// Expected number of candidate pairs in a cell of `m` particles for one step.
#[inline]
pub fn ntc_candidates(m: usize, fnum: f64, sigma_vr_max: f64, dt: f64, cell_volume: f64) -> f64 {
    if m < 2 {
        return 0.0;
    }
    let m = m as f64;
    m * (m - 1.0) * fnum * sigma_vr_max * dt / (2.0 * cell_volume)
}

/// Stochastic rounding of `candidates`: floor(candidates + u), u ~ U[0, 1).
#[inline]
pub fn ntc_pair_count<R: Rng + ?Sized>(candidates: f64, rng: &mut R) -> usize {
    (candidates + rng.random::<f64>()).floor() as usize
}

/// Counters from collision processing. Summed per step and over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollisionStats {
    /// Candidate pairs drawn.
    pub candidates: u64,
    /// Pairs that passed the acceptance test and were scattered.
    pub accepted: u64,
    /// Pairs skipped because their relative speed was below `VR_FLOOR`.
    pub skipped_near_zero: u64,
    /// Candidates whose σ·vr exceeded `sigma_vr_max`.
    pub overshoots: u64,
}

impl AddAssign for CollisionStats {
    fn add_assign(&mut self, rhs: Self) {
        self.candidates += rhs.candidates;
        self.accepted += rhs.accepted;
        self.skipped_near_zero += rhs.skipped_near_zero;
        self.overshoots += rhs.overshoots;
    }
}

/// Per-cell NTC collision processing.
#[derive(Debug, Clone)]
pub struct CollisionEngine {
    vhs: VhsModel,
    fnum: f64,
    dt: f64,
    cell_volume: f64,
    sigma_vr_max: f64,
    policy: SigmaVrMaxPolicy,
    warned_overshoot: bool,
}

impl CollisionEngine {
    /// Engine for a validated run configuration.
    pub fn new(config: &SimConfig, derived: &Derived) -> Self {
        Self {
            vhs: derived.vhs,
            fnum: derived.fnum,
            dt: config.dt,
            cell_volume: derived.cell_volume,
            sigma_vr_max: derived.sigma_vr_max,
            policy: config.sigma_vr_max_policy,
            warned_overshoot: false,
        }
    }

    /// Engine from explicit scalars.
    pub fn with_params(
        vhs: VhsModel,
        fnum: f64,
        dt: f64,
        cell_volume: f64,
        sigma_vr_max: f64,
        policy: SigmaVrMaxPolicy,
    ) -> Result<Self> {
        for (name, v) in [
            ("fnum", fnum),
            ("dt", dt),
            ("cell_volume", cell_volume),
            ("sigma_vr_max", sigma_vr_max),
        ] {
            if !v.is_finite() || v <= 0.0 {
                return Err(Error::InvalidParam(format!(
                    "{name} must be finite and > 0"
                )));
            }
        }
        Ok(Self {
            vhs,
            fnum,
            dt,
            cell_volume,
            sigma_vr_max,
            policy,
            warned_overshoot: false,
        })
    }

    /// Current σ·vr bound. Only changes under `SigmaVrMaxPolicy::Adaptive`.
    #[inline]
    pub fn sigma_vr_max(&self) -> f64 {
        self.sigma_vr_max
    }

    #[inline]
    pub fn vhs(&self) -> &VhsModel {
        &self.vhs
    }

    /// Expected candidate count for a cell holding `m` particles.
    #[inline]
    pub fn candidates(&self, m: usize) -> f64 {
        ntc_candidates(m, self.fnum, self.sigma_vr_max, self.dt, self.cell_volume)
    }

    /// Run one step of NTC collisions among `members` (indices into `velocities`).
    ///
    /// Only velocities listed in `members` are written. Cells with fewer than two
    /// particles are a no-op.
    pub fn collide_cell<R: Rng + ?Sized>(
        &mut self,
        velocities: &mut [Vec3],
        members: &[usize],
        rng: &mut R,
    ) -> CollisionStats {
        let mut stats = CollisionStats::default();
        let m = members.len();
        if m < 2 {
            return stats;
        }

        let pairs = ntc_pair_count(self.candidates(m), rng);
        for _ in 0..pairs {
            let a = rng.random_range(0..m);
            let mut b = rng.random_range(0..m);
            while b == a {
                b = rng.random_range(0..m);
            }
            stats.candidates += 1;

            let (i, j) = (members[a], members[b]);
            let vr = relative_speed(&velocities[i], &velocities[j]);
            if vr < VR_FLOOR {
                stats.skipped_near_zero += 1;
                continue;
            }

            let sigma_vr = self.vhs.cross_section(vr) * vr;
            let ratio = sigma_vr / self.sigma_vr_max;
            if ratio > 1.0 {
                stats.overshoots += 1;
                self.on_overshoot(sigma_vr);
            }

            if rng.random::<f64>() < ratio.min(1.0) {
                let (vi, vj) = pair_mut(velocities, i, j);
                scatter_isotropic(vi, vj, vr, rng);
                stats.accepted += 1;
            }
        }
        stats
    }

    fn on_overshoot(&mut self, sigma_vr: f64) {
        match self.policy {
            SigmaVrMaxPolicy::Fixed => {
                if !self.warned_overshoot {
                    log::warn!(
                        "σ·vr = {sigma_vr:.3e} exceeds sigma_vr_max = {:.3e}; acceptance clamped to 1 \
                         (raise max_speed_multiplier or use the adaptive policy)",
                        self.sigma_vr_max
                    );
                    self.warned_overshoot = true;
                }
            }
            SigmaVrMaxPolicy::Adaptive => {
                log::debug!(
                    "raising sigma_vr_max from {:.3e} to {sigma_vr:.3e}",
                    self.sigma_vr_max
                );
                self.sigma_vr_max = sigma_vr;
            }
        }
    }
}

/// Elastic equal-mass collision of `v1` and `v2` with isotropic scattering.
pub fn elastic_collision<R: Rng + ?Sized>(v1: &mut Vec3, v2: &mut Vec3, rng: &mut R) {
    let vr = relative_speed(v1, v2);
    scatter_isotropic(v1, v2, vr, rng);
}

/// Replace the pair's relative velocity by one of magnitude `vr` in a random direction,
/// keeping the centre-of-mass velocity.
fn scatter_isotropic<R: Rng + ?Sized>(v1: &mut Vec3, v2: &mut Vec3, vr: f64, rng: &mut R) {
    let cos_t = 2.0 * rng.random::<f64>() - 1.0;
    let sin_t = (1.0 - cos_t * cos_t).max(0.0).sqrt();
    let (sin_p, cos_p) = (2.0 * PI * rng.random::<f64>()).sin_cos();
    let vr_new = [vr * cos_t, vr * sin_t * cos_p, vr * sin_t * sin_p];

    for k in 0..DIM {
        let cm = 0.5 * (v1[k] + v2[k]);
        v1[k] = cm + 0.5 * vr_new[k];
        v2[k] = cm - 0.5 * vr_new[k];
    }
}

#[inline]
fn relative_speed(a: &Vec3, b: &Vec3) -> f64 {
    speed(&[a[0] - b[0], a[1] - b[1], a[2] - b[2]])
}

/// Two distinct mutable elements of `v`.
fn pair_mut(v: &mut [Vec3], i: usize, j: usize) -> (&mut Vec3, &mut Vec3) {
    debug_assert_ne!(i, j);
    if i < j {
        let (lo, hi) = v.split_at_mut(j);
        (&mut lo[i], &mut hi[0])
    } else {
        let (lo, hi) = v.split_at_mut(i);
        (&mut hi[0], &mut lo[j])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::particle::speed_sq;
    use rand::{rngs::StdRng, SeedableRng};

    fn argon_engine(sigma_vr_max: f64, policy: SigmaVrMaxPolicy) -> Result<CollisionEngine> {
        let vhs = VhsModel::new(&Species::argon())?;
        CollisionEngine::with_params(vhs, 1.0e15, 2.0e-11, 2.0e-8, sigma_vr_max, policy)
    }

    #[test]
    fn gamma_matches_known_values() {
        assert!((gamma(1.0) - 1.0).abs() < 1e-12);
        assert!((gamma(5.0) - 24.0).abs() < 1e-9);
        assert!((gamma(0.5) - PI.sqrt()).abs() < 1e-12);
        assert!((gamma(2.5) - 0.75 * PI.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn hard_sphere_limit_is_pi_d_squared() -> Result<()> {
        // ω = 0.5 removes the speed dependence; Γ(2) = 1
        let species = Species {
            omega: 0.5,
            ..Species::argon()
        };
        let vhs = VhsModel::new(&species)?;
        let expected = PI * species.d_ref * species.d_ref;
        for vr in [10.0, 300.0, 5000.0] {
            assert!((vhs.cross_section(vr) - expected).abs() / expected < 1e-12);
        }
        Ok(())
    }

    #[test]
    fn cross_section_at_reference_speed() -> Result<()> {
        let s = Species::argon();
        let vhs = VhsModel::new(&s)?;
        let c_ref = (2.0 * BOLTZMANN * s.t_ref / s.mass).sqrt();
        let expected = PI * s.d_ref * s.d_ref / gamma(2.5 - s.omega);
        let sigma = vhs.cross_section(c_ref);
        assert!((sigma - expected).abs() / expected < 1e-12);
        Ok(())
    }

    #[test]
    fn near_zero_speed_gives_sentinel() -> Result<()> {
        let vhs = VhsModel::new(&Species::argon())?;
        assert_eq!(vhs.cross_section(0.0), SIGMA_SENTINEL);
        assert_eq!(vhs.cross_section(VR_FLOOR * 0.5), SIGMA_SENTINEL);
        Ok(())
    }

    #[test]
    fn candidates_formula() {
        let c = ntc_candidates(10, 2.0, 3.0, 0.5, 4.0);
        // 10 * 9 * 2 * 3 * 0.5 / 8
        assert!((c - 33.75).abs() < 1e-12);
        assert_eq!(ntc_candidates(1, 2.0, 3.0, 0.5, 4.0), 0.0);
        assert_eq!(ntc_candidates(0, 2.0, 3.0, 0.5, 4.0), 0.0);
    }

    #[test]
    fn pair_count_brackets_candidates() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1000 {
            let k = ntc_pair_count(2.3, &mut rng);
            assert!(k == 2 || k == 3);
        }
        assert_eq!(ntc_pair_count(4.0, &mut rng), 4);
    }

    #[test]
    fn head_on_pair_conserves_momentum_and_energy() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let mut v1 = [100.0, 0.0, 0.0];
            let mut v2 = [-100.0, 0.0, 0.0];
            elastic_collision(&mut v1, &mut v2, &mut rng);
            for k in 0..DIM {
                assert!((v1[k] + v2[k]).abs() < 1e-9);
            }
            assert!((speed(&v1) - 100.0).abs() < 1e-9);
            assert!((speed(&v2) - 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn general_pair_conserves_momentum_and_energy() {
        let mut rng = StdRng::seed_from_u64(8);
        for _ in 0..100 {
            let mut v1: Vec3 = [0.0; 3].map(|_: f64| rng.random_range(-500.0..500.0));
            let mut v2: Vec3 = [0.0; 3].map(|_: f64| rng.random_range(-500.0..500.0));
            let (p0, e0) = (
                [v1[0] + v2[0], v1[1] + v2[1], v1[2] + v2[2]],
                speed_sq(&v1) + speed_sq(&v2),
            );
            elastic_collision(&mut v1, &mut v2, &mut rng);
            for k in 0..DIM {
                assert!((v1[k] + v2[k] - p0[k]).abs() < 1e-9);
            }
            assert!((speed_sq(&v1) + speed_sq(&v2) - e0).abs() / e0 < 1e-12);
        }
    }

    #[test]
    fn single_particle_cell_is_noop() -> Result<()> {
        let mut engine = argon_engine(1.0e-15, SigmaVrMaxPolicy::Fixed)?;
        let mut rng = StdRng::seed_from_u64(1);
        let mut v = vec![[300.0, 0.0, 0.0]];
        let stats = engine.collide_cell(&mut v, &[0], &mut rng);
        assert_eq!(stats, CollisionStats::default());
        assert_eq!(v[0], [300.0, 0.0, 0.0]);
        Ok(())
    }

    #[test]
    fn coincident_velocities_are_skipped() -> Result<()> {
        // sigma_vr_max chosen so that several candidates are drawn per call
        let mut engine = argon_engine(1.0e-12, SigmaVrMaxPolicy::Fixed)?;
        let mut rng = StdRng::seed_from_u64(2);
        let mut v = vec![[10.0, 20.0, 30.0]; 4];
        let stats = engine.collide_cell(&mut v, &[0, 1, 2, 3], &mut rng);
        assert!(stats.candidates > 0);
        assert_eq!(stats.skipped_near_zero, stats.candidates);
        assert_eq!(stats.accepted, 0);
        assert!(v.iter().all(|x| *x == [10.0, 20.0, 30.0]));
        Ok(())
    }

    #[test]
    fn only_members_are_touched() -> Result<()> {
        let mut engine = argon_engine(1.0e-12, SigmaVrMaxPolicy::Fixed)?;
        let mut rng = StdRng::seed_from_u64(9);
        let mut v: Vec<Vec3> = (0..6).map(|i| [100.0 * i as f64, -50.0, 7.0]).collect();
        let before = v.clone();
        engine.collide_cell(&mut v, &[1, 3, 4], &mut rng);
        for i in [0, 2, 5] {
            assert_eq!(v[i], before[i]);
        }
        Ok(())
    }

    /// Shrink the cell volume so a two-particle cell draws exactly `count` candidates.
    fn force_candidates(engine: &mut CollisionEngine, count: f64) {
        engine.cell_volume = 2.0 * engine.fnum * engine.sigma_vr_max * engine.dt / (2.0 * count);
    }

    #[test]
    fn fixed_policy_counts_overshoot_and_keeps_bound() -> Result<()> {
        let tiny = 1.0e-30;
        let mut engine = argon_engine(tiny, SigmaVrMaxPolicy::Fixed)?;
        force_candidates(&mut engine, 3.0);
        let mut rng = StdRng::seed_from_u64(4);
        let mut v = vec![[400.0, 0.0, 0.0], [-400.0, 0.0, 0.0]];
        let stats = engine.collide_cell(&mut v, &[0, 1], &mut rng);
        assert_eq!(stats.candidates, 3);
        assert_eq!(stats.overshoots, 3);
        // clamped ratio of 1 always accepts
        assert_eq!(stats.accepted, 3);
        assert_eq!(engine.sigma_vr_max(), tiny);
        Ok(())
    }

    #[test]
    fn adaptive_policy_raises_bound() -> Result<()> {
        let tiny = 1.0e-30;
        let mut engine = argon_engine(tiny, SigmaVrMaxPolicy::Adaptive)?;
        force_candidates(&mut engine, 3.0);
        let mut rng = StdRng::seed_from_u64(4);
        let mut v = vec![[400.0, 0.0, 0.0], [-400.0, 0.0, 0.0]];
        let stats = engine.collide_cell(&mut v, &[0, 1], &mut rng);
        assert_eq!(stats.candidates, 3);
        assert!(stats.overshoots >= 1);
        // |vr| survives each collision, so the bound settles at σ(800)·800
        let expected = engine.vhs().cross_section(800.0) * 800.0;
        assert!((engine.sigma_vr_max() - expected).abs() / expected < 1e-9);
        Ok(())
    }
}
