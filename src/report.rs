//! Post-run statistics over the sampled speeds.
//!
//! Nothing here touches simulation state: the driver hands over the speed samples
//! and a `RunSummary`, and these helpers compare them with Maxwell-Boltzmann.

use crate::config::BOLTZMANN;
use crate::core::collision::CollisionStats;
use crate::error::{Error, Result};
use std::f64::consts::PI;
use std::fmt;
use std::io::Write;

/// Maxwell-Boltzmann speed density f(v) at `temperature` for particles of `mass` [s/m].
pub fn maxwell_boltzmann_speed_pdf(v: f64, temperature: f64, mass: f64) -> f64 {
    if v < 0.0 {
        return 0.0;
    }
    let a = mass / (2.0 * BOLTZMANN * temperature);
    4.0 * PI * (a / PI).powf(1.5) * v * v * (-a * v * v).exp()
}

/// Temperature whose mean kinetic energy matches the samples: m⟨v²⟩ / (3k).
pub fn fitted_temperature(samples: &[f64], mass: f64) -> Result<f64> {
    if samples.is_empty() {
        return Err(Error::InsufficientSamples(
            "no speed samples to fit a temperature".into(),
        ));
    }
    let mean_sq = samples.iter().map(|v| v * v).sum::<f64>() / samples.len() as f64;
    let t = mass * mean_sq / (3.0 * BOLTZMANN);
    if !t.is_finite() {
        return Err(Error::MathError(format!("fitted temperature is {t}")));
    }
    Ok(t)
}

/// Equal-width histogram of speeds.
#[derive(Debug, Clone)]
pub struct SpeedHistogram {
    /// Bin edges, `bins + 1` values.
    pub edges: Vec<f64>,
    pub counts: Vec<u64>,
    /// Samples that fell inside the range.
    pub total: u64,
}

impl SpeedHistogram {
    /// Bin `samples` into `bins` equal bins over `range`, or over [0, max] when `None`.
    /// The upper edge is inclusive.
    pub fn from_samples(samples: &[f64], bins: usize, range: Option<(f64, f64)>) -> Result<Self> {
        if bins == 0 {
            return Err(Error::InvalidParam("bins must be > 0".into()));
        }
        if samples.is_empty() {
            return Err(Error::InsufficientSamples("no speed samples to bin".into()));
        }
        let (lo, hi) = match range {
            Some(r) => r,
            None => (0.0, samples.iter().copied().fold(0.0, f64::max)),
        };
        if !lo.is_finite() || !hi.is_finite() || hi <= lo {
            return Err(Error::InsufficientSamples(format!(
                "degenerate histogram range [{lo}, {hi}]"
            )));
        }

        let width = (hi - lo) / bins as f64;
        let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();
        let mut counts = vec![0u64; bins];
        let mut total = 0u64;
        for &v in samples {
            if v < lo || v > hi {
                continue;
            }
            let b = (((v - lo) / width) as usize).min(bins - 1);
            counts[b] += 1;
            total += 1;
        }
        Ok(Self {
            edges,
            counts,
            total,
        })
    }

    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    pub fn centers(&self) -> Vec<f64> {
        self.edges.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect()
    }

    /// Normalised density so that Σ density·width = 1 over the range.
    pub fn density(&self) -> Vec<f64> {
        if self.total == 0 {
            return vec![0.0; self.bins()];
        }
        self.edges
            .windows(2)
            .zip(&self.counts)
            .map(|(w, &c)| c as f64 / (self.total as f64 * (w[1] - w[0])))
            .collect()
    }

    /// Kullback-Leibler divergence D(hist ‖ Maxwell-Boltzmann), both restricted to the range.
    pub fn kl_divergence(&self, temperature: f64, mass: f64) -> Result<f64> {
        if self.total == 0 {
            return Err(Error::InsufficientSamples("histogram is empty".into()));
        }
        let q: Vec<f64> = self
            .edges
            .windows(2)
            .map(|w| {
                let mid = 0.5 * (w[0] + w[1]);
                maxwell_boltzmann_speed_pdf(mid, temperature, mass) * (w[1] - w[0])
            })
            .collect();
        let q_total: f64 = q.iter().sum();
        if !q_total.is_finite() || q_total <= 0.0 {
            return Err(Error::MathError(
                "Maxwell-Boltzmann reference has no mass over the histogram range".into(),
            ));
        }

        let mut dkl = 0.0;
        for (&c, &qb) in self.counts.iter().zip(&q) {
            if c == 0 {
                continue;
            }
            let p = c as f64 / self.total as f64;
            let qn = (qb / q_total).max(f64::MIN_POSITIVE);
            dkl += p * (p / qn).ln();
        }
        Ok(dkl.max(0.0))
    }

    /// Write `speed,density,maxwell_boltzmann` rows, one per bin.
    pub fn write_histogram_csv<W: Write>(
        &self,
        mut out: W,
        temperature: f64,
        mass: f64,
    ) -> Result<()> {
        writeln!(out, "speed,density,maxwell_boltzmann")?;
        for (c, d) in self.centers().into_iter().zip(self.density()) {
            writeln!(
                out,
                "{c},{d},{}",
                maxwell_boltzmann_speed_pdf(c, temperature, mass)
            )?;
        }
        Ok(())
    }
}

/// Scalar outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub num_particles: usize,
    pub steps: usize,
    pub initial_temperature: f64,
    pub final_temperature: f64,
    pub initial_kinetic_energy: f64,
    pub final_kinetic_energy: f64,
    pub collisions: CollisionStats,
    pub snapshots: usize,
    pub samples: usize,
    /// σ·vr bound at the end of the run.
    pub sigma_vr_max: f64,
}

impl RunSummary {
    /// Relative change of total kinetic energy, in percent.
    pub fn energy_change_percent(&self) -> f64 {
        if self.initial_kinetic_energy == 0.0 {
            return 0.0;
        }
        100.0 * (self.final_kinetic_energy - self.initial_kinetic_energy)
            / self.initial_kinetic_energy
    }

    /// Accepted collisions per particle over the run.
    pub fn collisions_per_particle(&self) -> f64 {
        if self.num_particles == 0 {
            return 0.0;
        }
        2.0 * self.collisions.accepted as f64 / self.num_particles as f64
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "particles:             {}", self.num_particles)?;
        writeln!(f, "steps:                 {}", self.steps)?;
        writeln!(
            f,
            "initial temperature:   {:.3} K",
            self.initial_temperature
        )?;
        writeln!(f, "final temperature:     {:.3} K", self.final_temperature)?;
        writeln!(
            f,
            "kinetic energy change: {:.3e} %",
            self.energy_change_percent()
        )?;
        writeln!(
            f,
            "collisions:            {} accepted / {} candidates ({:.2} per particle)",
            self.collisions.accepted,
            self.collisions.candidates,
            self.collisions_per_particle()
        )?;
        if self.collisions.overshoots > 0 {
            writeln!(f, "sigma_vr_max overshoots: {}", self.collisions.overshoots)?;
        }
        write!(
            f,
            "speed samples:         {} ({} snapshots)",
            self.samples, self.snapshots
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Species;

    #[test]
    fn pdf_integrates_to_one() {
        let m = Species::argon().mass;
        let t = 273.0;
        let dv = 0.5;
        let total: f64 = (0..8000)
            .map(|i| (i as f64 + 0.5) * dv)
            .map(|v| maxwell_boltzmann_speed_pdf(v, t, m) * dv)
            .sum();
        assert!((total - 1.0).abs() < 1e-6, "∫f = {total}");
    }

    #[test]
    fn pdf_peaks_at_most_probable_speed() {
        let m = Species::argon().mass;
        let t = 273.0;
        let vp = (2.0 * BOLTZMANN * t / m).sqrt();
        let f = |v| maxwell_boltzmann_speed_pdf(v, t, m);
        assert!(f(vp) > f(vp * 0.98));
        assert!(f(vp) > f(vp * 1.02));
    }

    #[test]
    fn fitted_temperature_inverts_mean_energy() -> Result<()> {
        let m = Species::argon().mass;
        let v = (3.0 * BOLTZMANN * 300.0 / m).sqrt();
        let t = fitted_temperature(&[v; 10], m)?;
        assert!((t - 300.0).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn empty_samples_are_insufficient() {
        assert!(matches!(
            fitted_temperature(&[], 1.0),
            Err(Error::InsufficientSamples(_))
        ));
        assert!(matches!(
            SpeedHistogram::from_samples(&[], 10, None),
            Err(Error::InsufficientSamples(_))
        ));
    }

    #[test]
    fn histogram_counts_all_samples_in_range() -> Result<()> {
        let samples = [0.0, 1.0, 2.0, 3.0, 4.0, 4.0];
        let h = SpeedHistogram::from_samples(&samples, 4, None)?;
        assert_eq!(h.edges.len(), 5);
        assert_eq!(h.counts, vec![1, 1, 1, 3]);
        assert_eq!(h.total, 6);
        let area: f64 = h.density().iter().map(|d| d * 1.0).sum();
        assert!((area - 1.0).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn explicit_range_drops_outliers() -> Result<()> {
        let h = SpeedHistogram::from_samples(&[-1.0, 0.5, 1.5, 9.0], 2, Some((0.0, 2.0)))?;
        assert_eq!(h.counts, vec![1, 1]);
        assert_eq!(h.total, 2);
        Ok(())
    }

    #[test]
    fn kl_is_small_for_matching_shape() -> Result<()> {
        // deterministic quantiles of the MB distribution via its pdf
        let m = Species::argon().mass;
        let t = 273.0;
        let dv = 1.0;
        let mut samples = Vec::new();
        for i in 0..2000 {
            let v = (i as f64 + 0.5) * dv;
            let n = (maxwell_boltzmann_speed_pdf(v, t, m) * dv * 1.0e5).round() as usize;
            samples.extend(std::iter::repeat_n(v, n));
        }
        let h = SpeedHistogram::from_samples(&samples, 40, Some((0.0, 2000.0)))?;
        assert!(h.kl_divergence(t, m)? < 1e-3);
        assert!(h.kl_divergence(2.0 * t, m)? > 1e-2);
        Ok(())
    }

    #[test]
    fn csv_has_header_and_one_row_per_bin() -> Result<()> {
        let h = SpeedHistogram::from_samples(&[100.0, 200.0, 300.0], 3, None)?;
        let mut buf = Vec::new();
        h.write_histogram_csv(&mut buf, 273.0, Species::argon().mass)?;
        let text = String::from_utf8(buf)
            .map_err(|e| Error::MathError(e.to_string()))?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "speed,density,maxwell_boltzmann");
        assert_eq!(lines.len(), 4);
        Ok(())
    }

    #[test]
    fn energy_change_percent() {
        let s = RunSummary {
            num_particles: 10,
            steps: 1,
            initial_temperature: 1.0,
            final_temperature: 1.0,
            initial_kinetic_energy: 200.0,
            final_kinetic_energy: 201.0,
            collisions: CollisionStats::default(),
            snapshots: 0,
            samples: 0,
            sigma_vr_max: 1.0,
        };
        assert!((s.energy_change_percent() - 0.5).abs() < 1e-12);
        assert!(s.to_string().contains("final temperature"));
    }
}
