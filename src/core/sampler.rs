use crate::core::particle::ParticleStore;
use crate::error::{Error, Result};

/// Accumulates particle speeds after a warm-up, every `interval` steps.
#[derive(Debug, Clone)]
pub struct Sampler {
    warmup_step: usize,
    interval: usize,
    samples: Vec<f64>,
    snapshots: usize,
}

impl Sampler {
    pub fn new(warmup_step: usize, interval: usize) -> Result<Self> {
        if interval == 0 {
            return Err(Error::InvalidParam("sample_interval must be > 0".into()));
        }
        Ok(Self {
            warmup_step,
            interval,
            samples: Vec::new(),
            snapshots: 0,
        })
    }

    #[inline]
    pub fn should_sample(&self, step: usize) -> bool {
        step >= self.warmup_step && step.is_multiple_of(self.interval)
    }

    /// Append every particle's speed if `step` is a sampling step. Returns whether it was.
    pub fn record(&mut self, step: usize, store: &ParticleStore) -> bool {
        if !self.should_sample(step) {
            return false;
        }
        self.samples.extend(store.speeds());
        self.snapshots += 1;
        true
    }

    /// All sampled speeds so far [m/s].
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f64> {
        self.samples
    }

    /// Number of snapshots taken.
    pub fn snapshots(&self) -> usize {
        self.snapshots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cadence_respects_warmup_and_interval() -> Result<()> {
        let s = Sampler::new(10, 4)?;
        let hits: Vec<usize> = (0..30).filter(|&k| s.should_sample(k)).collect();
        assert_eq!(hits, vec![12, 16, 20, 24, 28]);
        Ok(())
    }

    #[test]
    fn record_appends_speeds() -> Result<()> {
        let store = ParticleStore::new(
            vec![0.0, 0.5],
            vec![[3.0, 4.0, 0.0], [0.0, 0.0, 2.0]],
            1.0,
        )?;
        let mut s = Sampler::new(0, 2)?;
        assert!(s.record(0, &store));
        assert!(!s.record(1, &store));
        assert!(s.record(2, &store));
        assert_eq!(s.snapshots(), 2);
        assert_eq!(s.samples(), &[5.0, 2.0, 5.0, 2.0]);
        Ok(())
    }

    #[test]
    fn zero_interval_rejected() {
        assert!(Sampler::new(0, 0).is_err());
    }
}
