use crate::core::particle::ParticleStore;

/// Free-flight position update along x with periodic wraparound.
#[derive(Debug, Clone, Copy)]
pub struct Advector {
    dt: f64,
    length: f64,
}

impl Advector {
    pub fn new(dt: f64, length: f64) -> Self {
        Self { dt, length }
    }

    /// Move every particle by `v_x * dt` and wrap into [0, length).
    pub fn advance(&self, store: &mut ParticleStore) {
        for (x, v) in store.positions.iter_mut().zip(&store.velocities) {
            *x = wrap_periodic(*x + v[0] * self.dt, self.length);
        }
    }
}

/// True modulo into [0, length). Never negative, never equal to `length`.
#[inline]
pub fn wrap_periodic(x: f64, length: f64) -> f64 {
    let w = x.rem_euclid(length);
    // rem_euclid of a tiny negative value can round up to exactly `length`
    if w >= length { 0.0 } else { w }
}
