use numpy::ndarray::{Array1, Array2};
use numpy::{IntoPyArray, PyArray1, PyArray2};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::config::SimConfig;
use crate::core::particle::DIM;
use crate::core::Simulation;

fn py_err<E: ToString>(e: E) -> PyErr {
    PyValueError::new_err(e.to_string())
}

/// Python-facing wrapper around the Rust DSMC simulation.
///
/// - __new__(config_json=None, seed=None)
/// - step() / run()
/// - get_positions() -> np.ndarray, shape (N,)
/// - get_velocities() -> np.ndarray, shape (N, 3)
/// - get_speed_samples() -> np.ndarray, shape (M,)
#[pyclass]
pub struct DsmcSim {
    sim: Simulation,
}

#[pymethods]
impl DsmcSim {
    /// Build a simulation from an optional JSON configuration document.
    ///
    /// Parameters
    /// - config_json: JSON object with any subset of the configuration fields
    /// - seed: RNG seed (int); overrides the seed in `config_json` when given
    ///
    /// Errors: raises ValueError on malformed or invalid configuration.
    #[new]
    #[pyo3(signature = (config_json=None, seed=None))]
    fn new(config_json: Option<&str>, seed: Option<u64>) -> PyResult<Self> {
        let mut config = match config_json {
            Some(s) => SimConfig::from_json_str(s).map_err(py_err)?,
            None => SimConfig::default(),
        };
        if seed.is_some() {
            config.seed = seed;
        }
        let sim = Simulation::new(config).map_err(py_err)?;
        Ok(Self { sim })
    }

    /// Advance one step; returns the number of collisions it performed.
    fn step(&mut self) -> u64 {
        self.sim.step().accepted
    }

    /// Run the remaining steps (releases the GIL during computation).
    ///
    /// Returns: (initial_T, final_T, energy_change_percent, collisions)
    fn run(&mut self, py: Python<'_>) -> (f64, f64, f64, u64) {
        let s = py.detach(|| self.sim.run());
        (
            s.initial_temperature,
            s.final_temperature,
            s.energy_change_percent(),
            s.collisions.accepted,
        )
    }

    /// Return positions as a NumPy array of shape (N,), dtype=float64.
    fn get_positions<'py>(&self, py: Python<'py>) -> PyResult<Py<PyArray1<f64>>> {
        let arr = Array1::from(self.sim.positions().to_vec());
        Ok(arr.into_pyarray(py).to_owned().into())
    }

    /// Return velocities as a NumPy array of shape (N, 3), dtype=float64.
    fn get_velocities<'py>(&self, py: Python<'py>) -> PyResult<Py<PyArray2<f64>>> {
        let n = self.sim.num_particles();
        let mut arr = Array2::<f64>::zeros((n, DIM));
        for (i, v) in self.sim.velocities().iter().enumerate() {
            for k in 0..DIM {
                arr[[i, k]] = v[k];
            }
        }
        Ok(arr.into_pyarray(py).to_owned().into())
    }

    /// Return every sampled speed so far as a NumPy array, dtype=float64.
    fn get_speed_samples<'py>(&self, py: Python<'py>) -> PyResult<Py<PyArray1<f64>>> {
        let arr = Array1::from(self.sim.samples().to_vec());
        Ok(arr.into_pyarray(py).to_owned().into())
    }

    fn get_temperature(&self) -> f64 {
        self.sim.temperature()
    }

    fn get_kinetic_energy(&self) -> f64 {
        self.sim.kinetic_energy()
    }

    fn get_step(&self) -> usize {
        self.sim.current_step()
    }

    /// Human-readable run summary.
    fn summary(&self) -> String {
        self.sim.summary().to_string()
    }
}

/// The dsmcsim Python module entry point.
#[pymodule]
fn dsmcsim(_py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<DsmcSim>()?;
    Ok(())
}
