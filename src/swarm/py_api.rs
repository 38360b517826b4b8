use super::scheduler::FlockSimulation;
use crate::core::{NeighborStrategy, SimError, SimulationConfig};
use pyo3::exceptions::{PyIndexError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

fn to_py_err(e: SimError) -> PyErr {
    match e {
        SimError::InvalidConfig(_) | SimError::InvalidTimestep(_) | SimError::Json(_) => {
            PyValueError::new_err(e.to_string())
        }
        SimError::Cancelled { .. } | SimError::ThreadPool(_) => PyRuntimeError::new_err(e.to_string()),
    }
}

fn out_of_range(i: usize, n: usize) -> PyErr {
    PyIndexError::new_err(format!("agent index {} out of range for {} agents", i, n))
}

#[pyclass]
pub struct PyFlock {
    sim: FlockSimulation,
}

#[pymethods]
impl PyFlock {
    #[new]
    #[pyo3(signature = (agent_count=200, flock_count=3, seed=None, batched=true))]
    pub fn new(agent_count: usize, flock_count: usize, seed: Option<u64>, batched: bool) -> PyResult<Self> {
        let mut config = SimulationConfig::new(agent_count, flock_count);
        config.seed = seed;
        config.strategy = if batched {
            NeighborStrategy::Batched
        } else {
            NeighborStrategy::AllPairs
        };
        Self::build(config)
    }

    /// Build from a JSON configuration document.
    #[staticmethod]
    pub fn from_json(json: &str) -> PyResult<Self> {
        Self::build(SimulationConfig::from_json(json).map_err(to_py_err)?)
    }

    /// Advance by `dt` seconds. Returns the completed tick number.
    pub fn tick(&mut self, py: Python<'_>, dt: f32) -> PyResult<u64> {
        let sim = &mut self.sim;
        py.allow_threads(|| sim.tick(dt))
            .map(|s| s.tick)
            .map_err(to_py_err)
    }

    /// Advance by the configured timestep.
    pub fn step(&mut self, py: Python<'_>) -> PyResult<u64> {
        let sim = &mut self.sim;
        py.allow_threads(|| sim.step())
            .map(|s| s.tick)
            .map_err(to_py_err)
    }

    pub fn agent_count(&self) -> usize {
        self.sim.agent_count()
    }

    pub fn tick_count(&self) -> u64 {
        self.sim.tick_count()
    }

    pub fn position(&self, i: usize) -> PyResult<(f32, f32, f32)> {
        self.sim
            .try_position(i)
            .map(|p| (p.x, p.y, p.z))
            .ok_or_else(|| out_of_range(i, self.sim.agent_count()))
    }

    pub fn velocity(&self, i: usize) -> PyResult<(f32, f32, f32)> {
        self.sim
            .try_velocity(i)
            .map(|v| (v.x, v.y, v.z))
            .ok_or_else(|| out_of_range(i, self.sim.agent_count()))
    }

    pub fn flock_id(&self, i: usize) -> PyResult<u32> {
        self.sim
            .try_flock_id(i)
            .ok_or_else(|| out_of_range(i, self.sim.agent_count()))
    }

    /// Rotation (x, y, z, w) turning +Y onto the agent's heading.
    pub fn orientation(&self, i: usize) -> PyResult<(f32, f32, f32, f32)> {
        if i >= self.sim.agent_count() {
            return Err(out_of_range(i, self.sim.agent_count()));
        }
        let q = self.sim.orientation(i);
        Ok((q.x, q.y, q.z, q.w))
    }

    /// Flat `[x0, y0, z0, x1, ...]` copy of the latest positions.
    pub fn positions(&self) -> Vec<f32> {
        self.sim
            .positions()
            .iter()
            .flat_map(|p| p.to_array())
            .collect()
    }

    pub fn velocities(&self) -> Vec<f32> {
        self.sim
            .velocities()
            .iter()
            .flat_map(|v| v.to_array())
            .collect()
    }

    /// Tick counter and population summary for dashboards.
    pub fn get_state(&self) -> PyResult<PyObject> {
        Python::with_gil(|py| {
            let dict = PyDict::new_bound(py);
            let n = self.sim.agent_count().max(1) as f32;
            let mean_speed: f32 = self.sim.velocities().iter().map(|v| v.length()).sum::<f32>() / n;

            dict.set_item("tick", self.sim.tick_count())?;
            dict.set_item("agent_count", self.sim.agent_count())?;
            dict.set_item("flock_count", self.sim.flock_count())?;
            dict.set_item("mean_speed", mean_speed)?;
            Ok(dict.into())
        })
    }
}

impl PyFlock {
    fn build(config: SimulationConfig) -> PyResult<Self> {
        Ok(Self {
            sim: FlockSimulation::new(config).map_err(to_py_err)?,
        })
    }
}
