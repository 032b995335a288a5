//! Python bindings for the lab-core physics lab.
//!
//! Provides a simple Python API:
//!
//! ```python
//! import time
//! from physics_lab import Lab
//!
//! lab = Lab()
//! lab.select("projectile")
//! lab.set_projectile_params(speed=60.0, angle=30.0)
//! lab.set_running(True)
//!
//! while "landed" not in lab.take_events():
//!     print(lab.frame(time.monotonic()))
//! ```

use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use lab_core::config::{ConfigError, LabConfig, PresetLoader};
use lab_core::lab::{
    Difficulty, Experiment, ExperimentParams, Lab as CoreLab, LabEvent, MeasurementLog,
    Simulation,
};
use lab_core::types::{Measurement, Vec2 as CoreVec2};

fn to_py_err(err: ConfigError) -> PyErr {
    match err {
        ConfigError::Io(e) => PyIOError::new_err(e.to_string()),
        other => PyValueError::new_err(other.to_string()),
    }
}

fn parse_experiment(id: &str) -> PyResult<Experiment> {
    Experiment::from_id(id).map_err(to_py_err)
}

fn event_name(event: LabEvent) -> &'static str {
    match event {
        LabEvent::Launched => "launched",
        LabEvent::Landed => "landed",
        LabEvent::Completed => "completed",
        LabEvent::Restarted => "restarted",
    }
}

fn difficulty_name(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Beginner => "Beginner",
        Difficulty::Intermediate => "Intermediate",
        Difficulty::Advanced => "Advanced",
    }
}

/// 2D vector for positions and samples.
#[pyclass]
#[derive(Clone, Copy)]
pub struct Vec2 {
    #[pyo3(get, set)]
    pub x: f64,
    #[pyo3(get, set)]
    pub y: f64,
}

#[pymethods]
impl Vec2 {
    #[new]
    fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn __repr__(&self) -> String {
        format!("Vec2({:.4}, {:.4})", self.x, self.y)
    }

    fn magnitude(&self) -> f64 {
        CoreVec2::from(*self).magnitude()
    }

    fn to_tuple(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

impl From<CoreVec2> for Vec2 {
    fn from(v: CoreVec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

impl From<Vec2> for CoreVec2 {
    fn from(v: Vec2) -> Self {
        CoreVec2::new(v.x, v.y)
    }
}

fn points(values: impl IntoIterator<Item = CoreVec2>) -> Vec<Vec2> {
    values.into_iter().map(Vec2::from).collect()
}

fn measurement_dict<'py>(py: Python<'py>, measurement: &Measurement) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    match measurement {
        Measurement::Pendulum(m) => {
            dict.set_item("kind", "pendulum")?;
            dict.set_item("period", m.period)?;
            dict.set_item("frequency", m.frequency)?;
            dict.set_item("velocity", m.velocity)?;
            dict.set_item("acceleration", m.acceleration)?;
            dict.set_item("energy", m.energy)?;
        }
        Measurement::Projectile(m) => {
            dict.set_item("kind", "projectile")?;
            dict.set_item("time", m.time)?;
            dict.set_item("distance", m.distance)?;
            dict.set_item("height", m.height)?;
            dict.set_item("speed", m.speed)?;
            dict.set_item("angle", m.angle)?;
            dict.set_item("gravity", m.gravity)?;
        }
        Measurement::FreeFall(m) => {
            dict.set_item("kind", "free-fall")?;
            dict.set_item("height", m.height)?;
            dict.set_item("velocity", m.velocity)?;
            dict.set_item("acceleration", m.acceleration)?;
            dict.set_item("elapsed", m.elapsed)?;
            dict.set_item("finished", m.finished)?;
        }
        Measurement::OhmsLaw(m) => {
            dict.set_item("kind", "ohms-law")?;
            dict.set_item("voltage", m.voltage)?;
            dict.set_item("resistance", m.resistance)?;
            dict.set_item("current", m.current)?;
            dict.set_item("power", m.power)?;
        }
        Measurement::Waves(m) => {
            dict.set_item("kind", "waves")?;
            dict.set_item("phase", m.phase)?;
            dict.set_item("phase_rate", m.phase_rate)?;
            dict.set_item("displacement_at_origin", m.displacement_at_origin)?;
            dict.set_item("peak_displacement", m.peak_displacement)?;
        }
    }
    Ok(dict)
}

/// The lab host.
///
/// Call `frame(now)` once per animation frame with a monotonic timestamp in
/// seconds. Parameter setters only change the fields given; the change takes
/// effect at the next frame.
#[pyclass(name = "Lab")]
pub struct PyLab {
    lab: CoreLab,
    log: MeasurementLog,
}

#[pymethods]
impl PyLab {
    /// Create a paused lab showing the pendulum. `config` is an optional
    /// path to a lab YAML file.
    #[new]
    #[pyo3(signature = (config=None))]
    fn new(config: Option<&str>) -> PyResult<Self> {
        let config = match config {
            Some(path) => LabConfig::load(path).map_err(to_py_err)?,
            None => LabConfig::default(),
        };
        Ok(Self {
            lab: CoreLab::new(config),
            log: MeasurementLog::new(config.measurement_log_capacity),
        })
    }

    /// Available experiments as (id, name, description, difficulty).
    #[staticmethod]
    fn experiments() -> Vec<(&'static str, &'static str, &'static str, &'static str)> {
        Experiment::ALL
            .iter()
            .map(|e| (e.id(), e.name(), e.description(), difficulty_name(e.difficulty())))
            .collect()
    }

    /// Id of the active experiment.
    #[getter]
    fn experiment(&self) -> &'static str {
        self.lab.experiment().id()
    }

    #[getter]
    fn running(&self) -> bool {
        self.lab.is_running()
    }

    fn select(&mut self, experiment: &str) -> PyResult<()> {
        self.lab.select(parse_experiment(experiment)?);
        self.log.clear();
        Ok(())
    }

    fn set_running(&mut self, running: bool) {
        self.lab.set_running(running);
    }

    fn reset(&mut self) {
        self.lab.reset();
    }

    fn handle_resize(&mut self, width: f64) {
        self.lab.handle_resize(width);
    }

    /// Advance one frame. Returns the measurement recorded this frame, or
    /// None while paused.
    fn frame<'py>(&mut self, py: Python<'py>, now: f64) -> PyResult<Option<Bound<'py, PyDict>>> {
        self.lab.frame(now, &mut self.log);
        if self.lab.is_running() {
            self.latest(py)
        } else {
            Ok(None)
        }
    }

    #[pyo3(signature = (length=None, mass=None, angle=None, gravity=None, damping=None))]
    fn set_pendulum_params(
        &mut self,
        length: Option<f64>,
        mass: Option<f64>,
        angle: Option<f64>,
        gravity: Option<f64>,
        damping: Option<f64>,
    ) {
        let mut p = self.lab.queued_params().pendulum;
        p.length = length.unwrap_or(p.length);
        p.mass = mass.unwrap_or(p.mass);
        p.angle = angle.unwrap_or(p.angle);
        p.gravity = gravity.unwrap_or(p.gravity);
        p.damping = damping.unwrap_or(p.damping);
        self.lab.update_params(ExperimentParams::Pendulum(p));
    }

    #[pyo3(signature = (speed=None, angle=None, gravity=None))]
    fn set_projectile_params(
        &mut self,
        speed: Option<f64>,
        angle: Option<f64>,
        gravity: Option<f64>,
    ) {
        let mut p = self.lab.queued_params().projectile;
        p.speed = speed.unwrap_or(p.speed);
        p.angle = angle.unwrap_or(p.angle);
        p.gravity = gravity.unwrap_or(p.gravity);
        self.lab.update_params(ExperimentParams::Projectile(p));
    }

    #[pyo3(signature = (height=None, gravity=None))]
    fn set_free_fall_params(&mut self, height: Option<f64>, gravity: Option<f64>) {
        let mut p = self.lab.queued_params().free_fall;
        p.height = height.unwrap_or(p.height);
        p.gravity = gravity.unwrap_or(p.gravity);
        self.lab.update_params(ExperimentParams::FreeFall(p));
    }

    #[pyo3(signature = (voltage=None, resistance=None))]
    fn set_ohms_law_params(&mut self, voltage: Option<f64>, resistance: Option<f64>) {
        let mut p = self.lab.queued_params().ohms_law;
        p.voltage = voltage.unwrap_or(p.voltage);
        p.resistance = resistance.unwrap_or(p.resistance);
        self.lab.update_params(ExperimentParams::OhmsLaw(p));
    }

    #[pyo3(signature = (freq1=None, freq2=None, amp1=None, amp2=None))]
    fn set_wave_params(
        &mut self,
        freq1: Option<f64>,
        freq2: Option<f64>,
        amp1: Option<f64>,
        amp2: Option<f64>,
    ) {
        let mut p = self.lab.queued_params().waves;
        p.freq1 = freq1.unwrap_or(p.freq1);
        p.freq2 = freq2.unwrap_or(p.freq2);
        p.amp1 = amp1.unwrap_or(p.amp1);
        p.amp2 = amp2.unwrap_or(p.amp2);
        self.lab.update_params(ExperimentParams::Waves(p));
    }

    /// Queue the preset `<directory>/<experiment>/<name>.yaml`.
    fn load_preset(&mut self, directory: &str, experiment: &str, name: &str) -> PyResult<()> {
        let params = PresetLoader::new(directory)
            .load_params(parse_experiment(experiment)?, name)
            .map_err(to_py_err)?;
        self.lab.update_params(params);
        Ok(())
    }

    #[staticmethod]
    fn list_presets(directory: &str, experiment: &str) -> PyResult<Vec<String>> {
        PresetLoader::new(directory)
            .list_presets(parse_experiment(experiment)?)
            .map_err(to_py_err)
    }

    /// Latest measurement as a dict, or None before the first running frame.
    fn latest<'py>(&self, py: Python<'py>) -> PyResult<Option<Bound<'py, PyDict>>> {
        self.log
            .latest()
            .map(|m| measurement_dict(py, m))
            .transpose()
    }

    /// Display record: period, frequency, velocity, acceleration, energy.
    fn readout<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let readout = self.log.readout();
        let dict = PyDict::new(py);
        dict.set_item("period", readout.period)?;
        dict.set_item("frequency", readout.frequency)?;
        dict.set_item("velocity", readout.velocity)?;
        dict.set_item("acceleration", readout.acceleration)?;
        dict.set_item("energy", readout.energy)?;
        Ok(dict)
    }

    /// Events since the last call: "launched", "landed", "completed",
    /// "restarted".
    fn take_events(&mut self) -> Vec<&'static str> {
        self.log.take_events().into_iter().map(event_name).collect()
    }

    /// Pendulum bob relative to the pivot (m, y up).
    fn bob_position(&self) -> Option<Vec2> {
        match self.lab.simulation() {
            Simulation::Pendulum(p) => Some(p.bob_position().into()),
            _ => None,
        }
    }

    /// Recent pendulum bob or projectile positions, oldest first.
    fn trail(&self) -> Vec<Vec2> {
        match self.lab.simulation() {
            Simulation::Pendulum(p) => points(p.state().trail.iter().copied()),
            Simulation::Projectile(p) => points(p.state().trail.iter().copied()),
            _ => vec![],
        }
    }

    fn projectile_position(&self) -> Option<Vec2> {
        match self.lab.simulation() {
            Simulation::Projectile(p) => Some(p.state().position.into()),
            _ => None,
        }
    }

    fn predicted_trajectory(&self) -> Vec<Vec2> {
        match self.lab.simulation() {
            Simulation::Projectile(p) => points(p.predicted_trajectory()),
            _ => vec![],
        }
    }

    fn wave_samples(&self) -> Vec<Vec2> {
        match self.lab.simulation() {
            Simulation::Waves(w) => points(w.samples()),
            _ => vec![],
        }
    }

    /// Flow marker offsets along the circuit path.
    fn flow_markers(&self) -> Vec<f64> {
        match self.lab.simulation() {
            Simulation::OhmsLaw(c) => c.markers().positions.clone(),
            _ => vec![],
        }
    }

    /// Get current state as dict for easy inspection.
    fn state_dict<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let dict = measurement_dict(py, &self.lab.simulation().measure().sanitized())?;
        dict.set_item("experiment", self.lab.experiment().id())?;
        dict.set_item("running", self.lab.is_running())?;
        dict.set_item("alpha", self.lab.interpolation_alpha())?;
        Ok(dict)
    }
}

/// Python module definition.
#[pymodule]
fn physics_lab(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let _ = env_logger::try_init();
    m.add_class::<Vec2>()?;
    m.add_class::<PyLab>()?;
    Ok(())
}
