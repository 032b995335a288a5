//! The lab host: one active simulation, a running flag and a frame loop.
//!
//! Each animation frame the host calls [`Lab::frame`] with a wall-clock
//! timestamp. The frame:
//!
//! 1. applies parameter updates queued since the last frame, whole records at
//!    a time, so no step ever sees half an update
//! 2. reacts to a paused→running edge (this is what launches a projectile)
//! 3. converts the timestamp into zero or more fixed steps and runs them
//! 4. pushes the latest measurement to the sink if running
//!
//! Drawing is not done here. A renderer reads [`Lab::simulation`] whenever it
//! likes and only ever sees whole-step state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::clock::{FixedTimestep, FrameClock};
use crate::config::{ConfigError, LabConfig};
use crate::free_fall::{FreeFall, FreeFallParams};
use crate::history::History;
use crate::ohms_law::{OhmsLaw, OhmsLawParams};
use crate::pendulum::{Pendulum, PendulumParams};
use crate::projectile::{Phase, Projectile, ProjectileParams};
use crate::types::{Measurement, Readout};
use crate::waves::{WaveInterference, WaveParams};

// =============================================================================
// Experiments
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Experiment {
    Pendulum,
    Projectile,
    OhmsLaw,
    FreeFall,
    Waves,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Experiment {
    /// Menu order.
    pub const ALL: [Experiment; 5] = [
        Experiment::Pendulum,
        Experiment::Projectile,
        Experiment::OhmsLaw,
        Experiment::FreeFall,
        Experiment::Waves,
    ];

    /// Stable identifier, also the preset directory name.
    pub fn id(&self) -> &'static str {
        match self {
            Experiment::Pendulum => "pendulum",
            Experiment::Projectile => "projectile",
            Experiment::OhmsLaw => "ohms-law",
            Experiment::FreeFall => "free-fall",
            Experiment::Waves => "waves",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Experiment::Pendulum => "Simple Pendulum",
            Experiment::Projectile => "Projectile Motion",
            Experiment::OhmsLaw => "Ohm's Law",
            Experiment::FreeFall => "Free Fall",
            Experiment::Waves => "Wave Interference",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Experiment::Pendulum => "Study periodic motion and energy conservation",
            Experiment::Projectile => "Analyze trajectory and range calculations",
            Experiment::OhmsLaw => "Explore voltage, current, and resistance",
            Experiment::FreeFall => "Study gravity and constant acceleration",
            Experiment::Waves => "Visualize wave superposition effects",
        }
    }

    pub fn difficulty(&self) -> Difficulty {
        match self {
            Experiment::Projectile => Difficulty::Intermediate,
            Experiment::Waves => Difficulty::Advanced,
            _ => Difficulty::Beginner,
        }
    }

    pub fn from_id(id: &str) -> Result<Self, ConfigError> {
        Self::ALL
            .into_iter()
            .find(|e| e.id() == id)
            .ok_or_else(|| ConfigError::UnknownExperiment(id.to_string()))
    }
}

impl FromStr for Experiment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_id(s)
    }
}

impl fmt::Display for Experiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// A parameter record for one experiment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "experiment", rename_all = "kebab-case")]
pub enum ExperimentParams {
    Pendulum(PendulumParams),
    Projectile(ProjectileParams),
    OhmsLaw(OhmsLawParams),
    FreeFall(FreeFallParams),
    Waves(WaveParams),
}

impl ExperimentParams {
    pub fn experiment(&self) -> Experiment {
        match self {
            ExperimentParams::Pendulum(_) => Experiment::Pendulum,
            ExperimentParams::Projectile(_) => Experiment::Projectile,
            ExperimentParams::OhmsLaw(_) => Experiment::OhmsLaw,
            ExperimentParams::FreeFall(_) => Experiment::FreeFall,
            ExperimentParams::Waves(_) => Experiment::Waves,
        }
    }

    pub fn clamped(&self) -> Self {
        match self {
            ExperimentParams::Pendulum(p) => ExperimentParams::Pendulum(p.clamped()),
            ExperimentParams::Projectile(p) => ExperimentParams::Projectile(p.clamped()),
            ExperimentParams::OhmsLaw(p) => ExperimentParams::OhmsLaw(p.clamped()),
            ExperimentParams::FreeFall(p) => ExperimentParams::FreeFall(p.clamped()),
            ExperimentParams::Waves(p) => ExperimentParams::Waves(p.clamped()),
        }
    }
}

/// Host-owned parameters for every experiment, kept across switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabParams {
    pub pendulum: PendulumParams,
    pub projectile: ProjectileParams,
    pub ohms_law: OhmsLawParams,
    pub free_fall: FreeFallParams,
    pub waves: WaveParams,
}

impl LabParams {
    pub fn get(&self, experiment: Experiment) -> ExperimentParams {
        match experiment {
            Experiment::Pendulum => ExperimentParams::Pendulum(self.pendulum),
            Experiment::Projectile => ExperimentParams::Projectile(self.projectile),
            Experiment::OhmsLaw => ExperimentParams::OhmsLaw(self.ohms_law),
            Experiment::FreeFall => ExperimentParams::FreeFall(self.free_fall),
            Experiment::Waves => ExperimentParams::Waves(self.waves),
        }
    }

    pub fn set(&mut self, params: ExperimentParams) {
        match params {
            ExperimentParams::Pendulum(p) => self.pendulum = p,
            ExperimentParams::Projectile(p) => self.projectile = p,
            ExperimentParams::OhmsLaw(p) => self.ohms_law = p,
            ExperimentParams::FreeFall(p) => self.free_fall = p,
            ExperimentParams::Waves(p) => self.waves = p,
        }
    }
}

// =============================================================================
// Events and sinks
// =============================================================================

/// Lifecycle transitions reported alongside measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LabEvent {
    /// A projectile left the ground
    Launched,
    /// A projectile came back down
    Landed,
    /// A free fall reached the ground
    Completed,
    /// A parameter change restarted the pendulum
    Restarted,
}

/// Receives what the lab produces each frame. Has no way to write back into
/// the simulation.
pub trait MeasurementSink {
    fn record(&mut self, measurement: &Measurement);

    fn event(&mut self, _event: LabEvent) {}
}

/// Sink keeping a bounded history of measurements and every event.
#[derive(Debug, Clone)]
pub struct MeasurementLog {
    measurements: History<Measurement>,
    events: Vec<LabEvent>,
}

impl MeasurementLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            measurements: History::with_capacity(capacity),
            events: Vec::new(),
        }
    }

    pub fn measurements(&self) -> &History<Measurement> {
        &self.measurements
    }

    pub fn latest(&self) -> Option<&Measurement> {
        self.measurements.newest()
    }

    /// Display record for the latest measurement, all zero before the first.
    pub fn readout(&self) -> Readout {
        self.latest().map(Measurement::as_readout).unwrap_or_default()
    }

    pub fn events(&self) -> &[LabEvent] {
        &self.events
    }

    /// Events recorded since the last call.
    pub fn take_events(&mut self) -> Vec<LabEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn clear(&mut self) {
        self.measurements.clear();
        self.events.clear();
    }
}

impl Default for MeasurementLog {
    fn default() -> Self {
        Self::new(LabConfig::default().measurement_log_capacity)
    }
}

impl MeasurementSink for MeasurementLog {
    fn record(&mut self, measurement: &Measurement) {
        self.measurements.push(*measurement);
    }

    fn event(&mut self, event: LabEvent) {
        self.events.push(event);
    }
}

// =============================================================================
// Active simulation
// =============================================================================

/// The simulation instance currently owned by the lab.
#[derive(Debug, Clone)]
pub enum Simulation {
    Pendulum(Pendulum),
    Projectile(Projectile),
    OhmsLaw(OhmsLaw),
    FreeFall(FreeFall),
    Waves(WaveInterference),
}

impl Simulation {
    /// Fresh instance of `experiment` at the given parameters.
    pub fn build(experiment: Experiment, params: &LabParams) -> Self {
        match experiment {
            Experiment::Pendulum => Simulation::Pendulum(Pendulum::new(params.pendulum)),
            Experiment::Projectile => Simulation::Projectile(Projectile::new(params.projectile)),
            Experiment::OhmsLaw => Simulation::OhmsLaw(OhmsLaw::new(params.ohms_law)),
            Experiment::FreeFall => Simulation::FreeFall(FreeFall::new(params.free_fall)),
            Experiment::Waves => Simulation::Waves(WaveInterference::new(params.waves)),
        }
    }

    pub fn experiment(&self) -> Experiment {
        match self {
            Simulation::Pendulum(_) => Experiment::Pendulum,
            Simulation::Projectile(_) => Experiment::Projectile,
            Simulation::OhmsLaw(_) => Experiment::OhmsLaw,
            Simulation::FreeFall(_) => Experiment::FreeFall,
            Simulation::Waves(_) => Experiment::Waves,
        }
    }

    /// Hand new parameters to the instance. Records for other experiments
    /// are ignored.
    pub fn apply(&mut self, params: ExperimentParams) -> Option<LabEvent> {
        match (self, params) {
            (Simulation::Pendulum(sim), ExperimentParams::Pendulum(p)) => {
                sim.set_params(p).then_some(LabEvent::Restarted)
            }
            (Simulation::Projectile(sim), ExperimentParams::Projectile(p)) => {
                sim.set_params(p);
                None
            }
            (Simulation::OhmsLaw(sim), ExperimentParams::OhmsLaw(p)) => {
                sim.set_params(p);
                None
            }
            (Simulation::FreeFall(sim), ExperimentParams::FreeFall(p)) => {
                sim.set_params(p);
                None
            }
            (Simulation::Waves(sim), ExperimentParams::Waves(p)) => {
                sim.set_params(p);
                None
            }
            _ => None,
        }
    }

    /// The running flag was just switched on.
    pub fn start(&mut self) -> Option<LabEvent> {
        match self {
            Simulation::Projectile(sim) => sim.start().then_some(LabEvent::Launched),
            _ => None,
        }
    }

    /// One fixed step.
    pub fn step(&mut self, dt: f64) -> (Measurement, Option<LabEvent>) {
        match self {
            Simulation::Pendulum(sim) => (Measurement::Pendulum(sim.step(dt)), None),
            Simulation::Projectile(sim) => {
                let was_flying = sim.phase() == Phase::Launched;
                let m = sim.step(dt);
                let landed = was_flying && sim.phase() == Phase::Landed;
                (
                    Measurement::Projectile(m),
                    landed.then_some(LabEvent::Landed),
                )
            }
            Simulation::OhmsLaw(sim) => (Measurement::OhmsLaw(sim.step(dt)), None),
            Simulation::FreeFall(sim) => {
                let (m, completed) = sim.step(dt);
                (
                    Measurement::FreeFall(m),
                    completed.then_some(LabEvent::Completed),
                )
            }
            Simulation::Waves(sim) => (Measurement::Waves(sim.step(dt)), None),
        }
    }

    /// Measurement for the current state without stepping.
    pub fn measure(&self) -> Measurement {
        match self {
            Simulation::Pendulum(sim) => Measurement::Pendulum(sim.measure()),
            Simulation::Projectile(sim) => Measurement::Projectile(sim.measure()),
            Simulation::OhmsLaw(sim) => Measurement::OhmsLaw(sim.measure()),
            Simulation::FreeFall(sim) => Measurement::FreeFall(sim.measure()),
            Simulation::Waves(sim) => Measurement::Waves(sim.measure()),
        }
    }

    pub fn reset(&mut self) {
        match self {
            Simulation::Pendulum(sim) => sim.reset(),
            Simulation::Projectile(sim) => sim.reset(),
            Simulation::OhmsLaw(sim) => sim.reset(),
            Simulation::FreeFall(sim) => sim.reset(),
            Simulation::Waves(sim) => sim.reset(),
        }
    }

    pub fn handle_resize(&mut self, width: f64) {
        match self {
            Simulation::Projectile(sim) => sim.handle_resize(),
            Simulation::Waves(sim) => sim.set_width(width),
            _ => {}
        }
    }
}

// =============================================================================
// Lab
// =============================================================================

pub struct Lab {
    config: LabConfig,
    params: LabParams,
    simulation: Simulation,
    pending: Vec<ExperimentParams>,
    running: bool,
    was_running: bool,
    clock: FrameClock,
    stepper: FixedTimestep,
}

impl Lab {
    /// A paused lab showing the pendulum at default parameters.
    pub fn new(config: LabConfig) -> Self {
        Self::with_params(config, LabParams::default())
    }

    /// Out-of-range timing values in `config` are replaced by the clock and
    /// stepper rather than rejected.
    pub fn with_params(config: LabConfig, params: LabParams) -> Self {
        if let Err(err) = config.validate() {
            log::warn!("lab config out of range: {}", err);
        }
        Self {
            config,
            simulation: Simulation::build(Experiment::Pendulum, &params),
            params,
            pending: Vec::new(),
            running: false,
            was_running: false,
            clock: FrameClock::new(config.max_frame_delta),
            stepper: FixedTimestep::new(config.fixed_dt, config.max_steps_per_frame),
        }
    }

    pub fn config(&self) -> &LabConfig {
        &self.config
    }

    pub fn experiment(&self) -> Experiment {
        self.simulation.experiment()
    }

    /// Read-only view of the active simulation for drawing.
    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    /// Parameters as of the last frame (queued updates not included).
    pub fn params(&self) -> &LabParams {
        &self.params
    }

    /// Parameters as of the next frame, queued updates included.
    pub fn queued_params(&self) -> LabParams {
        let mut params = self.params;
        for update in &self.pending {
            params.set(*update);
        }
        params
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    /// Fraction of a fixed step not yet simulated, for render interpolation.
    pub fn interpolation_alpha(&self) -> f64 {
        self.stepper.alpha()
    }

    /// Switch experiments. The previous instance is dropped and a fresh one
    /// built from the host-owned parameters.
    pub fn select(&mut self, experiment: Experiment) {
        for params in self.pending.drain(..) {
            self.params.set(params);
        }
        self.simulation = Simulation::build(experiment, &self.params);
        self.stepper.reset();
        self.clock.reset();
        self.was_running = false;
        log::info!("switched to {}", experiment.name());
    }

    /// Queue a parameter record. It is clamped to its valid ranges and takes
    /// effect at the start of the next frame.
    pub fn update_params(&mut self, params: ExperimentParams) {
        self.pending.push(params.clamped());
    }

    /// Reinitialize the active simulation, keeping the running flag. If the
    /// lab is running, the next frame counts as a fresh start.
    pub fn reset(&mut self) {
        self.simulation.reset();
        self.stepper.reset();
        self.clock.reset();
        self.was_running = false;
        log::info!("reset {}", self.experiment().name());
    }

    /// The drawing surface changed size.
    pub fn handle_resize(&mut self, width: f64) {
        self.simulation.handle_resize(width);
    }

    /// Advance one animation frame. `now` is a wall-clock timestamp in seconds.
    /// Returns the number of fixed steps taken.
    pub fn frame<S: MeasurementSink>(&mut self, now: f64, sink: &mut S) -> usize {
        for params in std::mem::take(&mut self.pending) {
            log::debug!("applying {} parameters", params.experiment());
            self.params.set(params);
            if let Some(event) = self.simulation.apply(params) {
                sink.event(event);
            }
        }

        if self.running && !self.was_running {
            if let Some(event) = self.simulation.start() {
                sink.event(event);
            }
        }
        self.was_running = self.running;

        let delta = self.clock.tick(now, self.running);
        if !self.running {
            return 0;
        }

        let steps = self.stepper.advance(delta);
        let mut latest = None;
        for _ in 0..steps {
            let (measurement, event) = self.simulation.step(self.stepper.dt());
            if let Some(event) = event {
                sink.event(event);
            }
            latest = Some(measurement);
        }
        log::trace!("frame at {:.3}s: {} steps", now, steps);

        let measurement = latest.unwrap_or_else(|| self.simulation.measure());
        sink.record(&measurement.sanitized());
        steps
    }
}

impl Default for Lab {
    fn default() -> Self {
        Self::new(LabConfig::default())
    }
}
