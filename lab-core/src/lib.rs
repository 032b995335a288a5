//! # Lab Core
//!
//! Simulation core for an interactive physics lab with five experiments.
//!
//! ## Architecture
//!
//! - `types`: Shared data structures (Vec2, measurements, readout, constants)
//! - `history`: Bounded FIFO buffers for trails and period samples
//! - `integrator`: Fixed-step velocity-first Euler
//! - `clock`: Wall-clock to fixed-step conversion
//! - `pendulum`, `projectile`, `free_fall`, `ohms_law`, `waves`: The experiments
//! - `config`: YAML lab configuration and parameter presets
//! - `lab`: Host owning the active experiment and the frame loop

pub mod clock;
pub mod config;
pub mod free_fall;
pub mod history;
pub mod integrator;
pub mod lab;
pub mod ohms_law;
pub mod pendulum;
pub mod projectile;
pub mod types;
pub mod waves;

pub use config::{ConfigError, LabConfig, PresetLoader};
pub use lab::{Experiment, ExperimentParams, Lab, LabEvent, MeasurementLog, MeasurementSink};
pub use types::{Measurement, Readout, Vec2};
