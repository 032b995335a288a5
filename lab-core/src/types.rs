//! Core types shared by the simulation cores.
//!
//! All dynamic quantities are SI unless a parameter record says otherwise:
//! - Position: meters (m), y positive upward
//! - Velocity: meters per second (m/s)
//! - Angles: radians internally, degrees in parameter records
//! - Mass: kilograms (kg)
//! - Energy: joules (J)
//!
//! Screen coordinates never appear here. Whatever draws the state owns the
//! pixel scaling.

use serde::{Deserialize, Serialize};
use std::ops::{Mul, Sub};

use crate::free_fall::FreeFallMeasurement;
use crate::ohms_law::OhmsLawMeasurement;
use crate::pendulum::PendulumMeasurement;
use crate::projectile::ProjectileMeasurement;
use crate::waves::WaveMeasurement;

// =============================================================================
// Vec2 - 2D Vector
// =============================================================================

/// A 2D vector used for bob positions, projectile positions and trails.
///
/// Coordinate system:
/// - X: horizontal, positive to the right
/// - Y: vertical, positive upward
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Vector of length `radius` at `angle` radians measured from the +X axis.
    pub fn from_polar(radius: f64, angle: f64) -> Self {
        Self {
            x: radius * angle.cos(),
            y: radius * angle.sin(),
        }
    }

    /// Squared magnitude (avoids sqrt for comparisons)
    pub fn magnitude_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    /// Magnitude (length) of the vector
    pub fn magnitude(&self) -> f64 {
        self.magnitude_squared().sqrt()
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }
}

impl Mul<f64> for Vec2 {
    type Output = Self;
    fn mul(self, scalar: f64) -> Self {
        Self {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }
}

impl Default for Vec2 {
    fn default() -> Self {
        Self::ZERO
    }
}

// =============================================================================
// Measurements
// =============================================================================

/// Per-frame output of whichever simulation is active.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Measurement {
    Pendulum(PendulumMeasurement),
    Projectile(ProjectileMeasurement),
    FreeFall(FreeFallMeasurement),
    OhmsLaw(OhmsLawMeasurement),
    Waves(WaveMeasurement),
}

impl Measurement {
    /// Collapse into the five-field record the data display shows.
    ///
    /// Fields a simulation has no notion of are reported as zero.
    pub fn as_readout(&self) -> Readout {
        let readout = match self {
            Measurement::Pendulum(m) => Readout {
                period: m.period,
                frequency: m.frequency,
                velocity: m.velocity,
                acceleration: m.acceleration,
                energy: m.energy,
            },
            Measurement::Projectile(m) => Readout {
                velocity: m.speed,
                acceleration: m.gravity,
                ..Readout::default()
            },
            Measurement::FreeFall(m) => Readout {
                velocity: m.velocity,
                acceleration: m.acceleration,
                ..Readout::default()
            },
            Measurement::OhmsLaw(_) => Readout::default(),
            Measurement::Waves(m) => Readout {
                frequency: m.phase_rate / (2.0 * std::f64::consts::PI),
                ..Readout::default()
            },
        };
        readout.sanitized()
    }

    /// Replace any non-finite field with zero.
    pub fn sanitized(self) -> Self {
        let f = finite_or_zero;
        match self {
            Measurement::Pendulum(m) => Measurement::Pendulum(PendulumMeasurement {
                period: f(m.period),
                frequency: f(m.frequency),
                velocity: f(m.velocity),
                acceleration: f(m.acceleration),
                energy: f(m.energy),
            }),
            Measurement::Projectile(m) => Measurement::Projectile(ProjectileMeasurement {
                time: f(m.time),
                distance: f(m.distance),
                height: f(m.height),
                speed: f(m.speed),
                angle: f(m.angle),
                gravity: f(m.gravity),
            }),
            Measurement::FreeFall(m) => Measurement::FreeFall(FreeFallMeasurement {
                height: f(m.height),
                velocity: f(m.velocity),
                acceleration: f(m.acceleration),
                elapsed: f(m.elapsed),
                finished: m.finished,
            }),
            Measurement::OhmsLaw(m) => Measurement::OhmsLaw(OhmsLawMeasurement {
                voltage: f(m.voltage),
                resistance: f(m.resistance),
                current: f(m.current),
                power: f(m.power),
            }),
            Measurement::Waves(m) => Measurement::Waves(WaveMeasurement {
                phase: f(m.phase),
                phase_rate: f(m.phase_rate),
                displacement_at_origin: f(m.displacement_at_origin),
                peak_displacement: f(m.peak_displacement),
            }),
        }
    }
}

/// The five quantities shown on the live measurement panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Readout {
    /// Seconds per full oscillation
    pub period: f64,
    /// Hz
    pub frequency: f64,
    /// m/s
    pub velocity: f64,
    /// m/s²
    pub acceleration: f64,
    /// J
    pub energy: f64,
}

impl Readout {
    /// Replace any non-finite field with zero.
    pub fn sanitized(self) -> Self {
        Self {
            period: finite_or_zero(self.period),
            frequency: finite_or_zero(self.frequency),
            velocity: finite_or_zero(self.velocity),
            acceleration: finite_or_zero(self.acceleration),
            energy: finite_or_zero(self.energy),
        }
    }
}

/// Map NaN and infinities to zero. Measurements are always finite.
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

// =============================================================================
// Constants
// =============================================================================

/// Constants shared across the simulation cores.
pub mod constants {
    /// Fixed integration step (s), one display frame at 60 Hz
    pub const FIXED_DT: f64 = 1.0 / 60.0;

    /// Largest wall-clock delta a single frame may contribute (s)
    pub const MAX_FRAME_DELTA: f64 = 0.1;

    /// Standard gravitational acceleration (m/s²)
    pub const STANDARD_GRAVITY: f64 = 9.81;

    /// Small value for floating-point comparisons
    pub const EPSILON: f64 = 1e-10;

    /// Bob positions retained for the pendulum trail
    pub const PENDULUM_TRAIL_CAPACITY: usize = 50;

    /// Period samples retained by the pendulum
    pub const PERIOD_HISTORY_CAPACITY: usize = 10;

    /// Number of most recent period samples averaged into the reported period
    pub const PERIOD_AVERAGE_WINDOW: usize = 3;

    /// Period samples outside this open interval (s) are discarded
    pub const MIN_PERIOD: f64 = 0.1;
    pub const MAX_PERIOD: f64 = 10.0;

    /// Positions retained for the projectile trail
    pub const PROJECTILE_TRAIL_CAPACITY: usize = 50;

    /// Time horizon (s) and spacing (s) of the predicted projectile trajectory
    pub const PREDICTION_HORIZON: f64 = 3.0;
    pub const PREDICTION_STEP: f64 = 0.1;
}

// =============================================================================
// Tests
// =============================================================================
