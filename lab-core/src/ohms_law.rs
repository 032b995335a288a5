//! Ohm's law circuit: `I = V / R`.
//!
//! Nothing is integrated. The current is recomputed from the parameters every
//! step, so it is always exact. The only state is the cosmetic flow animation:
//! a few markers travelling along the wire at a speed proportional to the
//! current and wrapping at the end of the path.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use crate::config::{check_range, clamp_to, ConfigError};
use crate::types::{constants, finite_or_zero};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OhmsLawParams {
    /// Volts
    pub voltage: f64,
    /// Ohms
    pub resistance: f64,
}

impl OhmsLawParams {
    pub const VOLTAGE_RANGE: RangeInclusive<f64> = 0.0..=20.0;
    pub const RESISTANCE_RANGE: RangeInclusive<f64> = 1.0..=100.0;

    pub fn clamped(&self) -> Self {
        Self {
            voltage: clamp_to(self.voltage, &Self::VOLTAGE_RANGE),
            resistance: clamp_to(self.resistance, &Self::RESISTANCE_RANGE),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("voltage", self.voltage, &Self::VOLTAGE_RANGE)?;
        check_range("resistance", self.resistance, &Self::RESISTANCE_RANGE)?;
        Ok(())
    }
}

impl Default for OhmsLawParams {
    fn default() -> Self {
        Self {
            voltage: 10.0,
            resistance: 10.0,
        }
    }
}

/// Current in amperes. A (near-)zero or non-finite resistance gives zero
/// rather than an infinite current.
pub fn current(params: &OhmsLawParams) -> f64 {
    if !params.resistance.is_finite() || params.resistance.abs() < constants::EPSILON {
        return 0.0;
    }
    finite_or_zero(params.voltage / params.resistance)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OhmsLawMeasurement {
    pub voltage: f64,
    pub resistance: f64,
    /// Amperes
    pub current: f64,
    /// Watts dissipated in the resistor
    pub power: f64,
}

pub fn measure(params: &OhmsLawParams) -> OhmsLawMeasurement {
    let current = current(params);
    OhmsLawMeasurement {
        voltage: params.voltage,
        resistance: params.resistance,
        current,
        power: finite_or_zero(params.voltage * current),
    }
}

/// Length of the wire the markers travel along, in path units.
pub const FLOW_PATH_LENGTH: f64 = 250.0;
/// Marker speed per ampere, in path units per second.
pub const FLOW_SPEED_PER_AMP: f64 = 240.0;
/// Markers keep crawling even with no current.
pub const MIN_FLOW_SPEED: f64 = 60.0;
const MARKER_START: [f64; 3] = [10.0, 40.0, 70.0];

/// Current-flow markers. Positions are offsets along the wire in
/// `[0, FLOW_PATH_LENGTH)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowMarkers {
    pub positions: Vec<f64>,
    last_current: f64,
}

impl FlowMarkers {
    pub fn new() -> Self {
        Self {
            positions: MARKER_START.to_vec(),
            last_current: 0.0,
        }
    }

    pub fn speed(current: f64) -> f64 {
        (current.abs() * FLOW_SPEED_PER_AMP).max(MIN_FLOW_SPEED)
    }

    /// Move the markers along for `dt` seconds at `current`. A change in
    /// current puts them back at their starting offsets first.
    pub fn advance(&mut self, current: f64, dt: f64) {
        if current != self.last_current {
            self.positions = MARKER_START.to_vec();
            self.last_current = current;
        }
        let distance = Self::speed(current) * dt;
        for position in &mut self.positions {
            *position = (*position + distance).rem_euclid(FLOW_PATH_LENGTH);
        }
    }
}

impl Default for FlowMarkers {
    fn default() -> Self {
        Self::new()
    }
}

pub fn step(
    mut markers: FlowMarkers,
    params: &OhmsLawParams,
    dt: f64,
) -> (FlowMarkers, OhmsLawMeasurement) {
    let measurement = measure(params);
    markers.advance(measurement.current, dt);
    (markers, measurement)
}

#[derive(Debug, Clone, Default)]
pub struct OhmsLaw {
    params: OhmsLawParams,
    markers: FlowMarkers,
}

impl OhmsLaw {
    pub fn new(params: OhmsLawParams) -> Self {
        Self {
            params,
            markers: FlowMarkers::new(),
        }
    }

    pub fn params(&self) -> &OhmsLawParams {
        &self.params
    }

    pub fn markers(&self) -> &FlowMarkers {
        &self.markers
    }

    pub fn set_params(&mut self, params: OhmsLawParams) {
        self.params = params;
    }

    pub fn step(&mut self, dt: f64) -> OhmsLawMeasurement {
        let markers = std::mem::take(&mut self.markers);
        let (markers, measurement) = step(markers, &self.params, dt);
        self.markers = markers;
        measurement
    }

    pub fn measure(&self) -> OhmsLawMeasurement {
        measure(&self.params)
    }

    pub fn reset(&mut self) {
        self.markers = FlowMarkers::new();
    }
}
