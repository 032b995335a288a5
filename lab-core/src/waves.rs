//! Two counter-propagating sinusoids and their superposition.
//!
//! ```text
//! y(x, t) = (A1 * sin(f1 * x + t) + A2 * sin(f2 * x - t)) / 2
//! ```
//!
//! The only state is the phase `t`, advanced at a constant rate. The signal is
//! evaluated directly from `t` every time, so no error accumulates however long
//! the simulation runs. The phase is kept in `[0, 2π)`, which leaves the
//! signal unchanged.

use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::ops::RangeInclusive;

use crate::config::{check_range, clamp_to, ConfigError};
use crate::types::{constants, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveParams {
    pub freq1: f64,
    pub freq2: f64,
    pub amp1: f64,
    pub amp2: f64,
}

impl WaveParams {
    pub const FREQUENCY_RANGE: RangeInclusive<f64> = 0.5..=3.0;
    pub const AMPLITUDE_RANGE: RangeInclusive<f64> = 20.0..=100.0;

    pub fn clamped(&self) -> Self {
        Self {
            freq1: clamp_to(self.freq1, &Self::FREQUENCY_RANGE),
            freq2: clamp_to(self.freq2, &Self::FREQUENCY_RANGE),
            amp1: clamp_to(self.amp1, &Self::AMPLITUDE_RANGE),
            amp2: clamp_to(self.amp2, &Self::AMPLITUDE_RANGE),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("freq1", self.freq1, &Self::FREQUENCY_RANGE)?;
        check_range("freq2", self.freq2, &Self::FREQUENCY_RANGE)?;
        check_range("amp1", self.amp1, &Self::AMPLITUDE_RANGE)?;
        check_range("amp2", self.amp2, &Self::AMPLITUDE_RANGE)?;
        Ok(())
    }
}

impl Default for WaveParams {
    fn default() -> Self {
        Self {
            freq1: 1.0,
            freq2: 1.2,
            amp1: 60.0,
            amp2: 60.0,
        }
    }
}

/// Phase advance per second (0.03 rad per 60 Hz frame).
pub const PHASE_RATE: f64 = 0.03 / constants::FIXED_DT;
/// Horizontal units per radian of spatial phase.
pub const SPATIAL_SCALE: f64 = 40.0;
/// Horizontal distance between samples.
pub const SAMPLE_SPACING: f64 = 2.0;
/// Sampled width when the host has not said otherwise.
pub const DEFAULT_WIDTH: f64 = 800.0;
/// Widest surface sampled; wider resizes are clamped.
pub const MAX_WIDTH: f64 = 4096.0;

/// Force a resize width into `[0, MAX_WIDTH]`. Non-finite widths fall back to
/// the default.
pub fn clamp_width(width: f64) -> f64 {
    if width.is_finite() {
        width.clamp(0.0, MAX_WIDTH)
    } else {
        DEFAULT_WIDTH
    }
}

/// Superposed displacement at horizontal position `x` (display units).
pub fn displacement(params: &WaveParams, x: f64, phase: f64) -> f64 {
    let x = x / SPATIAL_SCALE;
    let first = params.amp1 * (params.freq1 * x + phase).sin();
    let second = params.amp2 * (params.freq2 * x - phase).sin();
    (first + second) / 2.0
}

/// Sample the superposition across `[0, width)` at fixed spacing.
pub fn sample(params: &WaveParams, phase: f64, width: f64) -> Vec<Vec2> {
    let count = (clamp_width(width) / SAMPLE_SPACING).ceil() as usize;
    (0..count)
        .map(|i| {
            let x = i as f64 * SAMPLE_SPACING;
            Vec2::new(x, displacement(params, x, phase))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveState {
    /// Radians, in `[0, 2π)`
    pub phase: f64,
    /// Width the signal is sampled over
    pub width: f64,
}

impl Default for WaveState {
    fn default() -> Self {
        Self {
            phase: 0.0,
            width: DEFAULT_WIDTH,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WaveMeasurement {
    /// Current phase (rad)
    pub phase: f64,
    /// Phase advance per second (rad/s)
    pub phase_rate: f64,
    pub displacement_at_origin: f64,
    /// Largest |y| over the sampled width
    pub peak_displacement: f64,
}

pub fn measure(state: &WaveState, params: &WaveParams) -> WaveMeasurement {
    let peak = sample(params, state.phase, state.width)
        .iter()
        .map(|p| p.y.abs())
        .fold(0.0, f64::max);
    WaveMeasurement {
        phase: state.phase,
        phase_rate: PHASE_RATE,
        displacement_at_origin: displacement(params, 0.0, state.phase),
        peak_displacement: peak,
    }
}

pub fn step(mut state: WaveState, params: &WaveParams, dt: f64) -> (WaveState, WaveMeasurement) {
    state.phase = (state.phase + PHASE_RATE * dt).rem_euclid(TAU);
    (state, measure(&state, params))
}

#[derive(Debug, Clone, Default)]
pub struct WaveInterference {
    params: WaveParams,
    state: WaveState,
}

impl WaveInterference {
    pub fn new(params: WaveParams) -> Self {
        Self {
            params,
            state: WaveState::default(),
        }
    }

    pub fn params(&self) -> &WaveParams {
        &self.params
    }

    pub fn state(&self) -> &WaveState {
        &self.state
    }

    pub fn set_params(&mut self, params: WaveParams) {
        self.params = params;
    }

    pub fn set_width(&mut self, width: f64) {
        self.state.width = clamp_width(width);
    }

    pub fn step(&mut self, dt: f64) -> WaveMeasurement {
        let (state, measurement) = step(self.state, &self.params, dt);
        self.state = state;
        measurement
    }

    pub fn measure(&self) -> WaveMeasurement {
        measure(&self.state, &self.params)
    }

    /// Current signal, ready to draw.
    pub fn samples(&self) -> Vec<Vec2> {
        sample(&self.params, self.state.phase, self.state.width)
    }

    pub fn reset(&mut self) {
        self.state.phase = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const DT: f64 = constants::FIXED_DT;

    #[test]
    fn test_phase_advances_by_constant_step() {
        let mut waves = WaveInterference::default();
        waves.step(DT);
        assert_relative_eq!(waves.state().phase, 0.03, epsilon = 1e-12);
        waves.step(DT);
        assert_relative_eq!(waves.state().phase, 0.06, epsilon = 1e-12);
    }

    #[test]
    fn test_signal_matches_closed_form_after_long_run() {
        let params = WaveParams {
            freq1: 1.7,
            freq2: 2.3,
            amp1: 45.0,
            amp2: 80.0,
        };
        let mut waves = WaveInterference::new(params);
        let steps = 100_000;
        for _ in 0..steps {
            waves.step(DT);
        }

        let t = steps as f64 * 0.03;
        for x in [0.0, 13.0, 250.0, 777.0] {
            let xs = x / SPATIAL_SCALE;
            let expected =
                (45.0 * (1.7 * xs + t).sin() + 80.0 * (2.3 * xs - t).sin()) / 2.0;
            assert_relative_eq!(
                displacement(&params, x, waves.state().phase),
                expected,
                epsilon = 1e-6
            );
        }
    }

    #[test]
    fn test_phase_stays_wrapped() {
        let mut waves = WaveInterference::default();
        for _ in 0..10_000 {
            waves.step(DT);
            let phase = waves.state().phase;
            assert!((0.0..TAU).contains(&phase));
        }
    }

    #[test]
    fn test_equal_amplitudes_cancel_at_origin() {
        let params = WaveParams {
            amp1: 50.0,
            amp2: 50.0,
            ..WaveParams::default()
        };
        for phase in [0.0, 0.4, 1.9, 5.5] {
            assert!(displacement(&params, 0.0, phase).abs() < 1e-12);
        }
    }

    #[test]
    fn test_sampling_resolution_and_bound() {
        let params = WaveParams::default();
        let points = sample(&params, 0.7, 400.0);
        assert_eq!(points.len(), 200);
        assert_eq!(points[1].x - points[0].x, SAMPLE_SPACING);

        let bound = (params.amp1 + params.amp2) / 2.0;
        let mut waves = WaveInterference::new(params);
        waves.set_width(400.0);
        let m = waves.step(DT);
        assert!(m.peak_displacement <= bound);
        assert!(m.peak_displacement > 0.0);
    }

    #[test]
    fn test_resize_width_is_bounded() {
        let mut waves = WaveInterference::default();

        waves.set_width(f64::INFINITY);
        assert_eq!(waves.state().width, DEFAULT_WIDTH);
        waves.set_width(f64::NAN);
        assert_eq!(waves.state().width, DEFAULT_WIDTH);

        waves.set_width(1e30);
        assert_eq!(waves.state().width, MAX_WIDTH);
        let m = waves.step(DT);
        assert!(m.peak_displacement.is_finite());
        assert_eq!(waves.samples().len(), (MAX_WIDTH / SAMPLE_SPACING) as usize);

        waves.set_width(-50.0);
        assert!(waves.samples().is_empty());
    }

    #[test]
    fn test_sample_bounds_raw_width() {
        let params = WaveParams::default();
        assert_eq!(
            sample(&params, 0.0, f64::MAX).len(),
            (MAX_WIDTH / SAMPLE_SPACING) as usize
        );
    }

    #[test]
    fn test_reset_returns_phase_to_zero() {
        let mut waves = WaveInterference::default();
        for _ in 0..17 {
            waves.step(DT);
        }
        waves.reset();
        assert_eq!(waves.state().phase, 0.0);
        waves.reset();
        assert_eq!(waves.state(), &WaveState::default());
    }
}
