//! One-dimensional fall from rest under constant gravity.
//!
//! The fall ends when the fallen distance reaches the drop height. After
//! that every step is a no-op until the state is reset; `finished` only ever
//! goes from false to true.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use crate::config::{check_range, clamp_to, ConfigError};
use crate::integrator::{AccelerationModel, AxisState, Euler};
use crate::types::constants;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreeFallParams {
    /// Drop height in meters
    pub height: f64,
    /// Gravitational acceleration in m/s²
    pub gravity: f64,
}

impl FreeFallParams {
    pub const HEIGHT_RANGE: RangeInclusive<f64> = 1.0..=100.0;
    pub const GRAVITY_RANGE: RangeInclusive<f64> = 1.0..=20.0;

    /// Analytic time to reach the ground, `√(2h/g)`.
    pub fn impact_time(&self) -> f64 {
        (2.0 * self.height / self.gravity).sqrt()
    }

    /// Analytic impact speed, `√(2gh)`.
    pub fn impact_speed(&self) -> f64 {
        (2.0 * self.gravity * self.height).sqrt()
    }

    pub fn clamped(&self) -> Self {
        Self {
            height: clamp_to(self.height, &Self::HEIGHT_RANGE),
            gravity: clamp_to(self.gravity, &Self::GRAVITY_RANGE),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("height", self.height, &Self::HEIGHT_RANGE)?;
        check_range("gravity", self.gravity, &Self::GRAVITY_RANGE)?;
        Ok(())
    }
}

impl Default for FreeFallParams {
    fn default() -> Self {
        Self {
            height: 50.0,
            gravity: constants::STANDARD_GRAVITY,
        }
    }
}

struct UniformGravity(f64);

impl AccelerationModel for UniformGravity {
    fn acceleration(&self, _state: &AxisState) -> f64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FreeFallState {
    /// Meters fallen since release
    pub fallen: f64,
    /// Downward speed in m/s
    pub velocity: f64,
    /// Seconds since release
    pub elapsed: f64,
    pub finished: bool,
}

impl FreeFallState {
    pub fn released() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FreeFallMeasurement {
    /// Height above ground (m)
    pub height: f64,
    /// Downward speed (m/s)
    pub velocity: f64,
    /// Current acceleration (m/s²), zero once on the ground
    pub acceleration: f64,
    /// Seconds since release
    pub elapsed: f64,
    pub finished: bool,
}

pub fn measure(state: &FreeFallState, params: &FreeFallParams) -> FreeFallMeasurement {
    FreeFallMeasurement {
        height: (params.height - state.fallen).max(0.0),
        velocity: state.velocity,
        acceleration: if state.finished { 0.0 } else { params.gravity },
        elapsed: state.elapsed,
        finished: state.finished,
    }
}

/// Advance the fall by one fixed step.
pub fn step(
    state: FreeFallState,
    params: &FreeFallParams,
    dt: f64,
) -> (FreeFallState, FreeFallMeasurement) {
    if state.finished {
        return (state, measure(&state, params));
    }

    let result = Euler::step(
        &AxisState::new(state.fallen, state.velocity),
        &UniformGravity(params.gravity),
        dt,
    );

    let mut next = FreeFallState {
        fallen: result.state.position,
        velocity: result.state.velocity,
        elapsed: state.elapsed + dt,
        finished: false,
    };
    if next.fallen >= params.height {
        next.fallen = params.height;
        next.finished = true;
    }

    (next, measure(&next, params))
}

/// A free-fall instance: parameters plus exclusively owned state.
#[derive(Debug, Clone, Default)]
pub struct FreeFall {
    params: FreeFallParams,
    state: FreeFallState,
}

impl FreeFall {
    pub fn new(params: FreeFallParams) -> Self {
        Self {
            params,
            state: FreeFallState::released(),
        }
    }

    pub fn params(&self) -> &FreeFallParams {
        &self.params
    }

    pub fn state(&self) -> &FreeFallState {
        &self.state
    }

    /// New parameters take effect on the next step; the fall is not restarted.
    pub fn set_params(&mut self, params: FreeFallParams) {
        self.params = params;
    }

    /// Step once. Returns the measurement and whether this step hit the ground.
    pub fn step(&mut self, dt: f64) -> (FreeFallMeasurement, bool) {
        let was_finished = self.state.finished;
        let (state, measurement) = step(self.state, &self.params, dt);
        self.state = state;

        let completed = !was_finished && state.finished;
        if completed {
            log::info!(
                "free fall from {:.1}m completed in {:.2}s at {:.2} m/s",
                self.params.height,
                state.elapsed,
                state.velocity
            );
        }
        (measurement, completed)
    }

    pub fn measure(&self) -> FreeFallMeasurement {
        measure(&self.state, &self.params)
    }

    pub fn reset(&mut self) {
        self.state = FreeFallState::released();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const DT: f64 = constants::FIXED_DT;

    #[test]
    fn test_matches_closed_form_while_falling() {
        let params = FreeFallParams {
            height: 100.0,
            gravity: 9.81,
        };
        let mut fall = FreeFall::new(params);
        let steps = 120;
        for _ in 0..steps {
            fall.step(DT);
        }

        let t = fall.state().elapsed;
        assert_relative_eq!(t, 2.0, epsilon = 1e-9);
        assert_relative_eq!(fall.state().velocity, 9.81 * t, max_relative = 1e-9);

        // First-order scheme overshoots 0.5*g*t² by 0.5*g*t*dt
        let closed_form = 0.5 * 9.81 * t * t;
        let tolerance = 0.5 * 9.81 * t * DT + 1e-9;
        assert!(
            (fall.state().fallen - closed_form).abs() <= tolerance,
            "fallen {} vs closed form {}",
            fall.state().fallen,
            closed_form
        );
        assert!(!fall.state().finished);
    }

    #[test]
    fn test_finishes_at_ground_and_stops() {
        let params = FreeFallParams {
            height: 5.0,
            gravity: 9.81,
        };
        let mut fall = FreeFall::new(params);

        let mut completions = 0;
        for _ in 0..300 {
            let (m, completed) = fall.step(DT);
            if completed {
                completions += 1;
            }
            assert!(m.height >= 0.0);
        }
        assert_eq!(completions, 1);

        let state = *fall.state();
        assert!(state.finished);
        assert_eq!(state.fallen, 5.0);
        assert_eq!(fall.measure().height, 0.0);
        assert_eq!(fall.measure().acceleration, 0.0);
        // Reached the ground within a step of the analytic impact time
        assert!((state.elapsed - params.impact_time()).abs() <= DT + 1e-9);

        let (_, completed) = fall.step(DT);
        assert!(!completed);
        assert_eq!(fall.state(), &state);
    }

    #[test]
    fn test_param_change_does_not_restart() {
        let mut fall = FreeFall::default();
        for _ in 0..30 {
            fall.step(DT);
        }
        let before = *fall.state();
        fall.set_params(FreeFallParams {
            height: 80.0,
            gravity: 3.0,
        });
        assert_eq!(fall.state(), &before);

        fall.step(DT);
        assert_relative_eq!(fall.state().velocity, before.velocity + 3.0 * DT);
    }

    #[test]
    fn test_lowering_height_below_fallen_finishes() {
        let mut fall = FreeFall::new(FreeFallParams {
            height: 100.0,
            gravity: 9.81,
        });
        for _ in 0..120 {
            fall.step(DT);
        }
        fall.set_params(FreeFallParams {
            height: 1.0,
            gravity: 9.81,
        });
        let (m, completed) = fall.step(DT);
        assert!(completed);
        assert_eq!(m.height, 0.0);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut fall = FreeFall::default();
        for _ in 0..1000 {
            fall.step(DT);
        }
        assert!(fall.state().finished);

        fall.reset();
        let first = *fall.state();
        fall.reset();
        assert_eq!(fall.state(), &first);
        assert_eq!(first, FreeFallState::released());
        assert_eq!(fall.measure().height, fall.params().height);
    }

    #[test]
    fn test_analytic_helpers() {
        let params = FreeFallParams {
            height: 20.0,
            gravity: 10.0,
        };
        assert_relative_eq!(params.impact_time(), 2.0);
        assert_relative_eq!(params.impact_speed(), 20.0);
    }
}
