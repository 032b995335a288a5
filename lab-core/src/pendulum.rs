//! Nonlinear damped pendulum.
//!
//! ## Dynamics
//!
//! ```text
//! α = -(g / L) * sin θ
//! ω = (ω + α*dt) * damping
//! θ = θ + ω*dt
//! ```
//!
//! `L` is stored in centimeters and converted to meters here. The angle is never
//! renormalized; it only ever enters the dynamics through `sin`/`cos`. Mass has
//! no effect on the motion, only on the reported energy.
//!
//! ## Period measurement
//!
//! A crossing is the angle changing sign while the angular velocity points
//! away from the side the bob came from. Consecutive crossings are half a
//! period apart, so each crossing after the first yields a sample of
//! `2 * (t - t_last)`. Samples outside (0.1 s, 10 s) are thrown away. The
//! reported period is the mean of the three most recent samples.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use crate::config::{check_range, clamp_to, ConfigError};
use crate::history::History;
use crate::integrator::{AccelerationModel, AxisState, Euler};
use crate::types::{constants, Vec2};

/// User-adjustable pendulum parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PendulumParams {
    /// String length in centimeters
    pub length: f64,
    /// Bob mass in kg
    pub mass: f64,
    /// Initial angle from vertical in degrees
    pub angle: f64,
    /// Gravitational acceleration in m/s²
    pub gravity: f64,
    /// Per-step velocity retention, 1.0 means no air resistance
    pub damping: f64,
}

impl PendulumParams {
    pub const LENGTH_RANGE: RangeInclusive<f64> = 50.0..=300.0;
    pub const MASS_RANGE: RangeInclusive<f64> = 1.0..=50.0;
    pub const ANGLE_RANGE: RangeInclusive<f64> = 5.0..=89.0;
    pub const GRAVITY_RANGE: RangeInclusive<f64> = 1.0..=20.0;
    pub const DAMPING_RANGE: RangeInclusive<f64> = 0.98..=1.0;

    /// String length in meters
    pub fn length_m(&self) -> f64 {
        self.length / 100.0
    }

    /// Initial angle in radians
    pub fn angle_rad(&self) -> f64 {
        self.angle.to_radians()
    }

    /// Small-angle period `2π√(L/g)`, for comparison with the measured one.
    pub fn small_angle_period(&self) -> f64 {
        2.0 * std::f64::consts::PI * (self.length_m() / self.gravity).sqrt()
    }

    /// Whether switching from `self` to `next` restarts the swing.
    ///
    /// Any change except damping does. Damping takes effect on the next step.
    pub fn restarts_dynamics(&self, next: &PendulumParams) -> bool {
        self.length != next.length
            || self.mass != next.mass
            || self.angle != next.angle
            || self.gravity != next.gravity
    }

    pub fn clamped(&self) -> Self {
        Self {
            length: clamp_to(self.length, &Self::LENGTH_RANGE),
            mass: clamp_to(self.mass, &Self::MASS_RANGE),
            angle: clamp_to(self.angle, &Self::ANGLE_RANGE),
            gravity: clamp_to(self.gravity, &Self::GRAVITY_RANGE),
            damping: clamp_to(self.damping, &Self::DAMPING_RANGE),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("length", self.length, &Self::LENGTH_RANGE)?;
        check_range("mass", self.mass, &Self::MASS_RANGE)?;
        check_range("angle", self.angle, &Self::ANGLE_RANGE)?;
        check_range("gravity", self.gravity, &Self::GRAVITY_RANGE)?;
        check_range("damping", self.damping, &Self::DAMPING_RANGE)?;
        Ok(())
    }
}

impl Default for PendulumParams {
    fn default() -> Self {
        Self {
            length: 200.0,
            mass: 10.0,
            angle: 45.0,
            gravity: constants::STANDARD_GRAVITY,
            damping: 0.995,
        }
    }
}

/// Gravity torque on a point mass at the end of a rigid massless string.
struct PendulumDynamics {
    gravity: f64,
    length: f64,
    damping: f64,
}

impl From<&PendulumParams> for PendulumDynamics {
    fn from(params: &PendulumParams) -> Self {
        Self {
            gravity: params.gravity,
            length: params.length_m(),
            damping: params.damping,
        }
    }
}

impl AccelerationModel for PendulumDynamics {
    fn acceleration(&self, state: &AxisState) -> f64 {
        -(self.gravity / self.length) * state.position.sin()
    }

    fn velocity_retention(&self) -> f64 {
        self.damping
    }
}

/// Complete pendulum state between steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendulumState {
    /// Radians from vertical
    pub angle: f64,
    /// rad/s
    pub angular_velocity: f64,
    /// rad/s²
    pub angular_acceleration: f64,
    /// Simulated seconds since the last restart
    pub time: f64,
    /// Bob positions relative to the pivot (m), oldest first
    pub trail: History<Vec2>,
    /// Accepted period samples (s), oldest first
    pub periods: History<f64>,
    /// Simulated time of the last zero crossing
    pub last_crossing: Option<f64>,
}

impl PendulumState {
    /// Bob released from rest at the initial angle.
    pub fn new(params: &PendulumParams) -> Self {
        Self {
            angle: params.angle_rad(),
            angular_velocity: 0.0,
            angular_acceleration: 0.0,
            time: 0.0,
            trail: History::with_capacity(constants::PENDULUM_TRAIL_CAPACITY),
            periods: History::with_capacity(constants::PERIOD_HISTORY_CAPACITY),
            last_crossing: None,
        }
    }

    /// Bob position relative to the pivot in meters (pivot at origin, y up).
    pub fn bob_position(&self, params: &PendulumParams) -> Vec2 {
        let length = params.length_m();
        Vec2::new(length * self.angle.sin(), -length * self.angle.cos())
    }

    /// Mean of the most recent period samples, 0 if none yet.
    pub fn average_period(&self) -> f64 {
        let window: Vec<f64> = self
            .periods
            .latest(constants::PERIOD_AVERAGE_WINDOW)
            .copied()
            .collect();
        if window.is_empty() {
            0.0
        } else {
            window.iter().sum::<f64>() / window.len() as f64
        }
    }

    fn record_crossing(&mut self) {
        if let Some(last) = self.last_crossing {
            let period = 2.0 * (self.time - last);
            if period > constants::MIN_PERIOD && period < constants::MAX_PERIOD {
                self.periods.push(period);
            }
        }
        self.last_crossing = Some(self.time);
    }
}

impl Default for PendulumState {
    fn default() -> Self {
        Self::new(&PendulumParams::default())
    }
}

/// Quantities derived from the pendulum state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PendulumMeasurement {
    /// s, 0 until a period has been measured
    pub period: f64,
    /// Hz, 0 while the period is 0
    pub frequency: f64,
    /// Bob speed in m/s
    pub velocity: f64,
    /// Tangential acceleration magnitude in m/s²
    pub acceleration: f64,
    /// Kinetic plus potential energy in J
    pub energy: f64,
}

/// Derive the measurement for a state.
pub fn measure(state: &PendulumState, params: &PendulumParams) -> PendulumMeasurement {
    let length = params.length_m();
    let velocity = (state.angular_velocity * length).abs();
    let acceleration = (state.angular_acceleration * length).abs();

    let potential = params.mass * params.gravity * length * (1.0 - state.angle.cos());
    let kinetic = 0.5 * params.mass * velocity * velocity;

    let period = state.average_period();
    let frequency = if period > 0.0 { 1.0 / period } else { 0.0 };

    PendulumMeasurement {
        period,
        frequency,
        velocity,
        acceleration,
        energy: potential + kinetic,
    }
}

/// Advance the pendulum by one fixed step.
pub fn step(
    mut state: PendulumState,
    params: &PendulumParams,
    dt: f64,
) -> (PendulumState, PendulumMeasurement) {
    let previous = state.angle;
    let result = Euler::step(
        &AxisState::new(state.angle, state.angular_velocity),
        &PendulumDynamics::from(params),
        dt,
    );

    state.angle = result.state.position;
    state.angular_velocity = result.state.velocity;
    state.angular_acceleration = result.acceleration;
    state.time += dt;

    let changed_side = previous != 0.0 && (previous > 0.0) != (state.angle > 0.0);
    let swinging_through = previous * state.angular_velocity < 0.0;
    if changed_side && swinging_through {
        state.record_crossing();
    }

    let bob = state.bob_position(params);
    state.trail.push(bob);

    let measurement = measure(&state, params);
    (state, measurement)
}

/// Bob diameter hint for drawing; grows with the square root of mass.
pub fn bob_diameter(mass: f64) -> f64 {
    mass.max(0.0).sqrt() * 6.0 + 10.0
}

/// A running pendulum instance: parameters plus exclusively owned state.
#[derive(Debug, Clone, Default)]
pub struct Pendulum {
    params: PendulumParams,
    state: PendulumState,
}

impl Pendulum {
    pub fn new(params: PendulumParams) -> Self {
        Self {
            state: PendulumState::new(&params),
            params,
        }
    }

    pub fn params(&self) -> &PendulumParams {
        &self.params
    }

    pub fn state(&self) -> &PendulumState {
        &self.state
    }

    /// Apply new parameters. Returns true if the swing was restarted.
    pub fn set_params(&mut self, params: PendulumParams) -> bool {
        let restart = self.params.restarts_dynamics(&params);
        self.params = params;
        if restart {
            log::debug!(
                "pendulum restarted at {:.1} deg, L={:.0}cm, g={:.2}",
                params.angle,
                params.length,
                params.gravity
            );
            self.reset();
        }
        restart
    }

    pub fn step(&mut self, dt: f64) -> PendulumMeasurement {
        let state = std::mem::take(&mut self.state);
        let (state, measurement) = step(state, &self.params, dt);
        self.state = state;
        measurement
    }

    pub fn measure(&self) -> PendulumMeasurement {
        measure(&self.state, &self.params)
    }

    pub fn reset(&mut self) {
        self.state = PendulumState::new(&self.params);
    }

    pub fn bob_position(&self) -> Vec2 {
        self.state.bob_position(&self.params)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const DT: f64 = constants::FIXED_DT;

    fn params(length: f64, angle: f64, damping: f64) -> PendulumParams {
        PendulumParams {
            length,
            angle,
            damping,
            ..PendulumParams::default()
        }
    }

    #[test]
    fn test_first_step_follows_euler_rule() {
        let p = params(200.0, 45.0, 0.995);
        let mut pendulum = Pendulum::new(p);
        pendulum.step(DT);

        let theta0 = 45f64.to_radians();
        let alpha = -(9.81 / 2.0) * theta0.sin();
        let omega = alpha * DT * 0.995;
        let theta = theta0 + omega * DT;

        let state = pendulum.state();
        assert_relative_eq!(state.angular_acceleration, alpha, epsilon = 1e-12);
        assert_relative_eq!(state.angular_velocity, omega, epsilon = 1e-12);
        assert_relative_eq!(state.angle, theta, epsilon = 1e-12);
    }

    #[test]
    fn test_mass_does_not_change_motion() {
        let light = PendulumParams {
            mass: 1.0,
            ..PendulumParams::default()
        };
        let heavy = PendulumParams {
            mass: 50.0,
            ..PendulumParams::default()
        };
        let mut a = Pendulum::new(light);
        let mut b = Pendulum::new(heavy);
        for _ in 0..300 {
            a.step(DT);
            b.step(DT);
        }
        assert_eq!(a.state().angle, b.state().angle);
        assert!(b.measure().energy > a.measure().energy);
    }

    #[test]
    fn test_no_period_before_two_crossings() {
        let mut pendulum = Pendulum::new(params(100.0, 10.0, 1.0));
        // Less than a quarter swing: no crossing yet
        for _ in 0..20 {
            let m = pendulum.step(DT);
            assert_eq!(m.period, 0.0);
            assert_eq!(m.frequency, 0.0);
        }
    }

    #[test]
    fn test_small_angle_period() {
        let p = params(100.0, 5.0, 1.0);
        let mut pendulum = Pendulum::new(p);
        let mut last = PendulumMeasurement::default();
        for _ in 0..(20.0 / DT) as usize {
            last = pendulum.step(DT);
        }

        let expected = p.small_angle_period();
        assert!(
            (last.period - expected).abs() / expected < 0.1,
            "measured period {} vs expected {}",
            last.period,
            expected
        );
        assert_relative_eq!(last.frequency, 1.0 / last.period, epsilon = 1e-12);
    }

    #[test]
    fn test_energy_decays_every_oscillation() {
        let mut pendulum = Pendulum::new(params(150.0, 40.0, 0.998));
        let mut samples = Vec::new();
        let mut previous = pendulum.state().angle;

        for _ in 0..(15.0 / DT) as usize {
            let m = pendulum.step(DT);
            let angle = pendulum.state().angle;
            // Sample once per oscillation: each + to - crossing
            if previous > 0.0 && angle <= 0.0 {
                samples.push(m.energy);
            }
            previous = angle;
        }

        assert!(samples.len() >= 4, "expected several oscillations");
        for pair in samples.windows(2) {
            assert!(
                pair[1] <= pair[0],
                "energy increased between oscillations: {} -> {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_energy_bounded_without_damping() {
        let mut pendulum = Pendulum::new(params(300.0, 20.0, 1.0));
        let initial = pendulum.measure().energy;
        for _ in 0..600 {
            let m = pendulum.step(DT);
            assert!(
                (m.energy - initial).abs() / initial < 0.05,
                "energy drifted to {} from {}",
                m.energy,
                initial
            );
        }
    }

    #[test]
    fn test_initial_energy_is_potential() {
        let p = PendulumParams::default();
        let pendulum = Pendulum::new(p);
        let expected = p.mass * p.gravity * p.length_m() * (1.0 - p.angle_rad().cos());
        assert_relative_eq!(pendulum.measure().energy, expected, epsilon = 1e-12);
        assert_eq!(pendulum.measure().velocity, 0.0);
    }

    #[test]
    fn test_trail_is_bounded_and_tracks_bob() {
        let mut pendulum = Pendulum::default();
        for _ in 0..200 {
            pendulum.step(DT);
        }
        let trail = &pendulum.state().trail;
        assert_eq!(trail.len(), constants::PENDULUM_TRAIL_CAPACITY);
        assert_eq!(trail.newest(), Some(&pendulum.bob_position()));
    }

    #[test]
    fn test_period_history_is_bounded() {
        let mut pendulum = Pendulum::new(params(50.0, 20.0, 1.0));
        for _ in 0..(120.0 / DT) as usize {
            pendulum.step(DT);
        }
        let periods = &pendulum.state().periods;
        assert_eq!(periods.len(), constants::PERIOD_HISTORY_CAPACITY);
        assert!(periods
            .iter()
            .all(|&p| p > constants::MIN_PERIOD && p < constants::MAX_PERIOD));
    }

    #[test]
    fn test_param_change_restarts_swing() {
        let mut pendulum = Pendulum::default();
        for _ in 0..100 {
            pendulum.step(DT);
        }

        let moved = PendulumParams {
            angle: 30.0,
            ..PendulumParams::default()
        };
        assert!(pendulum.set_params(moved));
        let state = pendulum.state();
        assert_relative_eq!(state.angle, 30f64.to_radians());
        assert_eq!(state.angular_velocity, 0.0);
        assert!(state.trail.is_empty());
        assert!(state.periods.is_empty());
    }

    #[test]
    fn test_damping_change_keeps_swing() {
        let mut pendulum = Pendulum::default();
        for _ in 0..100 {
            pendulum.step(DT);
        }
        let before = pendulum.state().clone();

        let damped = PendulumParams {
            damping: 0.99,
            ..PendulumParams::default()
        };
        assert!(!pendulum.set_params(damped));
        assert_eq!(pendulum.state(), &before);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut pendulum = Pendulum::default();
        for _ in 0..250 {
            pendulum.step(DT);
        }
        pendulum.reset();
        let first = pendulum.state().clone();
        pendulum.reset();
        assert_eq!(pendulum.state(), &first);
        assert_eq!(first, PendulumState::new(pendulum.params()));
    }

    #[test]
    fn test_clamped_params() {
        let wild = PendulumParams {
            length: 10.0,
            mass: 100.0,
            angle: 120.0,
            gravity: f64::NAN,
            damping: 1.5,
        };
        assert!(wild.validate().is_err());

        let clamped = wild.clamped();
        assert_eq!(clamped.length, 50.0);
        assert_eq!(clamped.mass, 50.0);
        assert_eq!(clamped.angle, 89.0);
        assert_eq!(clamped.gravity, 1.0);
        assert_eq!(clamped.damping, 1.0);
        assert!(clamped.validate().is_ok());
    }

    #[test]
    fn test_bob_diameter_grows_with_mass() {
        assert_relative_eq!(bob_diameter(1.0), 16.0);
        assert!(bob_diameter(25.0) > bob_diameter(4.0));
    }
}
