//! Projectile launched from ground level over flat ground.
//!
//! ## Lifecycle
//!
//! ```text
//!            start()              ground contact
//!   Idle ───────────────► Launched ─────────────► Landed
//!    ▲                                              │
//!    └──────────── reset() / start() ◄──────────────┘
//! ```
//!
//! Launching captures the parameters in effect at that instant. Later edits to
//! the live parameters never touch a trajectory in flight; they are picked up
//! by the next launch.
//!
//! The position is evaluated in closed form from the accumulated elapsed time:
//!
//! ```text
//! x = vx * t
//! y = vy * t - 0.5 * g * t²
//! ```
//!
//! so pausing (not stepping) and resuming continues from the same `t`.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use crate::config::{check_range, clamp_to, ConfigError};
use crate::history::History;
use crate::types::{constants, Vec2};

/// User-adjustable launch parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileParams {
    /// Launch speed in m/s
    pub speed: f64,
    /// Launch angle above horizontal in degrees
    pub angle: f64,
    /// Gravitational acceleration in m/s²
    pub gravity: f64,
}

impl ProjectileParams {
    pub const SPEED_RANGE: RangeInclusive<f64> = 10.0..=100.0;
    pub const ANGLE_RANGE: RangeInclusive<f64> = 5.0..=85.0;
    pub const GRAVITY_RANGE: RangeInclusive<f64> = 1.0..=20.0;

    /// Launch velocity (m/s), y up.
    pub fn launch_velocity(&self) -> Vec2 {
        Vec2::from_polar(self.speed, self.angle.to_radians())
    }

    /// Position relative to the launch point `t` seconds after launch.
    pub fn position_at(&self, t: f64) -> Vec2 {
        self.launch_velocity() * t - Vec2::new(0.0, 0.5 * self.gravity * t * t)
    }

    /// Velocity `t` seconds after launch.
    pub fn velocity_at(&self, t: f64) -> Vec2 {
        self.launch_velocity() - Vec2::new(0.0, self.gravity * t)
    }

    /// Time until the projectile is back at launch height.
    pub fn flight_time(&self) -> f64 {
        2.0 * self.launch_velocity().y / self.gravity
    }

    /// Horizontal distance covered at landing.
    pub fn range(&self) -> f64 {
        self.speed * self.speed * (2.0 * self.angle.to_radians()).sin() / self.gravity
    }

    pub fn max_height(&self) -> f64 {
        let vy = self.launch_velocity().y;
        vy * vy / (2.0 * self.gravity)
    }

    pub fn clamped(&self) -> Self {
        Self {
            speed: clamp_to(self.speed, &Self::SPEED_RANGE),
            angle: clamp_to(self.angle, &Self::ANGLE_RANGE),
            gravity: clamp_to(self.gravity, &Self::GRAVITY_RANGE),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("speed", self.speed, &Self::SPEED_RANGE)?;
        check_range("angle", self.angle, &Self::ANGLE_RANGE)?;
        check_range("gravity", self.gravity, &Self::GRAVITY_RANGE)?;
        Ok(())
    }
}

impl Default for ProjectileParams {
    fn default() -> Self {
        Self {
            speed: 50.0,
            angle: 45.0,
            gravity: constants::STANDARD_GRAVITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Waiting at the launch point, showing the predicted trajectory
    Idle,
    /// In flight
    Launched,
    /// Back on the ground; terminal until the next launch
    Landed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileState {
    pub phase: Phase,
    /// Simulated seconds since launch
    pub elapsed: f64,
    /// Meters from the launch point, y up
    pub position: Vec2,
    /// Positions visited during the current flight, oldest first
    pub trail: History<Vec2>,
    /// Parameters captured at launch
    pub launch: Option<ProjectileParams>,
}

impl ProjectileState {
    pub fn idle() -> Self {
        Self {
            phase: Phase::Idle,
            elapsed: 0.0,
            position: Vec2::ZERO,
            trail: History::with_capacity(constants::PROJECTILE_TRAIL_CAPACITY),
            launch: None,
        }
    }

    /// Begin a flight with `params` frozen for its duration.
    pub fn launched(params: &ProjectileParams) -> Self {
        Self {
            phase: Phase::Launched,
            launch: Some(*params),
            ..Self::idle()
        }
    }

    /// Parameters governing the current flight: the launch snapshot if there
    /// is one, otherwise the live parameters.
    pub fn flight_params(&self, live: &ProjectileParams) -> ProjectileParams {
        self.launch.unwrap_or(*live)
    }
}

impl Default for ProjectileState {
    fn default() -> Self {
        Self::idle()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectileMeasurement {
    /// Seconds since launch
    pub time: f64,
    /// Horizontal distance from the launch point (m)
    pub distance: f64,
    /// Height above ground (m)
    pub height: f64,
    /// Instantaneous speed (m/s)
    pub speed: f64,
    /// Launch angle (degrees)
    pub angle: f64,
    /// Gravity of the flight (m/s²)
    pub gravity: f64,
}

pub fn measure(state: &ProjectileState, params: &ProjectileParams) -> ProjectileMeasurement {
    let flight = state.flight_params(params);
    let velocity = flight.velocity_at(state.elapsed);
    ProjectileMeasurement {
        time: state.elapsed,
        distance: state.position.x,
        height: state.position.y,
        speed: velocity.magnitude(),
        angle: flight.angle,
        gravity: flight.gravity,
    }
}

/// Advance a flight by one fixed step. Idle and landed states are returned
/// unchanged.
pub fn step(
    mut state: ProjectileState,
    params: &ProjectileParams,
    dt: f64,
) -> (ProjectileState, ProjectileMeasurement) {
    if state.phase != Phase::Launched {
        let measurement = measure(&state, params);
        return (state, measurement);
    }

    let flight = state.flight_params(params);
    let landing = flight.flight_time();

    state.elapsed += dt;
    if state.elapsed >= landing {
        state.elapsed = landing;
        state.position = Vec2::new(flight.range(), 0.0);
        state.phase = Phase::Landed;
        log::info!(
            "projectile landed after {:.2}s at {:.2}m",
            landing,
            state.position.x
        );
    } else {
        state.position = flight.position_at(state.elapsed);
    }
    state.trail.push(state.position);

    let measurement = measure(&state, params);
    (state, measurement)
}

/// Closed-form trajectory for the first few seconds at `params`, clipped to
/// points at or above the ground.
pub fn predicted_trajectory(params: &ProjectileParams) -> Vec<Vec2> {
    let samples = (constants::PREDICTION_HORIZON / constants::PREDICTION_STEP).round() as usize;
    (0..=samples)
        .map(|i| params.position_at(i as f64 * constants::PREDICTION_STEP))
        .filter(|p| p.y >= 0.0)
        .collect()
}

/// A projectile instance: live parameters plus exclusively owned state.
#[derive(Debug, Clone, Default)]
pub struct Projectile {
    params: ProjectileParams,
    state: ProjectileState,
}

impl Projectile {
    pub fn new(params: ProjectileParams) -> Self {
        Self {
            params,
            state: ProjectileState::idle(),
        }
    }

    pub fn params(&self) -> &ProjectileParams {
        &self.params
    }

    pub fn state(&self) -> &ProjectileState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Update the live parameters. A projectile on the ground returns to the
    /// launch point so the prediction matches; one in flight is unaffected.
    /// Returns true if the state was reset.
    pub fn set_params(&mut self, params: ProjectileParams) -> bool {
        self.params = params;
        if self.state.phase == Phase::Launched {
            false
        } else {
            self.state = ProjectileState::idle();
            true
        }
    }

    /// The running flag went from false to true. Launches unless already in
    /// flight. Returns true if a launch happened.
    pub fn start(&mut self) -> bool {
        if self.state.phase == Phase::Launched {
            return false;
        }
        self.state = ProjectileState::launched(&self.params);
        log::info!(
            "projectile launched at {:.1} m/s, {:.1} deg, g={:.2}",
            self.params.speed,
            self.params.angle,
            self.params.gravity
        );
        true
    }

    pub fn step(&mut self, dt: f64) -> ProjectileMeasurement {
        let state = std::mem::take(&mut self.state);
        let (state, measurement) = step(state, &self.params, dt);
        self.state = state;
        measurement
    }

    pub fn measure(&self) -> ProjectileMeasurement {
        measure(&self.state, &self.params)
    }

    pub fn reset(&mut self) {
        self.state = ProjectileState::idle();
    }

    /// The drawing surface changed size. Only a projectile that is not in
    /// flight may be moved back to the launch point.
    pub fn handle_resize(&mut self) {
        if self.state.phase != Phase::Launched {
            self.reset();
        }
    }

    /// Trajectory to draw while not in flight.
    pub fn predicted_trajectory(&self) -> Vec<Vec2> {
        predicted_trajectory(&self.params)
    }
}

// =============================================================================
// Tests
// =============================================================================
