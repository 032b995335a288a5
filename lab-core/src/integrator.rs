//! Fixed-step velocity-first Euler integration along a single axis.
//!
//! The pendulum (angle) and free fall (distance) are both one-dimensional ODEs
//! advanced once per fixed step. They share the same update order:
//!
//! ```text
//! 1. a      = a(x, v)
//! 2. v_new  = (v + a*dt) * retention
//! 3. x_new  = x + v_new*dt
//! ```
//!
//! Velocity is updated before position. This is the first-order scheme the lab
//! has always used; it drifts in energy over long runs and no attempt is made
//! to correct that. The projectile and wave cores are evaluated in closed form
//! and do not go through here.

use serde::{Deserialize, Serialize};

/// Position and velocity along one generalized coordinate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisState {
    pub position: f64,
    pub velocity: f64,
}

impl AxisState {
    pub fn new(position: f64, velocity: f64) -> Self {
        Self { position, velocity }
    }

    pub fn at_rest(position: f64) -> Self {
        Self {
            position,
            velocity: 0.0,
        }
    }
}

/// Result of an integration step, containing the new state and the
/// acceleration that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegrationResult {
    pub state: AxisState,
    pub acceleration: f64,
}

/// Physics model supplying the acceleration along the axis.
pub trait AccelerationModel {
    /// Acceleration given the current state.
    fn acceleration(&self, state: &AxisState) -> f64;

    /// Multiplier applied to the velocity after each step.
    /// Default implementation: no damping.
    fn velocity_retention(&self) -> f64 {
        1.0
    }
}

/// Velocity-first Euler integrator: velocity is updated, then position.
pub struct Euler;

impl Euler {
    /// Advance the state by one time step.
    ///
    /// # Arguments
    /// * `state` - Current position and velocity
    /// * `model` - Supplies acceleration and per-step velocity retention
    /// * `dt` - Time step in seconds
    pub fn step<M: AccelerationModel>(state: &AxisState, model: &M, dt: f64) -> IntegrationResult {
        let acceleration = model.acceleration(state);

        let velocity = (state.velocity + acceleration * dt) * model.velocity_retention();
        let position = state.position + velocity * dt;

        IntegrationResult {
            state: AxisState { position, velocity },
            acceleration,
        }
    }

    /// Advance the state by `steps` consecutive steps of `dt`.
    pub fn step_n<M: AccelerationModel>(
        state: &AxisState,
        model: &M,
        dt: f64,
        steps: usize,
    ) -> IntegrationResult {
        let mut current = IntegrationResult {
            state: *state,
            acceleration: 0.0,
        };

        for _ in 0..steps {
            current = Self::step(&current.state, model, dt);
        }

        current
    }
}

// =============================================================================
// Tests
// =============================================================================
