//! Frame timing: turning host timestamps into fixed physics steps.
//!
//! The host calls into the lab once per animation frame with a wall-clock
//! timestamp. [`FrameClock`] converts those into per-frame deltas that only
//! accumulate while running, and [`FixedTimestep`] slices the deltas into
//! whole `dt` steps so the integrators stay deterministic regardless of the
//! actual frame rate.

use serde::{Deserialize, Serialize};

use crate::types::constants;

/// Wall-clock to frame-delta conversion.
///
/// While paused the clock forgets its anchor. The first running frame after
/// a pause therefore yields a zero delta, and the paused interval never
/// reaches the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameClock {
    last: Option<f64>,
    max_frame_delta: f64,
}

impl FrameClock {
    /// A negative maximum is treated as zero, a non-finite one as the default.
    pub fn new(max_frame_delta: f64) -> Self {
        let max_frame_delta = if max_frame_delta.is_finite() {
            max_frame_delta.max(0.0)
        } else {
            constants::MAX_FRAME_DELTA
        };
        Self {
            last: None,
            max_frame_delta,
        }
    }

    /// Delta in seconds since the previous running frame, clamped to the
    /// configured maximum. Returns zero while paused.
    pub fn tick(&mut self, now: f64, running: bool) -> f64 {
        if !running {
            self.last = None;
            return 0.0;
        }

        let delta = match self.last {
            Some(last) => (now - last).clamp(0.0, self.max_frame_delta),
            None => 0.0,
        };
        self.last = Some(now);
        delta
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(constants::MAX_FRAME_DELTA)
    }
}

/// Accumulator that releases time in fixed `dt` increments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedTimestep {
    dt: f64,
    accumulator: f64,
    max_steps: usize,
}

impl FixedTimestep {
    /// A `dt` that is not a positive finite number is replaced by the
    /// default fixed step.
    pub fn new(dt: f64, max_steps: usize) -> Self {
        let dt = if dt.is_finite() && dt > 0.0 {
            dt
        } else {
            log::warn!("invalid fixed step {}, using {:.4}s", dt, constants::FIXED_DT);
            constants::FIXED_DT
        };
        Self {
            dt,
            accumulator: 0.0,
            max_steps: max_steps.max(1),
        }
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Add a frame delta and return how many fixed steps to run now.
    ///
    /// At most `max_steps` are released per frame. Whatever is left over after
    /// that is dropped rather than carried, so a stalled host cannot trigger a
    /// burst of catch-up steps.
    pub fn advance(&mut self, frame_delta: f64) -> usize {
        if frame_delta.is_finite() && frame_delta > 0.0 {
            self.accumulator += frame_delta;
        }

        // Tolerance keeps 1/60 + 1/60 + ... from landing a hair under dt
        let tolerance = self.dt * 1e-9;
        let mut steps = 0;
        while self.accumulator + tolerance >= self.dt && steps < self.max_steps {
            self.accumulator -= self.dt;
            steps += 1;
        }
        self.accumulator = self.accumulator.max(0.0);

        if self.accumulator >= self.dt {
            log::trace!(
                "dropping {:.4}s of frame time after {} steps",
                self.accumulator,
                steps
            );
            self.accumulator %= self.dt;
        }

        steps
    }

    /// Fraction of a step currently accumulated, for render interpolation.
    pub fn alpha(&self) -> f64 {
        (self.accumulator / self.dt).clamp(0.0, 1.0)
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

impl Default for FixedTimestep {
    fn default() -> Self {
        Self::new(constants::FIXED_DT, 8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_first_frame_has_zero_delta() {
        let mut clock = FrameClock::default();
        assert_eq!(clock.tick(12.0, true), 0.0);
        assert_relative_eq!(clock.tick(12.016, true), 0.016, epsilon = 1e-12);
    }

    #[test]
    fn test_pause_does_not_leak_into_delta() {
        let mut clock = FrameClock::default();
        clock.tick(0.0, true);
        clock.tick(0.05, true);

        // Ten seconds of paused frames
        for i in 0..600 {
            assert_eq!(clock.tick(0.05 + i as f64 / 60.0, false), 0.0);
        }

        // Resume: re-anchors, then normal deltas
        assert_eq!(clock.tick(10.05, true), 0.0);
        assert_relative_eq!(clock.tick(10.07, true), 0.02, epsilon = 1e-9);
    }

    #[test]
    fn test_large_gap_is_clamped() {
        let mut clock = FrameClock::new(0.1);
        clock.tick(0.0, true);
        assert_eq!(clock.tick(5.0, true), 0.1);
        // Time going backwards yields nothing
        assert_eq!(clock.tick(4.0, true), 0.0);
    }

    #[test]
    fn test_negative_max_delta_yields_zero() {
        let mut clock = FrameClock::new(-1.0);
        assert_eq!(clock.tick(0.0, true), 0.0);
        assert_eq!(clock.tick(0.5, true), 0.0);

        let mut clock = FrameClock::new(f64::NAN);
        clock.tick(0.0, true);
        assert_eq!(clock.tick(5.0, true), constants::MAX_FRAME_DELTA);
    }

    #[test]
    fn test_non_positive_dt_replaced() {
        for dt in [0.0, -0.01, f64::NAN, f64::INFINITY] {
            let mut stepper = FixedTimestep::new(dt, 8);
            assert_eq!(stepper.dt(), constants::FIXED_DT);
            assert_eq!(stepper.advance(0.05), 3);
            assert!(stepper.alpha().is_finite());
        }
    }

    #[test]
    fn test_accumulator_releases_whole_steps() {
        let mut stepper = FixedTimestep::new(0.01, 100);
        assert_eq!(stepper.advance(0.025), 2);
        assert_relative_eq!(stepper.alpha(), 0.5, epsilon = 1e-9);
        assert_eq!(stepper.advance(0.005), 1);
        assert!(stepper.alpha() < 1e-6);
    }

    #[test]
    fn test_sixty_hz_frames_give_one_step_each() {
        let mut stepper = FixedTimestep::default();
        let total: usize = (0..600).map(|_| stepper.advance(1.0 / 60.0)).sum();
        assert_eq!(total, 600);
    }

    #[test]
    fn test_step_cap_drops_excess() {
        let mut stepper = FixedTimestep::new(0.01, 3);
        assert_eq!(stepper.advance(0.055), 3);
        assert_relative_eq!(stepper.alpha(), 0.5, epsilon = 1e-6);
        assert_eq!(stepper.advance(0.0), 0);
    }

    #[test]
    fn test_non_finite_delta_ignored() {
        let mut stepper = FixedTimestep::default();
        assert_eq!(stepper.advance(f64::NAN), 0);
        assert_eq!(stepper.advance(-1.0), 0);
        assert_eq!(stepper.alpha(), 0.0);
    }
}
