//! Discrete PID law for the arm joint.
//!
//! The controller works in encoder ticks and loop iterations: there is no
//! `dt`, every call to [`PidState::update`] is one iteration of the hold
//! loop. Gains live in [`PidGains`], whose fields are individually atomic so
//! a tuning dashboard can change them while the loop is running; the loop
//! reads a [`GainSnapshot`] once per iteration.
//!
//! # Example
//!
//! ```rust
//! use armos_hal::pid::{PidGains, PidState};
//!
//! let gains = PidGains::new(0.001, 0.0, 0.0, 0.05);
//! let mut pid = PidState::default();
//!
//! // error = current - target
//! let power = pid.update(-1000, &gains.snapshot());
//! assert!((power + 1.0).abs() < 1e-9);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use armos_types::ControlConfig;

/// Live-tunable gains shared between the tuning surface and the hold loop.
#[derive(Debug)]
pub struct PidGains {
    kp: AtomicF64,
    ki: AtomicF64,
    kd: AtomicF64,
    integral_max_power: AtomicF64,
}

/// Gains as read at the start of one loop iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainSnapshot {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Largest power the integral term alone may contribute.
    pub integral_max_power: f64,
}

impl PidGains {
    pub fn new(kp: f64, ki: f64, kd: f64, integral_max_power: f64) -> Self {
        Self {
            kp: AtomicF64::new(kp),
            ki: AtomicF64::new(ki),
            kd: AtomicF64::new(kd),
            integral_max_power: AtomicF64::new(integral_max_power),
        }
    }

    pub fn from_config(config: &ControlConfig) -> Self {
        Self::new(config.kp, config.ki, config.kd, config.integral_max_power)
    }

    /// Update the proportional, integral, and derivative gains.
    ///
    /// Each gain is stored independently; a concurrent reader may observe a
    /// mix of old and new values for one iteration.
    pub fn set_gains(&self, kp: f64, ki: f64, kd: f64) {
        self.kp.store(kp);
        self.ki.store(ki);
        self.kd.store(kd);
    }

    pub fn set_integral_max_power(&self, value: f64) {
        self.integral_max_power.store(value);
    }

    pub fn snapshot(&self) -> GainSnapshot {
        GainSnapshot {
            kp: self.kp.load(),
            ki: self.ki.load(),
            kd: self.kd.load(),
            integral_max_power: self.integral_max_power.load(),
        }
    }
}

impl Default for PidGains {
    fn default() -> Self {
        Self::from_config(&ControlConfig::default())
    }
}

/// Integrator and derivative memory of the hold loop.
///
/// Owned by exactly one control thread.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PidState {
    prev_error: i32,
    integral: i64,
}

impl PidState {
    /// Compute the power for one iteration given `error = current - target`.
    ///
    /// The integral is clamped so `|integral * ki|` never exceeds
    /// `integral_max_power`. Returns exactly `0.0` when `error` is zero.
    pub fn update(&mut self, error: i32, gains: &GainSnapshot) -> f64 {
        let error_change = i64::from(error) - i64::from(self.prev_error);

        self.integral = self.integral.saturating_add(i64::from(error));
        if gains.ki != 0.0 {
            let limit = gains.integral_max_power / gains.ki.abs();
            if self.integral.unsigned_abs() as f64 > limit {
                // Truncate like an integer cast so the bound is never exceeded.
                self.integral = limit.trunc() as i64 * self.integral.signum();
            }
        }

        let power = if error == 0 {
            0.0
        } else {
            gains.kp * f64::from(error)
                + gains.kd * error_change as f64
                + gains.ki * self.integral as f64
        };
        self.prev_error = error;
        power
    }

    /// Forget accumulated integral and derivative memory.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn integral(&self) -> i64 {
        self.integral
    }

    pub fn prev_error(&self) -> i32 {
        self.prev_error
    }
}

/// `f64` stored as its bit pattern in an [`AtomicU64`].
#[derive(Debug)]
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gains(kp: f64, ki: f64, kd: f64, max: f64) -> GainSnapshot {
        PidGains::new(kp, ki, kd, max).snapshot()
    }

    #[test]
    fn proportional_only_output() {
        let mut pid = PidState::default();
        // error = -1000 → output = 0.001 * -1000 = -1.0
        let output = pid.update(-1000, &gains(0.001, 0.0, 0.0, 0.05));
        assert!((output + 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_error_yields_exact_zero() {
        let mut pid = PidState::default();
        // Limit of 100 ticks keeps the clamp out of the way.
        let g = gains(1.0, 1.0, 1.0, 100.0);
        pid.update(50, &g);
        // Integral and derivative are non-zero but the output is still zero.
        assert_eq!(pid.update(0, &g), 0.0);
        assert_eq!(pid.integral(), 50);
    }

    #[test]
    fn integral_is_clamped_to_max_power() {
        let mut pid = PidState::default();
        let g = gains(0.0, 0.001, 0.0, 0.05);
        for _ in 0..10 {
            pid.update(30, &g);
        }
        // 0.05 / 0.001 = 50 ticks of accumulated error at most.
        assert_eq!(pid.integral(), 50);
        let output = pid.update(30, &g);
        assert!((output - 0.05).abs() < 1e-9);
    }

    #[test]
    fn integral_clamp_preserves_sign() {
        let mut pid = PidState::default();
        let g = gains(0.0, 0.01, 0.0, 0.5);
        for _ in 0..10 {
            pid.update(-20, &g);
        }
        assert_eq!(pid.integral(), -50);
    }

    #[test]
    fn zero_ki_disables_clamp() {
        let mut pid = PidState::default();
        let g = gains(0.0, 0.0, 0.0, 0.05);
        for _ in 0..100 {
            pid.update(1000, &g);
        }
        assert_eq!(pid.integral(), 100_000);
    }

    #[test]
    fn derivative_uses_previous_error() {
        let mut pid = PidState::default();
        let g = gains(0.0, 0.0, 0.5, 0.0);
        pid.update(10, &g);
        // error_change = 4 - 10 = -6 → output = -3.0
        let output = pid.update(4, &g);
        assert!((output + 3.0).abs() < 1e-9);
        assert_eq!(pid.prev_error(), 4);
    }

    #[test]
    fn reset_clears_state() {
        let mut pid = PidState::default();
        let g = gains(1.0, 1.0, 1.0, 100.0);
        pid.update(25, &g);
        pid.reset();
        assert_eq!(pid, PidState::default());

        let mut fresh = PidState::default();
        assert!((pid.update(7, &g) - fresh.update(7, &g)).abs() < 1e-12);
    }

    #[test]
    fn live_gain_update_is_visible_in_next_snapshot() {
        let shared = PidGains::new(1.0, 0.0, 0.0, 0.05);
        shared.set_gains(3.0, 0.002, 0.1);
        shared.set_integral_max_power(0.2);
        let snap = shared.snapshot();
        assert_eq!(snap.kp, 3.0);
        assert_eq!(snap.ki, 0.002);
        assert_eq!(snap.kd, 0.1);
        assert_eq!(snap.integral_max_power, 0.2);
    }

    #[test]
    fn default_gains_match_control_config() {
        let snap = PidGains::default().snapshot();
        assert_eq!(snap.kp, 0.000945);
        assert_eq!(snap.ki, 0.001);
        assert_eq!(snap.kd, 0.0);
        assert_eq!(snap.integral_max_power, 0.05);
    }
}
