//! Collaborators injected into the combined mover.
//!
//! The mover knows nothing about the robot's shape. Whether a wrist move
//! would spill the payload, whether the wrist must be tucked while the arm
//! swings, and how much power to apply all come from the three traits here.
//! Closures with the matching signature implement each trait, so tests can
//! pass a one-liner; the built-in structs cover the robot's default geometry.
//!
//! # Example
//!
//! ```rust
//! use armos_kernel::safety::{PayloadSafety, WristDanger};
//!
//! let never_safe = |_arm: i32, _wrist: f64| false;
//! assert!(!never_safe.is_safe(0, 0.5));
//!
//! let near_floor = |target: i32| target < 100;
//! assert!(near_floor.is_dangerous(50));
//! ```

use armos_types::{Direction, MoverConfig, SafetyConfig};

// ────────────────────────────────────────────────────────────────────────────
// Traits
// ────────────────────────────────────────────────────────────────────────────

/// Can the wrist move to `wrist_target` while the arm is at `arm_position`
/// without dropping the payload?
pub trait PayloadSafety: Send + Sync {
    fn is_safe(&self, arm_position: i32, wrist_target: f64) -> bool;
}

/// Must the wrist be tucked in while the arm travels to `arm_target`?
pub trait WristDanger: Send + Sync {
    fn is_dangerous(&self, arm_target: i32) -> bool;
}

/// Arm motor power for moving from `current` towards `target` (ticks).
pub trait PowerCalculator: Send + Sync {
    fn power(&self, current: i32, target: i32) -> f64;
}

impl<F> PayloadSafety for F
where
    F: Fn(i32, f64) -> bool + Send + Sync,
{
    fn is_safe(&self, arm_position: i32, wrist_target: f64) -> bool {
        self(arm_position, wrist_target)
    }
}

impl<F> WristDanger for F
where
    F: Fn(i32) -> bool + Send + Sync,
{
    fn is_dangerous(&self, arm_target: i32) -> bool {
        self(arm_target)
    }
}

impl<F> PowerCalculator for F
where
    F: Fn(i32, i32) -> f64 + Send + Sync,
{
    fn power(&self, current: i32, target: i32) -> f64 {
        self(current, target)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Built-ins
// ────────────────────────────────────────────────────────────────────────────

/// `power = sign * kp * (target - current)`, clamped to `±max_power`.
///
/// `sign` follows the motor direction so a positive error always drives the
/// encoder towards the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProportionalPowerCalculator {
    pub kp: f64,
    pub max_power: f64,
    pub direction: Direction,
}

impl ProportionalPowerCalculator {
    pub fn new(kp: f64, max_power: f64, direction: Direction) -> Self {
        Self {
            kp,
            max_power,
            direction,
        }
    }

    pub fn from_config(mover: &MoverConfig, direction: Direction) -> Self {
        Self::new(mover.power_kp, mover.max_power, direction)
    }
}

impl PowerCalculator for ProportionalPowerCalculator {
    fn power(&self, current: i32, target: i32) -> f64 {
        let error = f64::from(target) - f64::from(current);
        let limit = self.max_power.abs();
        (self.direction.sign() * self.kp * error).clamp(-limit, limit)
    }
}

/// Arm targets inside `[min, max]` put a swinging wrist into the chassis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DangerZone {
    pub min: i32,
    pub max: i32,
}

impl DangerZone {
    pub fn from_config(config: &SafetyConfig) -> Self {
        Self {
            min: config.danger_zone_min,
            max: config.danger_zone_max,
        }
    }
}

impl WristDanger for DangerZone {
    fn is_dangerous(&self, arm_target: i32) -> bool {
        (self.min..=self.max).contains(&arm_target)
    }
}

/// While the arm is inside `[min, max]`, opening the wrist past
/// `wrist_max` spills the payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarryZone {
    pub min: i32,
    pub max: i32,
    pub wrist_max: f64,
}

impl CarryZone {
    pub fn from_config(config: &SafetyConfig) -> Self {
        Self {
            min: config.carry_zone_min,
            max: config.carry_zone_max,
            wrist_max: config.carry_wrist_max,
        }
    }
}

impl PayloadSafety for CarryZone {
    fn is_safe(&self, arm_position: i32, wrist_target: f64) -> bool {
        !(self.min..=self.max).contains(&arm_position) || wrist_target <= self.wrist_max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proportional_power_saturates() {
        let calc = ProportionalPowerCalculator::new(0.001, 1.0, Direction::Forward);
        assert_eq!(calc.power(0, 1000), 1.0);
        assert_eq!(calc.power(0, 5000), 1.0);
        assert_eq!(calc.power(1000, 0), -1.0);
        assert!((calc.power(0, 500) - 0.5).abs() < 1e-12);
        assert_eq!(calc.power(42, 42), 0.0);
    }

    #[test]
    fn reverse_direction_flips_sign() {
        let calc = ProportionalPowerCalculator::new(0.001, 0.8, Direction::Reverse);
        assert_eq!(calc.power(0, 1000), -0.8);
        assert!((calc.power(0, 200) + 0.2).abs() < 1e-12);
    }

    #[test]
    fn danger_zone_is_inclusive() {
        let zone = DangerZone { min: -600, max: 400 };
        assert!(zone.is_dangerous(-600));
        assert!(zone.is_dangerous(0));
        assert!(zone.is_dangerous(400));
        assert!(!zone.is_dangerous(401));
        assert!(!zone.is_dangerous(-601));
    }

    #[test]
    fn carry_zone_only_restricts_inside_range() {
        let zone = CarryZone::from_config(&SafetyConfig::default());
        // Outside the zone anything goes.
        assert!(zone.is_safe(0, 1.0));
        assert!(zone.is_safe(5000, 0.9));
        // Inside the zone the wrist may not open past the limit.
        assert!(zone.is_safe(2000, 0.6));
        assert!(!zone.is_safe(2000, 0.61));
    }

    #[test]
    fn closures_implement_traits() {
        let calc = |current: i32, target: i32| if target > current { 0.3 } else { -0.3 };
        assert_eq!(calc.power(0, 10), 0.3);
        let safe = |arm: i32, _wrist: f64| arm > 0;
        assert!(safe.is_safe(1, 0.0));
        assert!(!safe.is_safe(-1, 0.0));
    }
}
