//! Startup configuration for the arm and wrist.
//!
//! Every section carries `serde` defaults matching the tuned values of the
//! competition robot, so an empty TOML document is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::{ArmError, Direction};

/// Encoder counts per motor-shaft revolution of the arm gearmotor.
pub fn arm_encoder_resolution() -> f64 {
    (1.0 + 46.0 / 17.0_f64).powi(3) * 28.0
}

/// Top-level configuration bundle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArmConfig {
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub mover: MoverConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
    #[serde(default)]
    pub geometry: GeometryConfig,
    #[serde(default)]
    pub presets: ArmPresets,
    #[serde(default)]
    pub wrist_presets: WristPresets,
}

impl ArmConfig {
    /// Check the cross-field constraints `serde` cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::InvalidParameter`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ArmError> {
        let c = &self.control;
        for (name, value) in [
            ("control.kp", c.kp),
            ("control.ki", c.ki),
            ("control.kd", c.kd),
        ] {
            if !value.is_finite() {
                return Err(invalid(name, format!("{value} is not finite")));
            }
        }
        if !(c.integral_max_power >= 0.0) {
            return Err(invalid(
                "control.integral_max_power",
                format!("{} must be non-negative", c.integral_max_power),
            ));
        }

        let m = &self.mover;
        if m.arm_epsilon <= 0 {
            return Err(invalid("mover.arm_epsilon", "must be positive"));
        }
        if !(m.wrist_epsilon > 0.0 && m.wrist_epsilon < 1.0) {
            return Err(invalid("mover.wrist_epsilon", "must be in (0, 1)"));
        }
        if !(0.0..=1.0).contains(&m.safe_wrist_position) {
            return Err(invalid("mover.safe_wrist_position", "must be in [0, 1]"));
        }
        if !(m.max_power > 0.0 && m.max_power <= 1.0) {
            return Err(invalid("mover.max_power", "must be in (0, 1]"));
        }

        let s = &self.safety;
        if s.danger_zone_min > s.danger_zone_max {
            return Err(invalid("safety.danger_zone_min", "exceeds danger_zone_max"));
        }
        if s.carry_zone_min > s.carry_zone_max {
            return Err(invalid("safety.carry_zone_min", "exceeds carry_zone_max"));
        }

        let g = &self.geometry;
        if !(g.ticks_per_revolution > 0.0) {
            return Err(invalid("geometry.ticks_per_revolution", "must be positive"));
        }
        if !(g.wrist_range_deg > 0.0) {
            return Err(invalid("geometry.wrist_range_deg", "must be positive"));
        }
        if !(0.0 <= g.wrist_min && g.wrist_min <= g.wrist_max && g.wrist_max <= 1.0) {
            return Err(invalid(
                "geometry.wrist_min",
                format!("[{}, {}] is not a sub-range of [0, 1]", g.wrist_min, g.wrist_max),
            ));
        }

        if self.presets.ready_to_intake >= self.presets.deposit_on_floor {
            return Err(invalid(
                "presets.ready_to_intake",
                "must be below presets.deposit_on_floor",
            ));
        }
        Ok(())
    }
}

fn invalid(name: &str, details: impl Into<String>) -> ArmError {
    ArmError::InvalidParameter {
        name: name.to_string(),
        details: details.into(),
    }
}

/// Gains and timing of the arm position-hold loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlConfig {
    #[serde(default = "default_kp")]
    pub kp: f64,
    #[serde(default = "default_ki")]
    pub ki: f64,
    #[serde(default)]
    pub kd: f64,
    /// Largest power the integral term alone may contribute.
    #[serde(default = "default_integral_max_power")]
    pub integral_max_power: f64,
    /// Loop tick in microseconds; `0` yields the thread between iterations
    /// instead of sleeping.
    #[serde(default = "default_control_period_us")]
    pub period_us: u64,
}

fn default_kp() -> f64 {
    0.000945
}
fn default_ki() -> f64 {
    0.001
}
fn default_integral_max_power() -> f64 {
    0.05
}
fn default_control_period_us() -> u64 {
    1_000
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            kp: default_kp(),
            ki: default_ki(),
            kd: 0.0,
            integral_max_power: default_integral_max_power(),
            period_us: default_control_period_us(),
        }
    }
}

/// Tolerances and power law of the combined arm + wrist mover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoverConfig {
    /// Arm is done when strictly closer than this many ticks.
    #[serde(default = "default_arm_epsilon")]
    pub arm_epsilon: i32,
    /// Wrist is done when strictly closer than this servo fraction.
    #[serde(default = "default_wrist_epsilon")]
    pub wrist_epsilon: f64,
    /// Wrist position that keeps the payload inside the robot footprint.
    #[serde(default = "default_safe_wrist_position")]
    pub safe_wrist_position: f64,
    /// Proportional gain of the built-in power calculator (power per tick).
    #[serde(default = "default_power_kp")]
    pub power_kp: f64,
    #[serde(default = "default_max_power")]
    pub max_power: f64,
    /// Pause between steps of a blocking move; `0` only yields.
    #[serde(default = "default_step_period_us")]
    pub step_period_us: u64,
}

fn default_arm_epsilon() -> i32 {
    10
}
fn default_wrist_epsilon() -> f64 {
    0.02
}
fn default_safe_wrist_position() -> f64 {
    0.5
}
fn default_power_kp() -> f64 {
    0.002
}
fn default_max_power() -> f64 {
    1.0
}
fn default_step_period_us() -> u64 {
    1_000
}

impl Default for MoverConfig {
    fn default() -> Self {
        Self {
            arm_epsilon: default_arm_epsilon(),
            wrist_epsilon: default_wrist_epsilon(),
            safe_wrist_position: default_safe_wrist_position(),
            power_kp: default_power_kp(),
            max_power: default_max_power(),
            step_period_us: default_step_period_us(),
        }
    }
}

/// Tick ranges feeding the built-in wrist safety checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Arm targets in `[danger_zone_min, danger_zone_max]` make a swinging
    /// wrist collide with the chassis.
    #[serde(default = "default_danger_zone_min")]
    pub danger_zone_min: i32,
    #[serde(default = "default_danger_zone_max")]
    pub danger_zone_max: i32,
    /// While the arm is inside `[carry_zone_min, carry_zone_max]` the wrist
    /// may not open past `carry_wrist_max` without spilling the payload.
    #[serde(default = "default_carry_zone_min")]
    pub carry_zone_min: i32,
    #[serde(default = "default_carry_zone_max")]
    pub carry_zone_max: i32,
    #[serde(default = "default_carry_wrist_max")]
    pub carry_wrist_max: f64,
}

fn default_danger_zone_min() -> i32 {
    -600
}
fn default_danger_zone_max() -> i32 {
    400
}
fn default_carry_zone_min() -> i32 {
    1_500
}
fn default_carry_zone_max() -> i32 {
    4_200
}
fn default_carry_wrist_max() -> f64 {
    0.6
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            danger_zone_min: default_danger_zone_min(),
            danger_zone_max: default_danger_zone_max(),
            carry_zone_min: default_carry_zone_min(),
            carry_zone_max: default_carry_zone_max(),
            carry_wrist_max: default_carry_wrist_max(),
        }
    }
}

/// Mechanical constants and unit conversions for both joints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryConfig {
    /// Encoder ticks per full revolution of the arm (after the external
    /// 20:100 reduction).
    #[serde(default = "default_ticks_per_revolution")]
    pub ticks_per_revolution: f64,
    /// Arm angle, in degrees, at encoder position zero.
    #[serde(default = "default_arm_angle_offset_deg")]
    pub arm_angle_offset_deg: f64,
    /// Degrees of wrist travel across the full servo range `[0, 1]`.
    #[serde(default = "default_wrist_range_deg")]
    pub wrist_range_deg: f64,
    #[serde(default = "default_wrist_min")]
    pub wrist_min: f64,
    #[serde(default = "default_wrist_max")]
    pub wrist_max: f64,
    /// Positive power on the arm motor drives the encoder this way.
    #[serde(default = "default_motor_direction")]
    pub motor_direction: Direction,
}

fn default_ticks_per_revolution() -> f64 {
    arm_encoder_resolution() * 100.0 / 20.0
}
fn default_arm_angle_offset_deg() -> f64 {
    -29.208
}
fn default_wrist_range_deg() -> f64 {
    180.0
}
fn default_wrist_min() -> f64 {
    0.35
}
fn default_wrist_max() -> f64 {
    0.85
}
fn default_motor_direction() -> Direction {
    // The hold loop computes `error = current - target` with positive gains.
    Direction::Reverse
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            ticks_per_revolution: default_ticks_per_revolution(),
            arm_angle_offset_deg: default_arm_angle_offset_deg(),
            wrist_range_deg: default_wrist_range_deg(),
            wrist_min: default_wrist_min(),
            wrist_max: default_wrist_max(),
            motor_direction: default_motor_direction(),
        }
    }
}

impl GeometryConfig {
    /// Map an absolute arm angle into `(-360, 360)` degrees relative to the
    /// encoder zero.
    pub fn normalize_arm_angle(&self, degrees: f64) -> f64 {
        (degrees - self.arm_angle_offset_deg) % 360.0
    }

    /// Encoder position for an angle already relative to the encoder zero.
    pub fn ticks_for_degrees(&self, relative_degrees: f64) -> i32 {
        // Multiply before dividing to keep precision.
        (relative_degrees * self.ticks_per_revolution / 360.0).round() as i32
    }

    /// Absolute arm angle in degrees for an encoder position.
    pub fn arm_degrees(&self, ticks: i32) -> f64 {
        f64::from(ticks) * 360.0 / self.ticks_per_revolution + self.arm_angle_offset_deg
    }

    /// Wrist angle in degrees for a servo fraction.
    pub fn wrist_degrees(&self, position: f64) -> f64 {
        position * self.wrist_range_deg
    }

    /// Servo fraction for a wrist angle, clamped to the servo limits.
    pub fn wrist_position_for(&self, degrees: f64) -> f64 {
        self.clamp_wrist(degrees / self.wrist_range_deg)
    }

    pub fn clamp_wrist(&self, position: f64) -> f64 {
        position.clamp(self.wrist_min, self.wrist_max)
    }
}

/// A named arm + wrist pose. Each has an entry in [`ArmPresets`] and
/// [`WristPresets`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Pose {
    Idle,
    ReadyToIntake,
    DepositOnFloor,
    DepositOnBackdrop,
}

impl Pose {
    pub const ALL: [Pose; 4] = [
        Pose::Idle,
        Pose::ReadyToIntake,
        Pose::DepositOnFloor,
        Pose::DepositOnBackdrop,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Pose::Idle => "idle",
            Pose::ReadyToIntake => "ready-to-intake",
            Pose::DepositOnFloor => "deposit-on-floor",
            Pose::DepositOnBackdrop => "deposit-on-backdrop",
        }
    }
}

impl std::fmt::Display for Pose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Pose {
    type Err = ArmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pose::ALL
            .into_iter()
            .find(|pose| pose.name() == s)
            .ok_or_else(|| {
                let known: Vec<_> = Pose::ALL.iter().map(|p| p.name()).collect();
                invalid("pose", format!("unknown pose {s:?}; expected one of {}", known.join(", ")))
            })
    }
}

/// Named arm angles in degrees, relative to the encoder zero.
///
/// `ready_to_intake` and `deposit_on_floor` double as the safe envelope:
/// arm requests outside them are dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmPresets {
    #[serde(default)]
    pub idle: f64,
    #[serde(default = "default_arm_ready_to_intake")]
    pub ready_to_intake: f64,
    #[serde(default = "default_arm_deposit_on_floor")]
    pub deposit_on_floor: f64,
    #[serde(default = "default_arm_deposit_on_backdrop")]
    pub deposit_on_backdrop: f64,
}

impl ArmPresets {
    pub fn degrees(&self, pose: Pose) -> f64 {
        match pose {
            Pose::Idle => self.idle,
            Pose::ReadyToIntake => self.ready_to_intake,
            Pose::DepositOnFloor => self.deposit_on_floor,
            Pose::DepositOnBackdrop => self.deposit_on_backdrop,
        }
    }
}

fn default_arm_ready_to_intake() -> f64 {
    -25.0
}
fn default_arm_deposit_on_floor() -> f64 {
    200.0
}
fn default_arm_deposit_on_backdrop() -> f64 {
    115.0
}

impl Default for ArmPresets {
    fn default() -> Self {
        Self {
            idle: 0.0,
            ready_to_intake: default_arm_ready_to_intake(),
            deposit_on_floor: default_arm_deposit_on_floor(),
            deposit_on_backdrop: default_arm_deposit_on_backdrop(),
        }
    }
}

/// Named wrist angles in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WristPresets {
    #[serde(default = "default_wrist_idle")]
    pub idle: f64,
    #[serde(default = "default_wrist_ready_to_intake")]
    pub ready_to_intake: f64,
    #[serde(default = "default_wrist_deposit_on_floor")]
    pub deposit_on_floor: f64,
    #[serde(default = "default_wrist_deposit_on_backdrop")]
    pub deposit_on_backdrop: f64,
}

impl WristPresets {
    pub fn degrees(&self, pose: Pose) -> f64 {
        match pose {
            Pose::Idle => self.idle,
            Pose::ReadyToIntake => self.ready_to_intake,
            Pose::DepositOnFloor => self.deposit_on_floor,
            Pose::DepositOnBackdrop => self.deposit_on_backdrop,
        }
    }
}

fn default_wrist_idle() -> f64 {
    180.0
}
fn default_wrist_ready_to_intake() -> f64 {
    30.0
}
fn default_wrist_deposit_on_floor() -> f64 {
    180.0
}
fn default_wrist_deposit_on_backdrop() -> f64 {
    90.0
}

impl Default for WristPresets {
    fn default() -> Self {
        Self {
            idle: default_wrist_idle(),
            ready_to_intake: default_wrist_ready_to_intake(),
            deposit_on_floor: default_wrist_deposit_on_floor(),
            deposit_on_backdrop: default_wrist_deposit_on_backdrop(),
        }
    }
}
