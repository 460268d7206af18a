//! `armos-types` – shared vocabulary of the ArmOS crates.
//!
//! Host lifecycle states, the wrist rotation modes, the serializable
//! [`MotionStatus`] report, the [`ArmError`] type, and the startup
//! [`config`] bundle.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod config;

pub use config::{
    ArmConfig, ArmPresets, ControlConfig, GeometryConfig, MoverConfig, Pose, SafetyConfig,
    WristPresets,
};

/// Lifecycle of the hosting application, polled by long-running loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostState {
    /// Hardware is bound but motion is not yet allowed.
    Initializing,
    /// Normal operation.
    Running,
    /// The host is shutting down; loops must wind down.
    Terminated,
}

impl HostState {
    pub fn is_in_init(self) -> bool {
        self == HostState::Initializing
    }

    pub fn is_running(self) -> bool {
        self == HostState::Running
    }

    pub fn is_terminated(self) -> bool {
        self == HostState::Terminated
    }
}

/// Which way a positive power command turns the arm encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Positive power increases the encoder count.
    #[default]
    Forward,
    /// Positive power decreases the encoder count.
    Reverse,
}

impl Direction {
    /// `1.0` for [`Direction::Forward`], `-1.0` for [`Direction::Reverse`].
    pub fn sign(self) -> f64 {
        match self {
            Direction::Forward => 1.0,
            Direction::Reverse => -1.0,
        }
    }
}

/// Unit of an angle passed to or read from the arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AngleUnit {
    #[default]
    Degrees,
    Radians,
}

impl AngleUnit {
    /// Convert `angle`, expressed in this unit, to degrees.
    pub fn to_degrees(self, angle: f64) -> f64 {
        match self {
            AngleUnit::Degrees => angle,
            AngleUnit::Radians => angle.to_degrees(),
        }
    }

    /// Express `degrees` in this unit.
    pub fn from_degrees(self, degrees: f64) -> f64 {
        match self {
            AngleUnit::Degrees => degrees,
            AngleUnit::Radians => degrees.to_radians(),
        }
    }
}

/// Strategy used to move the wrist while a combined arm + wrist command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WristRotationMode {
    /// Command the wrist target immediately.
    Asap,
    /// Hold the wrist until the payload-safety check passes at the current arm position.
    WithoutDroppingPayload,
    /// Tuck the wrist into the safe position until the arm arrives.
    CompactWhileMovingArm,
    /// Leave the wrist alone.
    DoNotRotate,
}

impl fmt::Display for WristRotationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WristRotationMode::Asap => "ASAP",
            WristRotationMode::WithoutDroppingPayload => "WITHOUT_DROPPING_PAYLOAD",
            WristRotationMode::CompactWhileMovingArm => "COMPACT_WHILE_MOVING_ARM",
            WristRotationMode::DoNotRotate => "DO_NOT_ROTATE",
        };
        f.write_str(name)
    }
}

/// Point-in-time report on the active combined motion command.
///
/// The [`Display`](fmt::Display) form is the human-readable status line shown
/// on the driver station.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionStatus {
    pub timestamp: DateTime<Utc>,
    pub arm_target: i32,
    pub arm_done: bool,
    pub wrist_target: f64,
    pub wrist_done: bool,
    pub mode: WristRotationMode,
}

impl fmt::Display for MotionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ Arm Target Position: {} (Done: {}); Wrist Target Position: {} (Done: {}) }}",
            self.arm_target, self.arm_done, self.wrist_target, self.wrist_done
        )
    }
}

/// Errors raised outside the control path: configuration, strict device
/// lookups, and thread management.
///
/// The control path itself never fails; missing hardware degrades to no-ops.
#[derive(Error, Debug)]
pub enum ArmError {
    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Invalid parameter {name}: {details}")]
    InvalidParameter { name: String, details: String },

    #[error("Device not found on hardware map: {0}")]
    DeviceNotFound(String),

    #[error("Failed to spawn thread {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}
