//! [`ArmAndWristMover`] – coordinated arm + wrist motion.
//!
//! A combined request is classified once, when it is submitted, into a
//! [`WristRotationMode`] that decides how the wrist moves while the arm
//! travels. The result is stored as an immutable [`RotationCommand`] behind an
//! [`ArcSwap`]; submitting a new request swaps the snapshot and the old one is
//! dropped.
//!
//! The mover does not own a thread. Something external calls
//! [`cycle_state_machine`](ArmAndWristMover::cycle_state_machine) repeatedly,
//! either the host's periodic update or
//! [`move_blocking`](ArmAndWristMover::move_blocking).
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use armos_hal::{ConditionalDevice, HardwareInterface};
//! use armos_hal::sim::{SimMotor, SimServo};
//! use armos_kernel::mover::ArmAndWristMover;
//! use armos_types::{MoverConfig, WristRotationMode};
//!
//! let hw = Arc::new(HardwareInterface::new(
//!     ConditionalDevice::present(Box::new(SimMotor::new("Arm Motor"))),
//!     ConditionalDevice::present(Box::new(SimServo::new("Wrist Servo"))),
//! ));
//! let mover = ArmAndWristMover::new(
//!     hw,
//!     &MoverConfig::default(),
//!     |_arm: i32, _wrist: f64| true,
//!     |_target: i32| false,
//!     |current: i32, target: i32| if target > current { 0.5 } else { -0.5 },
//! );
//!
//! mover.move_async(800, 0.7);
//! assert_eq!(mover.mode(), WristRotationMode::Asap);
//! mover.cycle_state_machine();
//! assert!(mover.is_wrist_done());
//! ```

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use arc_swap::ArcSwap;
use armos_hal::HardwareInterface;
use armos_types::{ArmConfig, MotionStatus, MoverConfig, WristRotationMode};
use chrono::Utc;
use tracing::{debug, trace};

use crate::command::RotationCommand;
use crate::safety::{
    CarryZone, DangerZone, PayloadSafety, PowerCalculator, ProportionalPowerCalculator,
    WristDanger,
};

/// Drives the arm and wrist together towards the active [`RotationCommand`].
pub struct ArmAndWristMover {
    hw: Arc<HardwareInterface>,
    command: ArcSwap<RotationCommand>,
    arm_epsilon: i32,
    wrist_epsilon: f64,
    safe_wrist_position: f64,
    step_period: Duration,
    payload_safety: Box<dyn PayloadSafety>,
    wrist_danger: Box<dyn WristDanger>,
    power: Box<dyn PowerCalculator>,
}

impl ArmAndWristMover {
    /// Build a mover whose initial command holds the current arm and wrist
    /// positions and leaves the wrist alone.
    pub fn new(
        hw: Arc<HardwareInterface>,
        config: &MoverConfig,
        payload_safety: impl PayloadSafety + 'static,
        wrist_danger: impl WristDanger + 'static,
        power: impl PowerCalculator + 'static,
    ) -> Self {
        let initial = RotationCommand::new(
            hw.arm_position(),
            hw.wrist_position(),
            WristRotationMode::DoNotRotate,
        );
        Self {
            hw,
            command: ArcSwap::from_pointee(initial),
            arm_epsilon: config.arm_epsilon,
            wrist_epsilon: config.wrist_epsilon,
            safe_wrist_position: config.safe_wrist_position,
            step_period: Duration::from_micros(config.step_period_us),
            payload_safety: Box::new(payload_safety),
            wrist_danger: Box::new(wrist_danger),
            power: Box::new(power),
        }
    }

    /// Mover wired with the built-in collaborators described by `config`.
    pub fn from_config(hw: Arc<HardwareInterface>, config: &ArmConfig) -> Self {
        Self::new(
            hw,
            &config.mover,
            CarryZone::from_config(&config.safety),
            DangerZone::from_config(&config.safety),
            ProportionalPowerCalculator::from_config(
                &config.mover,
                config.geometry.motor_direction,
            ),
        )
    }

    /// Decide how the wrist should move for a request, given the arm's
    /// position at submission time. Reads no hardware.
    pub fn classify(
        &self,
        current_arm: i32,
        arm_target: i32,
        wrist_target: f64,
    ) -> WristRotationMode {
        let wrist_target = wrist_target.clamp(0.0, 1.0);
        if !self.payload_safety.is_safe(current_arm, wrist_target) {
            WristRotationMode::WithoutDroppingPayload
        } else if self.wrist_danger.is_dangerous(arm_target) {
            WristRotationMode::CompactWhileMovingArm
        } else {
            WristRotationMode::Asap
        }
    }

    fn install(&self, arm_target: i32, wrist_target: f64) {
        let current_arm = self.hw.arm_position();
        let mode = self.classify(current_arm, arm_target, wrist_target);
        debug!(
            current_arm,
            arm_target,
            wrist_target,
            %mode,
            "combined move classified"
        );
        self.command
            .store(Arc::new(RotationCommand::new(arm_target, wrist_target, mode)));
    }

    /// Replace the active command and return immediately.
    pub fn move_async(&self, arm_target: i32, wrist_target: f64) {
        self.install(arm_target, wrist_target);
    }

    /// Replace the active command and step until both axes are done.
    ///
    /// There is no timeout: a target the arm can never reach blocks forever.
    pub fn move_blocking(&self, arm_target: i32, wrist_target: f64) {
        self.install(arm_target, wrist_target);
        while !self.is_done() {
            self.cycle_state_machine();
            if self.step_period.is_zero() {
                thread::yield_now();
            } else {
                thread::sleep(self.step_period);
            }
        }
    }

    /// Retarget the arm, keeping the active wrist target.
    ///
    /// The read of the wrist target and the swap are separate steps: a
    /// concurrent `set_wrist_target` may be lost.
    pub fn set_arm_target(&self, arm_target: i32) {
        let wrist_target = self.command.load().wrist_target();
        self.install(arm_target, wrist_target);
    }

    /// Retarget the wrist, keeping the active arm target. Same race as
    /// [`set_arm_target`](Self::set_arm_target).
    pub fn set_wrist_target(&self, wrist_target: f64) {
        let arm_target = self.command.load().arm_target();
        self.install(arm_target, wrist_target);
    }

    /// Run one step of the active command against fresh actuator readings.
    pub fn cycle_state_machine(&self) {
        let command = self.command.load_full();
        let current_arm = self.hw.arm_position();
        let arm_done = self.arm_done_at(&command, current_arm);

        if !self.wrist_done_at(&command, self.hw.wrist_position()) {
            match command.mode() {
                WristRotationMode::Asap => self.hw.set_wrist_position(command.wrist_target()),
                WristRotationMode::DoNotRotate => {}
                WristRotationMode::WithoutDroppingPayload => {
                    if self
                        .payload_safety
                        .is_safe(current_arm, command.wrist_target())
                    {
                        self.hw.set_wrist_position(command.wrist_target());
                    }
                }
                WristRotationMode::CompactWhileMovingArm => {
                    if arm_done {
                        self.hw.set_wrist_position(command.wrist_target());
                    } else {
                        self.hw.set_wrist_position(self.safe_wrist_position);
                        let tucked = (self.hw.wrist_position() - self.safe_wrist_position).abs()
                            < self.wrist_epsilon;
                        if !tucked {
                            trace!("waiting for wrist to tuck before moving arm");
                            return;
                        }
                    }
                }
            }
        }

        if arm_done {
            self.hw.set_arm_power(0.0);
        } else {
            let power = self.power.power(current_arm, command.arm_target());
            trace!(current_arm, power, "mover arm power");
            self.hw.set_arm_power(power);
        }
    }

    fn arm_done_at(&self, command: &RotationCommand, current: i32) -> bool {
        (i64::from(current) - i64::from(command.arm_target())).abs() < i64::from(self.arm_epsilon)
    }

    fn wrist_done_at(&self, command: &RotationCommand, current: f64) -> bool {
        command.mode() == WristRotationMode::DoNotRotate
            || (current - command.wrist_target()).abs() < self.wrist_epsilon
    }

    pub fn arm_target(&self) -> i32 {
        self.command.load().arm_target()
    }

    pub fn wrist_target(&self) -> f64 {
        self.command.load().wrist_target()
    }

    pub fn mode(&self) -> WristRotationMode {
        self.command.load().mode()
    }

    pub fn is_arm_done(&self) -> bool {
        self.arm_done_at(&self.command.load(), self.hw.arm_position())
    }

    pub fn is_wrist_done(&self) -> bool {
        self.wrist_done_at(&self.command.load(), self.hw.wrist_position())
    }

    pub fn is_done(&self) -> bool {
        let command = self.command.load_full();
        self.arm_done_at(&command, self.hw.arm_position())
            && self.wrist_done_at(&command, self.hw.wrist_position())
    }

    /// Snapshot of the active command and each axis's completion.
    pub fn status(&self) -> MotionStatus {
        let command = self.command.load_full();
        MotionStatus {
            timestamp: Utc::now(),
            arm_target: command.arm_target(),
            arm_done: self.arm_done_at(&command, self.hw.arm_position()),
            wrist_target: command.wrist_target(),
            wrist_done: self.wrist_done_at(&command, self.hw.wrist_position()),
            mode: command.mode(),
        }
    }

    /// Human-readable form of [`status`](Self::status).
    pub fn status_string(&self) -> String {
        self.status().to_string()
    }
}
