//! [`Arm`] – the arm module as the rest of the robot sees it.
//!
//! Binds the arm motor, wrist servo, and flap servo from the
//! [`HardwareMap`], starts the position-hold loop, and exposes the arm in
//! degrees rather than encoder ticks. Missing hardware is logged and the
//! dependent operations quietly do nothing.
//!
//! # Example
//!
//! ```rust
//! use armos_hal::sim::{SimMotor, SimRig, SimServo};
//! use armos_kernel::HostLifecycle;
//! use armos_runtime::arm::Arm;
//! use armos_types::ArmConfig;
//!
//! let (mut map, _rig) = SimRig::builder()
//!     .with_motor(SimMotor::new(Arm::ARM_MOTOR_NAME))
//!     .with_servo(SimServo::new(Arm::WRIST_SERVO_NAME))
//!     .build();
//!
//! let lifecycle = HostLifecycle::new();
//! let mut arm = Arm::new(&mut map, &ArmConfig::default(), lifecycle.clone()).unwrap();
//!
//! // Outside the safe envelope: dropped.
//! assert!(!arm.rotate_arm_to(300.0, false));
//! assert!(arm.rotate_arm_to(90.0, false));
//!
//! arm.shutdown();
//! ```

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use armos_hal::{HardwareInterface, HardwareMap, PidGains};
use armos_kernel::{ArmAndWristMover, ArmPositionUpdater, HostLifecycle, SetpointExchange};
use armos_types::{
    AngleUnit, ArmConfig, ArmError, ArmPresets, GeometryConfig, Pose, WristPresets,
};
use tracing::{debug, error, info, warn};

use crate::flap::Flap;

/// The arm, wrist, and flap of the robot.
pub struct Arm {
    hw: Arc<HardwareInterface>,
    setpoint: Arc<SetpointExchange>,
    gains: Arc<PidGains>,
    geometry: GeometryConfig,
    presets: ArmPresets,
    wrist_presets: WristPresets,
    lifecycle: HostLifecycle,
    flap: Flap,
    updater: Option<JoinHandle<()>>,
}

impl Arm {
    pub const ARM_MOTOR_NAME: &'static str = "Arm Motor";
    pub const WRIST_SERVO_NAME: &'static str = "Wrist Servo";
    pub const FLAP_SERVO_NAME: &'static str = "Flap Servo";

    /// Bind hardware, close the flap, and spawn the hold loop. The loop
    /// waits for `lifecycle` to start before it drives the motor.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails validation or the hold loop thread
    /// cannot be spawned.
    pub fn new(
        map: &mut HardwareMap,
        config: &ArmConfig,
        lifecycle: HostLifecycle,
    ) -> Result<Self, ArmError> {
        config.validate()?;

        let hw = Arc::new(HardwareInterface::new(
            map.take_rotary(Self::ARM_MOTOR_NAME),
            map.take_continuous(Self::WRIST_SERVO_NAME),
        ));
        let flap = Flap::new(map.take_continuous(Self::FLAP_SERVO_NAME));

        let setpoint = Arc::new(SetpointExchange::new());
        let gains = Arc::new(PidGains::from_config(&config.control));
        let updater = ArmPositionUpdater::new(
            Arc::clone(&hw),
            Arc::clone(&setpoint),
            Arc::clone(&gains),
            lifecycle.clone(),
            config.geometry.clone(),
            Duration::from_micros(config.control.period_us),
        )
        .spawn()?;

        info!(
            arm_motor = hw.is_arm_available(),
            wrist_servo = hw.is_wrist_available(),
            flap_servo = flap.is_available(),
            "arm module initialized"
        );

        Ok(Self {
            hw,
            setpoint,
            gains,
            geometry: config.geometry.clone(),
            presets: config.presets.clone(),
            wrist_presets: config.wrist_presets.clone(),
            lifecycle,
            flap,
            updater: Some(updater),
        })
    }

    /// Shared hardware access, e.g. for an [`ArmAndWristMover`].
    pub fn hardware(&self) -> Arc<HardwareInterface> {
        Arc::clone(&self.hw)
    }

    /// A combined mover over this arm's hardware, wired from `config`.
    ///
    /// The mover and the hold loop both write arm power; only drive one of
    /// them at a time.
    pub fn mover(&self, config: &ArmConfig) -> ArmAndWristMover {
        ArmAndWristMover::from_config(self.hardware(), config)
    }

    /// Live-tunable gains of the hold loop.
    pub fn gains(&self) -> &PidGains {
        &self.gains
    }

    pub fn flap(&mut self) -> &mut Flap {
        &mut self.flap
    }

    /// Post an arm target in absolute degrees.
    ///
    /// Angles that fall outside the ready-to-intake / deposit-on-floor
    /// envelope once normalized are dropped; returns whether the target was
    /// accepted. With `preserve_wrist` the hold loop counter-rotates the
    /// wrist while the arm moves.
    pub fn rotate_arm_to(&self, degrees: f64, preserve_wrist: bool) -> bool {
        self.post_relative(self.geometry.normalize_arm_angle(degrees), preserve_wrist)
    }

    /// Post a target given relative to the encoder zero.
    fn post_relative(&self, relative: f64, preserve_wrist: bool) -> bool {
        if relative > self.presets.deposit_on_floor || relative < self.presets.ready_to_intake {
            warn!(relative, "arm target outside safe envelope; ignored");
            return false;
        }
        let ticks = self.geometry.ticks_for_degrees(relative);
        debug!(relative, ticks, preserve_wrist, "arm target posted");
        self.setpoint.set_target(ticks, preserve_wrist);
        true
    }

    /// [`rotate_arm_to`](Self::rotate_arm_to) with the angle in `unit`.
    pub fn rotate_arm_to_in(&self, angle: f64, unit: AngleUnit, preserve_wrist: bool) -> bool {
        self.rotate_arm_to(unit.to_degrees(angle), preserve_wrist)
    }

    /// Command the wrist servo, clamped to its mechanical limits.
    pub fn rotate_wrist_to(&self, position: f64) {
        self.hw.set_wrist_position(self.geometry.clamp_wrist(position));
    }

    /// Move arm and wrist to a named preset pose. Returns whether the arm
    /// target was accepted; the wrist is commanded either way.
    pub fn go_to(&self, pose: Pose, preserve_wrist: bool) -> bool {
        let arm_degrees = self.presets.degrees(pose);
        let wrist = self
            .geometry
            .wrist_position_for(self.wrist_presets.degrees(pose));
        info!(%pose, arm_degrees, wrist, "moving to preset pose");
        self.rotate_wrist_to(wrist);
        self.post_relative(arm_degrees, preserve_wrist)
    }

    /// Absolute arm angle in degrees.
    pub fn arm_rotation(&self) -> f64 {
        self.geometry.arm_degrees(self.arm_motor_position())
    }

    pub fn arm_rotation_in(&self, unit: AngleUnit) -> f64 {
        unit.from_degrees(self.arm_rotation())
    }

    /// Wrist angle in degrees.
    pub fn wrist_rotation(&self) -> f64 {
        self.geometry.wrist_degrees(self.hw.wrist_position())
    }

    pub fn wrist_rotation_in(&self, unit: AngleUnit) -> f64 {
        unit.from_degrees(self.wrist_rotation())
    }

    pub fn arm_motor_position(&self) -> i32 {
        self.hw.arm_position()
    }

    pub fn arm_motor_target(&self) -> i32 {
        self.setpoint.target()
    }

    /// Emit one structured status event.
    pub fn log(&self) {
        let round = |deg: f64| (deg * 100.0).round() / 100.0;
        info!(
            host = ?self.lifecycle.state(),
            arm_degrees = self.hw.is_arm_available().then(|| round(self.arm_rotation())),
            arm_target = self.arm_motor_target(),
            wrist_degrees = self.hw.is_wrist_available().then(|| round(self.wrist_rotation())),
            flap = ?self.flap.is_available().then_some(self.flap.state()),
            "arm status"
        );
    }

    /// Terminate the host lifecycle and join the hold loop, which stops the
    /// motor on its way out.
    pub fn shutdown(&mut self) {
        self.lifecycle.terminate();
        if let Some(handle) = self.updater.take()
            && handle.join().is_err()
        {
            error!("arm position updater panicked");
        }
    }
}

impl Drop for Arm {
    fn drop(&mut self) {
        self.shutdown();
    }
}
