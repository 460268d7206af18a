//! [`ArmPositionUpdater`] – the arm position-hold loop.
//!
//! Runs on its own named OS thread for the life of the host. Each tick it
//! picks up a new setpoint if one was posted, runs one iteration of the PID
//! law against the fresh encoder position, optionally keeps the wrist's
//! absolute orientation, and writes the resulting power.
//!
//! The loop moves through three phases:
//!
//! 1. **await-start**: idle while the host is initializing. If the host
//!    terminates first, exit without touching the arm.
//! 2. **run**: one PID iteration per tick until the host terminates.
//! 3. **stopped**: command zero power once (bypassing the write cache) and
//!    exit.
//!
//! When the arm motor is absent the loop never reads or writes hardware but
//! still follows the lifecycle so the thread joins cleanly.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use armos_hal::{HardwareInterface, PidGains, PidState};
use armos_types::{ArmError, GeometryConfig, HostState};
use tracing::{debug, info};

use crate::lifecycle::HostLifecycle;
use crate::setpoint::SetpointExchange;

/// OS thread name of the hold loop.
pub const THREAD_NAME: &str = "Arm Position Updater";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopPhase {
    AwaitStart,
    Run,
    Stopped,
}

/// Owns the PID runtime state and drives the arm towards the latest setpoint.
pub struct ArmPositionUpdater {
    hw: Arc<HardwareInterface>,
    setpoint: Arc<SetpointExchange>,
    gains: Arc<PidGains>,
    lifecycle: HostLifecycle,
    geometry: GeometryConfig,
    period: Duration,
    pid: PidState,
    target: i32,
    track_wrist: bool,
}

impl ArmPositionUpdater {
    /// `period` is the tick length; [`Duration::ZERO`] yields the thread
    /// between iterations instead of sleeping.
    pub fn new(
        hw: Arc<HardwareInterface>,
        setpoint: Arc<SetpointExchange>,
        gains: Arc<PidGains>,
        lifecycle: HostLifecycle,
        geometry: GeometryConfig,
        period: Duration,
    ) -> Self {
        Self {
            hw,
            setpoint,
            gains,
            lifecycle,
            geometry,
            period,
            pid: PidState::default(),
            target: 0,
            track_wrist: false,
        }
    }

    /// Target the loop is currently holding, in ticks.
    pub fn target(&self) -> i32 {
        self.target
    }

    pub fn track_wrist(&self) -> bool {
        self.track_wrist
    }

    pub fn pid_state(&self) -> &PidState {
        &self.pid
    }

    /// Adopt the posted setpoint if it changed since the last pickup,
    /// resetting the PID memory. Returns whether a pickup happened.
    pub fn pick_up_setpoint(&mut self) -> bool {
        let Some(setpoint) = self.setpoint.take_if_dirty() else {
            return false;
        };
        self.target = setpoint.target;
        self.track_wrist = setpoint.track_wrist;
        self.pid.reset();
        debug!(
            target = setpoint.target,
            track_wrist = setpoint.track_wrist,
            "arm setpoint picked up"
        );
        true
    }

    /// One full run-phase iteration. Returns the power written to the arm.
    pub fn iterate(&mut self) -> f64 {
        self.pick_up_setpoint();

        let current = self.hw.arm_position();
        let error = current.saturating_sub(self.target);
        let power = self.pid.update(error, &self.gains.snapshot());

        if self.track_wrist {
            let relative = self.geometry.wrist_degrees(self.hw.wrist_position())
                - self.geometry.arm_degrees(current);
            self.hw
                .set_wrist_position(self.geometry.wrist_position_for(relative));
        }

        self.hw.set_arm_power(power);
        power
    }

    /// Run the loop on the calling thread until the host terminates.
    pub fn run(mut self) {
        let arm_available = self.hw.is_arm_available();
        let mut phase = LoopPhase::AwaitStart;

        loop {
            phase = match (phase, self.lifecycle.state()) {
                (LoopPhase::AwaitStart, HostState::Initializing) => {
                    self.tick();
                    LoopPhase::AwaitStart
                }
                (LoopPhase::AwaitStart, HostState::Terminated) => {
                    info!("host terminated before start; arm loop exiting");
                    return;
                }
                (LoopPhase::AwaitStart | LoopPhase::Run, HostState::Running) => {
                    if arm_available {
                        self.iterate();
                    }
                    self.tick();
                    LoopPhase::Run
                }
                (LoopPhase::Run, _) => LoopPhase::Stopped,
                (LoopPhase::Stopped, _) => {
                    if arm_available {
                        self.hw.stop_arm();
                    }
                    info!(target = self.target, "arm loop stopped");
                    return;
                }
            };
        }
    }

    /// Start the loop on a dedicated thread named [`THREAD_NAME`].
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::Spawn`] when the OS refuses to create the thread.
    pub fn spawn(self) -> Result<JoinHandle<()>, ArmError> {
        thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || self.run())
            .map_err(|source| ArmError::Spawn {
                name: THREAD_NAME.to_string(),
                source,
            })
    }

    fn tick(&self) {
        if self.period.is_zero() {
            thread::yield_now();
        } else {
            thread::sleep(self.period);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armos_hal::ConditionalDevice;
    use armos_hal::sim::{SimMotor, SimMotorHandle, SimServo, SimServoHandle};
    use armos_types::{ControlConfig, Direction};

    struct Fixture {
        hw: Arc<HardwareInterface>,
        setpoint: Arc<SetpointExchange>,
        lifecycle: HostLifecycle,
        motor: SimMotorHandle,
        servo: SimServoHandle,
    }

    fn fixture() -> Fixture {
        let motor = SimMotor::new("Arm Motor").with_direction(Direction::Reverse);
        let servo = SimServo::new("Wrist Servo").with_position(0.5);
        let (mh, sh) = (motor.handle(), servo.handle());
        Fixture {
            hw: Arc::new(HardwareInterface::new(
                ConditionalDevice::present(Box::new(motor)),
                ConditionalDevice::present(Box::new(servo)),
            )),
            setpoint: Arc::new(SetpointExchange::new()),
            lifecycle: HostLifecycle::new(),
            motor: mh,
            servo: sh,
        }
    }

    fn updater(f: &Fixture, period: Duration) -> ArmPositionUpdater {
        ArmPositionUpdater::new(
            Arc::clone(&f.hw),
            Arc::clone(&f.setpoint),
            Arc::new(PidGains::from_config(&ControlConfig::default())),
            f.lifecycle.clone(),
            GeometryConfig::default(),
            period,
        )
    }

    #[test]
    fn integral_is_zero_right_after_pickup() {
        let f = fixture();
        let mut loop_ = updater(&f, Duration::ZERO);
        f.setpoint.set_target(1000, false);
        for _ in 0..5 {
            loop_.iterate();
        }
        assert_ne!(loop_.pid_state().integral(), 0);

        f.setpoint.set_target(2000, false);
        assert!(loop_.pick_up_setpoint());
        assert_eq!(loop_.pid_state().integral(), 0);
        assert_eq!(loop_.pid_state().prev_error(), 0);
        assert_eq!(loop_.target(), 2000);
        assert!(!loop_.pick_up_setpoint());
    }

    #[test]
    fn error_is_current_minus_target() {
        let f = fixture();
        let mut loop_ = updater(&f, Duration::ZERO);
        f.setpoint.set_target(1000, false);
        let power = loop_.iterate();
        assert!(power < 0.0);
        assert_eq!(f.motor.power_history(), vec![power]);
    }

    #[test]
    fn zero_error_gives_zero_power() {
        let f = fixture();
        f.motor.set_position(300);
        let mut loop_ = updater(&f, Duration::ZERO);
        f.setpoint.set_target(300, false);
        assert_eq!(loop_.iterate(), 0.0);
    }

    #[test]
    fn holds_position_in_simulation() {
        let f = fixture();
        let mut loop_ = updater(&f, Duration::ZERO);
        f.setpoint.set_target(1000, false);
        for _ in 0..3000 {
            loop_.iterate();
            f.motor.step(Duration::from_millis(10));
        }
        assert!((f.motor.position() - 1000).abs() < 30, "{}", f.motor.position());
    }

    #[test]
    fn tracking_commands_wrist_relative_to_arm() {
        let f = fixture();
        let mut loop_ = updater(&f, Duration::ZERO);
        f.setpoint.set_target(500, true);
        loop_.iterate();

        let geometry = GeometryConfig::default();
        let expected = geometry
            .wrist_position_for(geometry.wrist_degrees(0.5) - geometry.arm_degrees(0));
        assert_eq!(f.servo.commanded(), Some(expected));
    }

    #[test]
    fn no_wrist_writes_without_tracking() {
        let f = fixture();
        let mut loop_ = updater(&f, Duration::ZERO);
        f.setpoint.set_target(500, false);
        loop_.iterate();
        assert_eq!(f.servo.position_writes(), 0);
    }

    #[test]
    fn threaded_loop_follows_lifecycle() {
        let f = fixture();
        let handle = updater(&f, Duration::from_micros(200)).spawn().unwrap();
        assert_eq!(handle.thread().name(), Some(THREAD_NAME));

        f.setpoint.set_target(1000, false);
        thread::sleep(Duration::from_millis(20));
        // Still initializing: nothing written yet.
        assert_eq!(f.motor.power_writes(), 0);

        f.lifecycle.start();
        thread::sleep(Duration::from_millis(20));
        assert!(f.motor.power_writes() > 0);

        f.lifecycle.terminate();
        handle.join().unwrap();
        assert_eq!(f.motor.power_history().last(), Some(&0.0));
        assert_eq!(f.hw.last_arm_power(), Some(0.0));
    }

    #[test]
    fn terminated_during_init_never_touches_arm() {
        let f = fixture();
        let handle = updater(&f, Duration::ZERO).spawn().unwrap();
        f.lifecycle.terminate();
        handle.join().unwrap();
        assert_eq!(f.motor.power_writes(), 0);
    }

    #[test]
    fn absent_motor_idles_until_termination() {
        let setpoint = Arc::new(SetpointExchange::new());
        let lifecycle = HostLifecycle::new();
        let hw = Arc::new(HardwareInterface::new(
            ConditionalDevice::absent(),
            ConditionalDevice::absent(),
        ));
        let loop_ = ArmPositionUpdater::new(
            Arc::clone(&hw),
            Arc::clone(&setpoint),
            Arc::new(PidGains::default()),
            lifecycle.clone(),
            GeometryConfig::default(),
            Duration::ZERO,
        );
        let handle = loop_.spawn().unwrap();
        lifecycle.start();
        setpoint.set_target(700, true);
        thread::sleep(Duration::from_millis(5));
        assert!(!handle.is_finished());

        lifecycle.terminate();
        handle.join().unwrap();
        assert_eq!(hw.arm_position(), 0);
        assert_eq!(hw.last_arm_power(), None);
        // The loop never consumed the setpoint.
        assert!(setpoint.try_consume_dirty());
    }
}
