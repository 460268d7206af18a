//! [`HardwareInterface`] – the single path from control code to the joints.
//!
//! Both the hold loop and the combined mover write through one shared
//! interface. Each axis sits behind its own mutex, so a get or set on one
//! axis is atomic with respect to the other thread; consecutive calls are
//! not.
//!
//! The last commanded value per axis is cached and an identical write is
//! dropped before it reaches the driver. The cache is never consulted for
//! reads: positions always come fresh from the device.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::trace;

use crate::registry::{ContinuousDevice, RotaryDevice};

struct ArmAxis {
    motor: RotaryDevice,
    last_power: Option<f64>,
}

struct WristAxis {
    servo: ContinuousDevice,
    last_position: Option<f64>,
}

/// Deduplicating, per-axis serialized access to the arm motor and wrist servo.
pub struct HardwareInterface {
    arm: Mutex<ArmAxis>,
    wrist: Mutex<WristAxis>,
}

fn lock<T>(axis: &Mutex<T>) -> MutexGuard<'_, T> {
    axis.lock().unwrap_or_else(PoisonError::into_inner)
}

impl HardwareInterface {
    pub fn new(motor: RotaryDevice, servo: ContinuousDevice) -> Self {
        Self {
            arm: Mutex::new(ArmAxis {
                motor,
                last_power: None,
            }),
            wrist: Mutex::new(WristAxis {
                servo,
                last_position: None,
            }),
        }
    }

    pub fn is_arm_available(&self) -> bool {
        lock(&self.arm).motor.is_available()
    }

    pub fn is_wrist_available(&self) -> bool {
        lock(&self.wrist).servo.is_available()
    }

    /// Arm encoder position in ticks, `0` when the motor is absent.
    pub fn arm_position(&self) -> i32 {
        lock(&self.arm).motor.map_or(0, |m| m.position())
    }

    /// Wrist servo position in `[0, 1]`, `0.0` when the servo is absent.
    pub fn wrist_position(&self) -> f64 {
        lock(&self.wrist).servo.map_or(0.0, |s| s.position())
    }

    /// Apply `power` to the arm unless it equals the last commanded power.
    pub fn set_arm_power(&self, power: f64) {
        let mut axis = lock(&self.arm);
        if axis.last_power == Some(power) {
            return;
        }
        axis.last_power = Some(power);
        trace!(power, "arm power");
        axis.motor.run_if_available(|m| m.set_power(power));
    }

    /// Command the wrist unless `position` equals the last commanded position.
    pub fn set_wrist_position(&self, position: f64) {
        let mut axis = lock(&self.wrist);
        if axis.last_position == Some(position) {
            return;
        }
        axis.last_position = Some(position);
        trace!(position, "wrist position");
        axis.servo.run_if_available(|s| s.set_position(position));
    }

    /// Command zero power regardless of the cache.
    pub fn stop_arm(&self) {
        let mut axis = lock(&self.arm);
        axis.last_power = Some(0.0);
        axis.motor.run_if_available(|m| m.set_power(0.0));
    }

    pub fn last_arm_power(&self) -> Option<f64> {
        lock(&self.arm).last_power
    }

    pub fn last_wrist_position(&self) -> Option<f64> {
        lock(&self.wrist).last_position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::ConditionalDevice;
    use crate::sim::{SimMotor, SimMotorHandle, SimServo, SimServoHandle};

    fn rig() -> (HardwareInterface, SimMotorHandle, SimServoHandle) {
        let motor = SimMotor::new("Arm Motor").with_position(250);
        let servo = SimServo::new("Wrist Servo").with_position(0.4);
        let (mh, sh) = (motor.handle(), servo.handle());
        let hw = HardwareInterface::new(
            ConditionalDevice::present(Box::new(motor)),
            ConditionalDevice::present(Box::new(servo)),
        );
        (hw, mh, sh)
    }

    #[test]
    fn reads_come_from_device() {
        let (hw, motor, _) = rig();
        assert_eq!(hw.arm_position(), 250);
        assert!((hw.wrist_position() - 0.4).abs() < 1e-12);
        motor.set_position(-30);
        assert_eq!(hw.arm_position(), -30);
    }

    #[test]
    fn identical_power_writes_are_suppressed() {
        let (hw, motor, _) = rig();
        hw.set_arm_power(0.3);
        hw.set_arm_power(0.3);
        hw.set_arm_power(0.3);
        assert_eq!(motor.power_writes(), 1);

        hw.set_arm_power(-0.3);
        hw.set_arm_power(0.3);
        assert_eq!(motor.power_history(), vec![0.3, -0.3, 0.3]);
        assert_eq!(hw.last_arm_power(), Some(0.3));
    }

    #[test]
    fn identical_wrist_writes_are_suppressed() {
        let (hw, _, servo) = rig();
        hw.set_wrist_position(0.6);
        hw.set_wrist_position(0.6);
        assert_eq!(servo.position_writes(), 1);
        hw.set_wrist_position(0.5);
        assert_eq!(servo.command_history(), vec![0.6, 0.5]);
    }

    #[test]
    fn stop_arm_bypasses_cache() {
        let (hw, motor, _) = rig();
        hw.set_arm_power(0.0);
        hw.stop_arm();
        assert_eq!(motor.power_history(), vec![0.0, 0.0]);
        // The cache now holds zero, so a plain zero write is dropped.
        hw.set_arm_power(0.0);
        assert_eq!(motor.power_writes(), 2);
    }

    #[test]
    fn absent_devices_degrade_to_defaults() {
        let hw = HardwareInterface::new(ConditionalDevice::absent(), ConditionalDevice::absent());
        assert!(!hw.is_arm_available());
        assert!(!hw.is_wrist_available());
        assert_eq!(hw.arm_position(), 0);
        assert_eq!(hw.wrist_position(), 0.0);
        hw.set_arm_power(1.0);
        hw.set_wrist_position(0.5);
        hw.stop_arm();
    }

    #[test]
    fn concurrent_writers_keep_each_axis_consistent() {
        use std::sync::Arc;
        use std::thread;

        let (hw, motor, servo) = rig();
        let hw = Arc::new(hw);
        let workers: Vec<_> = (0..4)
            .map(|i| {
                let hw = Arc::clone(&hw);
                thread::spawn(move || {
                    for n in 0..100 {
                        hw.set_arm_power(f64::from(i) / 10.0);
                        hw.set_wrist_position(f64::from(n % 2) / 2.0);
                        let _ = hw.arm_position();
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }
        // Every write that reached the driver differs from its predecessor.
        let powers = motor.power_history();
        assert!(powers.windows(2).all(|w| w[0] != w[1]));
        let positions = servo.command_history();
        assert!(positions.windows(2).all(|w| w[0] != w[1]));
    }
}
