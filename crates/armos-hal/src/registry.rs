//! [`HardwareMap`] – named device registry.
//!
//! Drivers are registered under the name configured on the robot (e.g.
//! `"Arm Motor"`). Modules bind their hardware by taking devices out of the
//! map: [`take_rotary`][HardwareMap::take_rotary] and
//! [`take_continuous`][HardwareMap::take_continuous] never fail and return an
//! empty [`ConditionalDevice`] for missing names, so a robot with partial
//! hardware still boots. The `require_*` variants are for callers that
//! cannot work without the device.

use std::collections::HashMap;

use armos_types::ArmError;
use tracing::{info, warn};

use crate::actuator::{ContinuousActuator, RotaryActuator};
use crate::device::ConditionalDevice;

/// A motor slot as bound by a module.
pub type RotaryDevice = ConditionalDevice<Box<dyn RotaryActuator>>;

/// A servo slot as bound by a module.
pub type ContinuousDevice = ConditionalDevice<Box<dyn ContinuousActuator>>;

/// Named registry of every driver present on the robot.
#[derive(Default)]
pub struct HardwareMap {
    rotary: HashMap<String, Box<dyn RotaryActuator>>,
    continuous: HashMap<String, Box<dyn ContinuousActuator>>,
}

impl HardwareMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a motor driver. Any previously registered driver with the
    /// same id is replaced.
    pub fn register_rotary(&mut self, actuator: Box<dyn RotaryActuator>) {
        self.rotary.insert(actuator.id().to_string(), actuator);
    }

    /// Register a servo driver. Any previously registered driver with the
    /// same id is replaced.
    pub fn register_continuous(&mut self, actuator: Box<dyn ContinuousActuator>) {
        self.continuous.insert(actuator.id().to_string(), actuator);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rotary.contains_key(name) || self.continuous.contains_key(name)
    }

    /// Bind the motor called `name`, or an absent slot if there is none.
    pub fn take_rotary(&mut self, name: &str) -> RotaryDevice {
        let device = self.rotary.remove(name);
        log_binding(name, device.is_some());
        device.into()
    }

    /// Bind the servo called `name`, or an absent slot if there is none.
    pub fn take_continuous(&mut self, name: &str) -> ContinuousDevice {
        let device = self.continuous.remove(name);
        log_binding(name, device.is_some());
        device.into()
    }

    /// # Errors
    ///
    /// Returns [`ArmError::DeviceNotFound`] when no motor is registered as `name`.
    pub fn require_rotary(&mut self, name: &str) -> Result<Box<dyn RotaryActuator>, ArmError> {
        self.rotary
            .remove(name)
            .ok_or_else(|| ArmError::DeviceNotFound(name.to_string()))
    }

    /// # Errors
    ///
    /// Returns [`ArmError::DeviceNotFound`] when no servo is registered as `name`.
    pub fn require_continuous(
        &mut self,
        name: &str,
    ) -> Result<Box<dyn ContinuousActuator>, ArmError> {
        self.continuous
            .remove(name)
            .ok_or_else(|| ArmError::DeviceNotFound(name.to_string()))
    }
}

fn log_binding(name: &str, found: bool) {
    if found {
        info!(device = name, "bound device from hardware map");
    } else {
        warn!(device = name, "device not found on hardware map; dependent operations are disabled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimMotor, SimServo};

    #[test]
    fn take_rotary_binds_registered_motor() {
        let mut map = HardwareMap::new();
        map.register_rotary(Box::new(SimMotor::new("Arm Motor").with_position(12)));

        let motor = map.take_rotary("Arm Motor");
        assert!(motor.is_available());
        assert_eq!(motor.map_or(0, |m| m.position()), 12);
        // Bound devices leave the map.
        assert!(!map.contains("Arm Motor"));
    }

    #[test]
    fn missing_device_binds_absent_slot() {
        let mut map = HardwareMap::new();
        let servo = map.take_continuous("Wrist Servo");
        assert!(!servo.is_available());
        assert_eq!(servo.map_or(0.0, |s| s.position()), 0.0);
    }

    #[test]
    fn kinds_are_namespaced() {
        let mut map = HardwareMap::new();
        map.register_continuous(Box::new(SimServo::new("Flap Servo")));
        assert!(map.contains("Flap Servo"));
        assert!(!map.take_rotary("Flap Servo").is_available());
        assert!(map.take_continuous("Flap Servo").is_available());
    }

    #[test]
    fn require_reports_missing_device() {
        let mut map = HardwareMap::new();
        let result = map.require_rotary("Arm Motor");
        assert!(matches!(result, Err(ArmError::DeviceNotFound(ref n)) if n == "Arm Motor"));
        assert!(map.require_continuous("Wrist Servo").is_err());
    }

    #[test]
    fn re_registering_replaces_old_driver() {
        let mut map = HardwareMap::new();
        map.register_rotary(Box::new(SimMotor::new("joint_x").with_position(300)));
        map.register_rotary(Box::new(SimMotor::new("joint_x")));
        let motor = map.require_rotary("joint_x").unwrap();
        assert_eq!(motor.position(), 0);
    }
}
