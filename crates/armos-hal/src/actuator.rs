//! Actuator traits for the two joint kinds of the manipulator.
//!
//! Drivers implement these traits and register themselves with a
//! [`HardwareMap`][crate::registry::HardwareMap]. The control code only ever
//! talks to the traits, so simulated and physical drivers are interchangeable.
//!
//! Neither trait returns errors: a connected device always accepts a command,
//! and a missing one is represented by an empty
//! [`ConditionalDevice`][crate::device::ConditionalDevice] instead.

/// A DC motor with a quadrature encoder, driven open-loop by power.
pub trait RotaryActuator: Send {
    /// Stable identifier, e.g. `"Arm Motor"`.
    fn id(&self) -> &str;

    /// Current encoder position in ticks.
    fn position(&self) -> i32;

    /// Apply `power` in `[-1, 1]`. Values outside the range are saturated by
    /// the driver.
    fn set_power(&mut self, power: f64);
}

/// A positional servo commanded by a fraction of its travel.
pub trait ContinuousActuator: Send {
    /// Stable identifier, e.g. `"Wrist Servo"`.
    fn id(&self) -> &str;

    /// Current position as a fraction of travel in `[0, 1]`.
    fn position(&self) -> f64;

    /// Command the servo to `position` in `[0, 1]`.
    fn set_position(&mut self, position: f64);
}
