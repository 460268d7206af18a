//! `armos-hal` – Hardware Abstraction Layer.
//!
//! Everything between the control code and the physical (or simulated)
//! joints.
//!
//! # Modules
//!
//! - [`actuator`] – [`RotaryActuator`][actuator::RotaryActuator] and
//!   [`ContinuousActuator`][actuator::ContinuousActuator] driver traits.
//! - [`device`] – [`ConditionalDevice`][device::ConditionalDevice]: a device
//!   slot that may be empty, with run-if-available combinators.
//! - [`registry`] – [`HardwareMap`][registry::HardwareMap]: binds drivers by
//!   their configured name.
//! - [`interface`] – [`HardwareInterface`][interface::HardwareInterface]:
//!   write-deduplicating, per-axis serialized access shared by every control
//!   thread.
//! - [`pid`] – live-tunable [`PidGains`][pid::PidGains] and the discrete
//!   [`PidState`][pid::PidState] law used by the arm hold loop.
//! - [`sim`] – simulated motor and servos plus the
//!   [`SimRig`][sim::SimRig] builder for headless runs.

pub mod actuator;
pub mod device;
pub mod interface;
pub mod pid;
pub mod registry;
pub mod sim;

pub use actuator::{ContinuousActuator, RotaryActuator};
pub use device::ConditionalDevice;
pub use interface::HardwareInterface;
pub use pid::{GainSnapshot, PidGains, PidState};
pub use registry::{ContinuousDevice, HardwareMap, RotaryDevice};
