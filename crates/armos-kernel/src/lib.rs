//! `armos-kernel` – arm motion control.
//!
//! The two ways of moving the arm, plus the shared state they hand off
//! through. Everything here talks to hardware only via
//! [`armos_hal::HardwareInterface`].
//!
//! # Modules
//!
//! - [`lifecycle`] – [`HostLifecycle`][lifecycle::HostLifecycle]: polled
//!   initializing / running / terminated state shared with every loop.
//! - [`setpoint`] – [`SetpointExchange`][setpoint::SetpointExchange]:
//!   lock-protected arm target plus a dirty flag, consumed by the hold loop.
//! - [`control_loop`] – [`ArmPositionUpdater`][control_loop::ArmPositionUpdater]:
//!   the PID position-hold loop on its own thread.
//! - [`command`] – [`RotationCommand`][command::RotationCommand]: the
//!   immutable combined arm + wrist target.
//! - [`safety`] – payload-safety, wrist-danger, and power-calculator
//!   collaborators injected into the mover.
//! - [`mover`] – [`ArmAndWristMover`][mover::ArmAndWristMover]: classifies
//!   combined requests and steps both joints towards them.

pub mod command;
pub mod control_loop;
pub mod lifecycle;
pub mod mover;
pub mod safety;
pub mod setpoint;

pub use command::RotationCommand;
pub use control_loop::ArmPositionUpdater;
pub use lifecycle::HostLifecycle;
pub use mover::ArmAndWristMover;
pub use safety::{
    CarryZone, DangerZone, PayloadSafety, PowerCalculator, ProportionalPowerCalculator,
    WristDanger,
};
pub use setpoint::{Setpoint, SetpointExchange};
