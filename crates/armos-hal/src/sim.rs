//! In-process simulation of the arm motor and servos.
//!
//! [`SimRig`] builds a [`HardwareMap`] populated with simulated drivers that
//! record every command they receive and integrate a simple kinematic model,
//! so the hold loop and the mover can run headless in tests and on a laptop.
//!
//! Each simulated driver hands out a cloneable handle that observes (and can
//! nudge) its state after the driver itself has been moved into the map.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//!
//! use armos_hal::actuator::RotaryActuator;
//! use armos_hal::sim::{SimMotor, SimRig};
//!
//! let (mut map, rig) = SimRig::builder()
//!     .with_motor(SimMotor::new("Arm Motor").with_speed(1000.0))
//!     .build();
//!
//! let mut motor = map.take_rotary("Arm Motor");
//! motor.run_if_available(|m| m.set_power(0.5));
//! rig.step(Duration::from_millis(100));
//!
//! assert_eq!(rig.motor("Arm Motor").unwrap().position(), 50);
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use armos_types::Direction;

use crate::actuator::{ContinuousActuator, RotaryActuator};
use crate::registry::HardwareMap;

/// Most recent writes each simulated driver remembers.
pub const HISTORY_LIMIT: usize = 1024;

fn lock<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Bounded record of the values written to a driver, plus a lifetime count.
#[derive(Debug, Default)]
struct WriteLog {
    recent: VecDeque<f64>,
    total: usize,
}

impl WriteLog {
    fn push(&mut self, value: f64) {
        if self.recent.len() == HISTORY_LIMIT {
            self.recent.pop_front();
        }
        self.recent.push_back(value);
        self.total += 1;
    }

    fn to_vec(&self) -> Vec<f64> {
        self.recent.iter().copied().collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated motor
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct MotorState {
    position: f64,
    power: f64,
    powers: WriteLog,
    ticks_per_second: f64,
    direction: Direction,
}

/// A simulated gearmotor. Position advances by
/// `power * direction * ticks_per_second * dt` on every [`SimRig::step`].
pub struct SimMotor {
    id: String,
    state: Arc<Mutex<MotorState>>,
}

impl SimMotor {
    /// A forward-running motor at encoder zero, 2000 ticks/s at full power.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: Arc::new(Mutex::new(MotorState {
                position: 0.0,
                power: 0.0,
                powers: WriteLog::default(),
                ticks_per_second: 2000.0,
                direction: Direction::Forward,
            })),
        }
    }

    pub fn with_direction(self, direction: Direction) -> Self {
        lock(&self.state).direction = direction;
        self
    }

    /// Encoder speed at full power, in ticks per second.
    pub fn with_speed(self, ticks_per_second: f64) -> Self {
        lock(&self.state).ticks_per_second = ticks_per_second;
        self
    }

    pub fn with_position(self, ticks: i32) -> Self {
        lock(&self.state).position = f64::from(ticks);
        self
    }

    pub fn handle(&self) -> SimMotorHandle {
        SimMotorHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl RotaryActuator for SimMotor {
    fn id(&self) -> &str {
        &self.id
    }

    fn position(&self) -> i32 {
        lock(&self.state).position.round() as i32
    }

    fn set_power(&mut self, power: f64) {
        let mut state = lock(&self.state);
        state.power = power.clamp(-1.0, 1.0);
        state.powers.push(power);
    }
}

/// Observer for a [`SimMotor`] that has been moved into a [`HardwareMap`].
#[derive(Clone)]
pub struct SimMotorHandle {
    state: Arc<Mutex<MotorState>>,
}

impl SimMotorHandle {
    pub fn position(&self) -> i32 {
        lock(&self.state).position.round() as i32
    }

    /// Teleport the shaft, e.g. to emulate an external push.
    pub fn set_position(&self, ticks: i32) {
        lock(&self.state).position = f64::from(ticks);
    }

    /// Power currently applied (saturated to `[-1, 1]`).
    pub fn power(&self) -> f64 {
        lock(&self.state).power
    }

    /// The last [`HISTORY_LIMIT`] `set_power` arguments, oldest first.
    pub fn power_history(&self) -> Vec<f64> {
        lock(&self.state).powers.to_vec()
    }

    /// Number of `set_power` calls that reached the driver.
    pub fn power_writes(&self) -> usize {
        lock(&self.state).powers.total
    }

    pub fn step(&self, dt: Duration) {
        let mut state = lock(&self.state);
        let delta =
            state.power * state.direction.sign() * state.ticks_per_second * dt.as_secs_f64();
        state.position += delta;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated servo
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct ServoState {
    position: f64,
    commands: WriteLog,
    commanded: Option<f64>,
    slew_per_second: Option<f64>,
}

/// A simulated positional servo.
///
/// Without a slew rate it reports the commanded position immediately, like a
/// hobby servo whose feedback is the last command.
pub struct SimServo {
    id: String,
    state: Arc<Mutex<ServoState>>,
}

impl SimServo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: Arc::new(Mutex::new(ServoState {
                position: 0.0,
                commands: WriteLog::default(),
                commanded: None,
                slew_per_second: None,
            })),
        }
    }

    /// Limit travel to `per_second` of full range per second of [`SimRig::step`].
    pub fn with_slew_rate(self, per_second: f64) -> Self {
        lock(&self.state).slew_per_second = Some(per_second);
        self
    }

    pub fn with_position(self, position: f64) -> Self {
        lock(&self.state).position = position.clamp(0.0, 1.0);
        self
    }

    pub fn handle(&self) -> SimServoHandle {
        SimServoHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl ContinuousActuator for SimServo {
    fn id(&self) -> &str {
        &self.id
    }

    fn position(&self) -> f64 {
        lock(&self.state).position
    }

    fn set_position(&mut self, position: f64) {
        let mut state = lock(&self.state);
        let position = position.clamp(0.0, 1.0);
        state.commands.push(position);
        state.commanded = Some(position);
        if state.slew_per_second.is_none() {
            state.position = position;
        }
    }
}

/// Observer for a [`SimServo`] that has been moved into a [`HardwareMap`].
#[derive(Clone)]
pub struct SimServoHandle {
    state: Arc<Mutex<ServoState>>,
}

impl SimServoHandle {
    pub fn position(&self) -> f64 {
        lock(&self.state).position
    }

    pub fn commanded(&self) -> Option<f64> {
        lock(&self.state).commanded
    }

    /// The last [`HISTORY_LIMIT`] `set_position` arguments, oldest first.
    pub fn command_history(&self) -> Vec<f64> {
        lock(&self.state).commands.to_vec()
    }

    /// Number of `set_position` calls that reached the driver.
    pub fn position_writes(&self) -> usize {
        lock(&self.state).commands.total
    }

    pub fn step(&self, dt: Duration) {
        let mut state = lock(&self.state);
        let (Some(target), Some(rate)) = (state.commanded, state.slew_per_second) else {
            return;
        };
        let max_step = rate * dt.as_secs_f64();
        let delta = (target - state.position).clamp(-max_step, max_step);
        state.position += delta;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimRig builder
// ────────────────────────────────────────────────────────────────────────────

/// Builder that constructs a [`HardwareMap`] populated with simulated drivers,
/// together with a [`SimHandles`] set to observe and advance them.
#[derive(Default)]
pub struct SimRig {
    motors: Vec<SimMotor>,
    servos: Vec<SimServo>,
}

impl SimRig {
    pub fn builder() -> Self {
        Self::default()
    }

    pub fn with_motor(mut self, motor: SimMotor) -> Self {
        self.motors.push(motor);
        self
    }

    pub fn with_servo(mut self, servo: SimServo) -> Self {
        self.servos.push(servo);
        self
    }

    /// Consume the builder and return the populated map plus handles.
    pub fn build(self) -> (HardwareMap, SimHandles) {
        let mut map = HardwareMap::new();
        let mut handles = SimHandles::default();

        for motor in self.motors {
            handles.motors.insert(motor.id.clone(), motor.handle());
            map.register_rotary(Box::new(motor));
        }
        for servo in self.servos {
            handles.servos.insert(servo.id.clone(), servo.handle());
            map.register_continuous(Box::new(servo));
        }

        (map, handles)
    }
}

/// Handles to every simulated driver built by a [`SimRig`].
#[derive(Clone, Default)]
pub struct SimHandles {
    motors: HashMap<String, SimMotorHandle>,
    servos: HashMap<String, SimServoHandle>,
}

impl SimHandles {
    pub fn motor(&self, id: &str) -> Option<&SimMotorHandle> {
        self.motors.get(id)
    }

    pub fn servo(&self, id: &str) -> Option<&SimServoHandle> {
        self.servos.get(id)
    }

    /// Advance every simulated driver by `dt`.
    pub fn step(&self, dt: Duration) {
        for motor in self.motors.values() {
            motor.step(dt);
        }
        for servo in self.servos.values() {
            servo.step(dt);
        }
    }
}
