//! [`Flap`] – the payload release flap at the end of the arm.
//!
//! The flap servo has three stops. Cycling walks them in the order
//! open-right → open-left → closed → open-right, which drops the two pixels
//! one at a time.

use std::thread;
use std::time::Duration;

use armos_hal::ContinuousDevice;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Pause between steps of [`Flap::full_cycle`] so each pixel can fall out.
pub const FLAP_CYCLE_WAIT: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlapState {
    OpenRight,
    OpenLeft,
    Closed,
}

impl FlapState {
    /// Servo position for this stop.
    pub fn position(self) -> f64 {
        match self {
            FlapState::OpenRight => 0.35,
            FlapState::OpenLeft => 0.65,
            FlapState::Closed => 0.5,
        }
    }

    pub fn next(self) -> Self {
        match self {
            FlapState::OpenRight => FlapState::OpenLeft,
            FlapState::OpenLeft => FlapState::Closed,
            FlapState::Closed => FlapState::OpenRight,
        }
    }
}

/// Flap servo plus its last commanded stop. Every operation is a no-op when
/// the servo is absent.
pub struct Flap {
    servo: ContinuousDevice,
    state: FlapState,
}

impl Flap {
    /// Bind the servo and drive it closed.
    pub fn new(servo: ContinuousDevice) -> Self {
        let mut flap = Self {
            servo,
            state: FlapState::Closed,
        };
        flap.set_state(FlapState::Closed);
        flap
    }

    pub fn is_available(&self) -> bool {
        self.servo.is_available()
    }

    pub fn state(&self) -> FlapState {
        self.state
    }

    pub fn set_state(&mut self, state: FlapState) {
        let Self { servo, state: current } = self;
        servo.run_if_available(|s| {
            *current = state;
            s.set_position(state.position());
            debug!(?state, "flap moved");
        });
    }

    /// Advance to the next stop.
    pub fn cycle(&mut self) {
        self.set_state(self.state.next());
    }

    pub fn close(&mut self) {
        self.set_state(FlapState::Closed);
    }

    /// Close, then step through every stop with [`FLAP_CYCLE_WAIT`] between
    /// steps. Blocks the caller for the whole sequence.
    pub fn full_cycle(&mut self) {
        if !self.is_available() {
            return;
        }
        self.close();
        self.cycle();
        thread::sleep(FLAP_CYCLE_WAIT);
        self.cycle();
        thread::sleep(FLAP_CYCLE_WAIT);
        self.cycle();
    }

    pub fn is_open_left(&self) -> bool {
        self.is_available() && self.state == FlapState::OpenLeft
    }

    pub fn is_open_right(&self) -> bool {
        self.is_available() && self.state == FlapState::OpenRight
    }
}
