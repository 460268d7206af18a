//! [`SetpointExchange`] – hand-off of the arm target to the hold loop.
//!
//! Any thread may post a new target; the hold loop is the only consumer.
//! Target and wrist-tracking flag are stored together under one lock so a
//! reader never sees half of an update. The dirty flag tells the loop that a
//! new target arrived since its last pickup.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A single-axis target as consumed by the hold loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Setpoint {
    /// Arm target in encoder ticks.
    pub target: i32,
    /// Keep the wrist's absolute orientation while the arm rotates.
    pub track_wrist: bool,
}

/// Concurrency-safe holder for the arm [`Setpoint`] plus its dirty flag.
///
/// Starts dirty with a zero target so the loop picks up an initial setpoint
/// on its first iteration.
#[derive(Debug)]
pub struct SetpointExchange {
    setpoint: Mutex<Setpoint>,
    dirty: AtomicBool,
}

impl SetpointExchange {
    pub fn new() -> Self {
        Self {
            setpoint: Mutex::new(Setpoint::default()),
            dirty: AtomicBool::new(true),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Setpoint> {
        self.setpoint.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Post a new target. Does nothing when `ticks` equals the stored
    /// target, including a change of `track_wrist` alone.
    pub fn set_target(&self, ticks: i32, track_wrist: bool) {
        let mut setpoint = self.lock();
        if setpoint.target == ticks {
            return;
        }
        *setpoint = Setpoint {
            target: ticks,
            track_wrist,
        };
        self.dirty.store(true, Ordering::Release);
    }

    pub fn target(&self) -> i32 {
        self.lock().target
    }

    pub fn track_wrist(&self) -> bool {
        self.lock().track_wrist
    }

    pub fn setpoint(&self) -> Setpoint {
        *self.lock()
    }

    /// Test and clear the dirty flag; returns whether it was set.
    pub fn try_consume_dirty(&self) -> bool {
        self.dirty
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Pick up the stored setpoint if it changed since the last pickup.
    pub fn take_if_dirty(&self) -> Option<Setpoint> {
        self.try_consume_dirty().then(|| self.setpoint())
    }
}

impl Default for SetpointExchange {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_exchange_is_dirty_once() {
        let ex = SetpointExchange::new();
        assert_eq!(ex.take_if_dirty(), Some(Setpoint::default()));
        assert_eq!(ex.take_if_dirty(), None);
    }

    #[test]
    fn set_target_marks_dirty() {
        let ex = SetpointExchange::new();
        assert!(ex.try_consume_dirty());

        ex.set_target(1500, true);
        assert_eq!(ex.target(), 1500);
        assert!(ex.track_wrist());
        assert!(ex.try_consume_dirty());
        assert!(!ex.try_consume_dirty());
    }

    #[test]
    fn same_target_is_a_no_op() {
        let ex = SetpointExchange::new();
        ex.set_target(800, false);
        assert!(ex.try_consume_dirty());

        ex.set_target(800, true);
        assert!(!ex.try_consume_dirty());
        assert!(!ex.track_wrist());
    }

    #[test]
    fn last_writer_wins() {
        let ex = SetpointExchange::new();
        ex.set_target(100, false);
        ex.set_target(200, true);
        assert_eq!(
            ex.take_if_dirty(),
            Some(Setpoint {
                target: 200,
                track_wrist: true
            })
        );
    }

    #[test]
    fn concurrent_writers_leave_a_consistent_pair() {
        use std::sync::Arc;
        use std::thread;

        let ex = Arc::new(SetpointExchange::new());
        let writers: Vec<_> = (1..=4)
            .map(|i| {
                let ex = Arc::clone(&ex);
                thread::spawn(move || {
                    for n in 0..200 {
                        // Odd writers always track, even writers never do.
                        ex.set_target(i * 1000 + n, i % 2 == 1);
                    }
                })
            })
            .collect();
        for w in writers {
            w.join().unwrap();
        }
        let sp = ex.setpoint();
        let writer = sp.target / 1000;
        assert_eq!(sp.track_wrist, writer % 2 == 1);
        assert!(ex.try_consume_dirty());
    }
}
