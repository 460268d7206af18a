//! [`HostLifecycle`] – the host's initializing → running → terminated state.
//!
//! The host owns one lifecycle and hands clones to every long-running loop.
//! Loops poll it once per tick; nothing is pushed to them, so shutdown is
//! cooperative.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use armos_types::HostState;
use tracing::info;

const INITIALIZING: u8 = 0;
const RUNNING: u8 = 1;
const TERMINATED: u8 = 2;

/// Shared, cloneable view of the host lifecycle.
#[derive(Debug, Clone)]
pub struct HostLifecycle {
    state: Arc<AtomicU8>,
}

impl HostLifecycle {
    /// A lifecycle in [`HostState::Initializing`].
    pub fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(INITIALIZING)),
        }
    }

    pub fn state(&self) -> HostState {
        match self.state.load(Ordering::Acquire) {
            INITIALIZING => HostState::Initializing,
            RUNNING => HostState::Running,
            _ => HostState::Terminated,
        }
    }

    /// Move from initializing to running. Has no effect once terminated.
    pub fn start(&self) {
        if self
            .state
            .compare_exchange(INITIALIZING, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            info!("host lifecycle: running");
        }
    }

    /// Enter the terminal state from any state.
    pub fn terminate(&self) {
        if self.state.swap(TERMINATED, Ordering::AcqRel) != TERMINATED {
            info!("host lifecycle: terminated");
        }
    }
}

impl Default for HostLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
