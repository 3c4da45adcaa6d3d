use std::sync::{Condvar, Mutex, PoisonError};

use super::lock;

#[derive(Debug)]
struct State {
    in_flight: usize,
    open: bool,
}

/// An in-flight counter driving a manual-reset gate.
///
/// The gate closes when the number of running tasks reaches the
/// limit and reopens once it drops below again. Counter and gate
/// share one lock, so every gate transition is ordered after the
/// counter update that caused it.
#[derive(Debug)]
pub struct Throttle {
    state: Mutex<State>,
    cond: Condvar,
    limit: usize,
}

impl Throttle {
    /// Creates an open throttle for at most `limit` running tasks.
    pub fn new(limit: usize) -> Self {
        Self {
            state: Mutex::new(State {
                in_flight: 0,
                open: true,
            }),
            cond: Condvar::new(),
            limit,
        }
    }

    /// The number of running tasks at which the gate closes.
    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Records that a task started running.
    ///
    /// Returns the new in-flight count.
    pub fn enter(&self) -> usize {
        let mut state = lock(&self.state);
        state.in_flight += 1;
        if state.in_flight == self.limit {
            state.open = false;
        }

        state.in_flight
    }

    /// Records that a task finished running.
    ///
    /// Returns the new in-flight count.
    pub fn exit(&self) -> usize {
        let mut state = lock(&self.state);
        state.in_flight = state.in_flight.saturating_sub(1);
        if state.in_flight < self.limit && !state.open {
            state.open = true;
            self.cond.notify_all();
        }

        state.in_flight
    }

    /// The number of tasks currently running.
    pub fn in_flight(&self) -> usize {
        lock(&self.state).in_flight
    }

    /// Whether new submissions may proceed.
    pub fn is_open(&self) -> bool {
        lock(&self.state).open
    }

    /// Blocks the current thread while the gate is closed.
    pub fn wait_open(&self) {
        let guard = lock(&self.state);
        let _guard = self
            .cond
            .wait_while(guard, |state| !state.open)
            .unwrap_or_else(PoisonError::into_inner);
    }
}
