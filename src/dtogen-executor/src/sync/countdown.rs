use std::sync::{Condvar, Mutex, PoisonError};

use super::lock;

/// A counter which lets threads block until it reached zero.
///
/// The count starts at a known number of pending completions and
/// only ever goes down.
#[derive(Debug)]
pub struct Countdown {
    remaining: Mutex<usize>,
    cond: Condvar,
}

impl Countdown {
    /// Creates a countdown expecting `count` signals.
    pub fn new(count: usize) -> Self {
        Self {
            remaining: Mutex::new(count),
            cond: Condvar::new(),
        }
    }

    /// Records one completion.
    ///
    /// Returns the remaining count. Signals past zero are ignored.
    pub fn signal(&self) -> usize {
        let mut remaining = lock(&self.remaining);
        match remaining.checked_sub(1) {
            Some(n) => {
                *remaining = n;
                if n == 0 {
                    self.cond.notify_all();
                }

                n
            }

            None => {
                log::warn!("Countdown signalled after reaching zero");
                0
            }
        }
    }

    /// The number of completions still outstanding.
    pub fn remaining(&self) -> usize {
        *lock(&self.remaining)
    }

    /// Blocks the current thread until the count reached zero.
    pub fn wait(&self) {
        let guard = lock(&self.remaining);
        let _guard = self
            .cond
            .wait_while(guard, |remaining| *remaining > 0)
            .unwrap_or_else(PoisonError::into_inner);
    }
}
