//! Blocking signal primitives used to coordinate fan-out batches.

use std::sync::{Mutex, MutexGuard, PoisonError};

mod countdown;
pub use countdown::Countdown;

mod throttle;
pub use throttle::Throttle;

// The guarded values are plain counters and flags which are always
// left consistent, so recovering from poisoning is sound.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
