//! Fan-out of a finite task batch onto an executor we do not own.
//!
//! Since scheduling is up to the external executor, the only lever
//! for bounding concurrency is to delay further submissions while
//! too many tasks are running. The gate is checked by the submitting
//! thread but moved by the running tasks, so the bound is soft: a
//! few tasks may briefly overshoot the limit before the gate closes.

use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use crate::{Countdown, Error, Execute, Job, ResultSlot, TaskFailure, TaskResult, Throttle};

/// Bookkeeping for one task which runs on every exit path.
///
/// A task that never started still counts towards completion, so
/// that executors dropping jobs cannot stall the barrier.
struct Completion {
    throttle: Arc<Throttle>,
    countdown: Arc<Countdown>,
    started: bool,
}

impl Completion {
    fn start(&mut self) {
        self.throttle.enter();
        self.started = true;
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if self.started {
            self.throttle.exit();
        }
        self.countdown.signal();
    }
}

/// Runs a known number of tasks on an external executor, softly
/// bounding how many of them are in flight at once, and waits for
/// all of them to finish.
///
/// A barrier is single-use; [`ThrottledFanOutBarrier::run_all`]
/// consumes it.
#[derive(Debug)]
pub struct ThrottledFanOutBarrier {
    total_tasks: usize,
    throttle: Arc<Throttle>,
    completion: Arc<Countdown>,
}

impl ThrottledFanOutBarrier {
    /// Creates a barrier for a batch of `total_tasks` tasks of which
    /// about `concurrency_limit` may run concurrently.
    pub fn new(total_tasks: usize, concurrency_limit: usize) -> Result<Self, Error> {
        if concurrency_limit == 0 {
            return Err(Error::InvalidConcurrency);
        }

        Ok(Self {
            total_tasks,
            throttle: Arc::new(Throttle::new(concurrency_limit)),
            completion: Arc::new(Countdown::new(total_tasks)),
        })
    }

    /// The number of tasks the batch must consist of.
    #[inline]
    pub fn total_tasks(&self) -> usize {
        self.total_tasks
    }

    /// The number of running tasks at which submission pauses.
    #[inline]
    pub fn concurrency_limit(&self) -> usize {
        self.throttle.limit()
    }

    /// Submits every task to `executor` and blocks until all of them
    /// completed.
    ///
    /// Before each submission, the calling thread waits for the gate
    /// to be open. Outcomes are returned in task order; a panicking
    /// task yields [`TaskFailure::Panicked`] and a task the executor
    /// dropped without running yields [`TaskFailure::Abandoned`].
    ///
    /// There is no timeout. A task that never returns blocks this
    /// call forever.
    pub fn run_all<I, F, T, E>(self, tasks: I, executor: &E) -> Result<Vec<TaskResult<T>>, Error>
    where
        I: IntoIterator<Item = F>,
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
        E: Execute + ?Sized,
    {
        let tasks: Vec<F> = tasks.into_iter().collect();
        if tasks.len() != self.total_tasks {
            return Err(Error::TaskCountMismatch {
                expected: self.total_tasks,
                actual: tasks.len(),
            });
        }

        let mut slots = Vec::with_capacity(tasks.len());
        for (index, task) in tasks.into_iter().enumerate() {
            self.throttle.wait_open();

            let slot = Arc::new(ResultSlot::new());
            slots.push(slot.clone());

            let completion = Completion {
                throttle: self.throttle.clone(),
                countdown: self.completion.clone(),
                started: false,
            };

            let job: Job = Box::new(move || {
                let mut completion = completion;
                completion.start();

                let outcome =
                    panic::catch_unwind(AssertUnwindSafe(task)).map_err(TaskFailure::from_panic);
                if let Err(failure) = &outcome {
                    log::warn!("Task {index} failed: {failure}");
                }

                // Freshly created for this job, so it cannot be filled yet.
                let _ = slot.set(outcome);
            });

            if let Err(e) = executor.execute(job) {
                log::warn!("Executor rejected task {index}: {e}");
            }
        }

        self.completion.wait();

        Ok(slots.iter().map(|slot| slot.take()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Inline;

    #[test]
    fn zero_limit_is_rejected() {
        assert!(matches!(
            ThrottledFanOutBarrier::new(4, 0),
            Err(Error::InvalidConcurrency)
        ));
    }

    #[test]
    fn empty_batch_returns_immediately() {
        let barrier = ThrottledFanOutBarrier::new(0, 2).unwrap();
        let results = barrier
            .run_all(Vec::<fn() -> u32>::new(), &Inline)
            .unwrap();

        assert!(results.is_empty());
    }

    #[test]
    fn batch_length_must_match() {
        let barrier = ThrottledFanOutBarrier::new(3, 2).unwrap();
        let tasks: Vec<fn() -> i32> = vec![|| 1, || 2];
        let err = barrier.run_all(tasks, &Inline).unwrap_err();

        assert!(matches!(
            err,
            Error::TaskCountMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn inline_limit_of_one() {
        let barrier = ThrottledFanOutBarrier::new(3, 1).unwrap();
        let results = barrier
            .run_all((0..3).map(|i| move || i * 2), &Inline)
            .unwrap();

        assert_eq!(results, vec![Ok(0), Ok(2), Ok(4)]);
    }
}
