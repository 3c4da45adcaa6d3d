use std::sync::OnceLock;

use threadpool::{Builder, ThreadPool};

use crate::{config, Error, Job, WorkerPool};

const WORKER_NAME: &str = "dtogen-worker";
const WORKER_STACK: usize = 1_048_576;

static SHARED: OnceLock<ThreadPool> = OnceLock::new();

/// An executor which accepts type-erased jobs for running them at
/// some point, on some thread.
///
/// Jobs handed to an executor are either run or dropped; executors
/// which reject a job return an error and drop it.
pub trait Execute {
    /// Hands `job` over to the executor.
    fn execute(&self, job: Job) -> Result<(), Error>;
}

impl<E: Execute + ?Sized> Execute for &E {
    #[inline]
    fn execute(&self, job: Job) -> Result<(), Error> {
        (**self).execute(job)
    }
}

impl Execute for ThreadPool {
    fn execute(&self, job: Job) -> Result<(), Error> {
        ThreadPool::execute(self, job);
        Ok(())
    }
}

impl Execute for WorkerPool {
    fn execute(&self, job: Job) -> Result<(), Error> {
        self.submit(job)
    }
}

/// An executor flavor which runs every job on the current thread,
/// right away.
#[derive(Clone, Copy, Debug, Default)]
pub struct Inline;

impl Execute for Inline {
    fn execute(&self, job: Job) -> Result<(), Error> {
        job();
        Ok(())
    }
}

fn make_worker_pool(nthreads: usize) -> ThreadPool {
    Builder::new()
        .num_threads(nthreads)
        .thread_name(WORKER_NAME.into())
        .thread_stack_size(WORKER_STACK)
        .build()
}

/// Gets the process-wide executor shared by all fan-out batches.
///
/// The pool is created on first use and sized according to
/// [`config::available_threads`]. Its threads live for the rest of
/// the process.
pub fn shared_executor() -> Result<&'static ThreadPool, Error> {
    if let Some(pool) = SHARED.get() {
        return Ok(pool);
    }

    let nthreads = config::available_threads()?;
    Ok(SHARED.get_or_init(|| {
        log::debug!("Creating shared executor with {nthreads} threads");
        make_worker_pool(nthreads)
    }))
}
