use std::io;

use thiserror::Error;

use crate::config::WORKER_THREADS_VAR;

/// Errors that may occur when configuring or driving the executors.
///
/// Failures of individual tasks are never reported through this type;
/// see [`TaskFailure`](crate::TaskFailure) for those.
#[derive(Debug, Error)]
pub enum Error {
    /// A concurrency level or limit of zero was requested.
    #[error("concurrency must be a positive number")]
    InvalidConcurrency,

    /// The worker thread override in the environment is malformed.
    #[error("invalid value in {}; must be a natural number", WORKER_THREADS_VAR)]
    BadConfiguration,

    /// The worker pool no longer accepts work.
    #[error("the worker pool was already shut down")]
    ShutDown,

    /// A barrier was handed a batch of unexpected length.
    #[error("barrier expects {expected} tasks, but got {actual}")]
    TaskCountMismatch { expected: usize, actual: usize },

    /// A result slot was written more than once.
    #[error("result slot was already filled")]
    SlotAlreadyFilled,

    /// The OS refused to spawn a worker thread.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] io::Error),
}
