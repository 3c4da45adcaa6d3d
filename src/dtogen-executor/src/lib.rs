//! Concurrency machinery for parallelizing DTO generation.
//!
//! # Motivation
//!
//! Rendering one DTO is cheap, rendering hundreds of them is not, and
//! every class renders independently of all others. This crate offers
//! two ways of spreading that work across threads.
//!
//! # Design
//!
//! [`WorkerPool`] owns a fixed number of persistent threads draining
//! a shared FIFO queue. It is started lazily, never applies
//! backpressure to submitters and optionally carries the submitter's
//! [`Context`] over into the work it runs.
//!
//! [`ThrottledFanOutBarrier`] runs one known batch of tasks on an
//! executor it does not own, such as the process-wide
//! [`shared_executor`]. It can only delay further submissions while
//! too many tasks are in flight, so its concurrency bound is soft.
//! Unlike the pool, it isolates task panics and always waits for
//! every task of the batch before returning.

#![deny(rust_2018_idioms, rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod barrier;
pub use barrier::ThrottledFanOutBarrier;

pub mod config;

mod context;
pub use context::{Context, ContextGuard};

mod error;
pub use error::Error;

mod execute;
pub use execute::{shared_executor, Execute, Inline};

mod pool;
pub use pool::{Job, WorkItem, WorkerPool};

mod slot;
pub use slot::{ResultSlot, TaskFailure, TaskResult};

mod sync;
pub use sync::{Countdown, Throttle};
