//! A fixed-size pool of persistent worker threads.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Condvar, Mutex, MutexGuard, PoisonError,
    },
    thread::{self, JoinHandle},
};

use crate::{config, Context, Error};

mod item;
pub use item::{Job, WorkItem};

const WORKER_NAME: &str = "dtogen-pool";
const WORKER_STACK: usize = 1_048_576;

struct State {
    queue: VecDeque<WorkItem>,
    threads: Vec<JoinHandle<()>>,
    waiting: usize,
    shutdown: bool,
}

struct Shared {
    state: Mutex<State>,
    available: Condvar,
    // Fast path for the start check; the authoritative answer is
    // whether `State::threads` was populated under the lock.
    started: AtomicBool,
}

impl Shared {
    // Work items never run while the lock is held, so a poisoned
    // mutex cannot leave the state half-updated.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_item(&self) -> Option<WorkItem> {
        let mut state = self.lock();
        if state.shutdown {
            return None;
        }

        loop {
            if let Some(item) = state.queue.pop_front() {
                return Some(item);
            }

            state.waiting += 1;
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
            state.waiting -= 1;

            if state.shutdown {
                return None;
            }
        }
    }

    fn dispatch_loop(&self) {
        // A panicking item unwinds straight through here and takes
        // the worker thread down with it.
        while let Some(item) = self.next_item() {
            log::trace!("Dispatching {item:?}");
            item.invoke();
        }
    }
}

/// A pool of `concurrency_level` threads draining one shared FIFO queue.
///
/// Threads are spawned lazily on the first submission. Submission
/// never blocks on capacity since the queue is unbounded.
///
/// # Failure semantics
///
/// Panics escaping a work item are not caught. They terminate the
/// worker that ran the item, permanently reducing the capacity of
/// the pool by one. Work that needs isolation must catch its own
/// panics.
///
/// # Shutdown
///
/// [`WorkerPool::shutdown`] does not drain the queue. Items that no
/// worker claimed before observing the shutdown are dropped without
/// being executed.
pub struct WorkerPool {
    shared: Arc<Shared>,
    concurrency_level: usize,
    flow_context: bool,
}

impl WorkerPool {
    /// Creates a new pool with `concurrency_level` worker threads.
    ///
    /// When `flow_context` is set, the submitter's [`Context`] is
    /// captured with every item and active while it runs.
    ///
    /// No threads are started until the first submission.
    pub fn new(concurrency_level: usize, flow_context: bool) -> Result<Self, Error> {
        if concurrency_level == 0 {
            return Err(Error::InvalidConcurrency);
        }

        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    queue: VecDeque::new(),
                    threads: Vec::new(),
                    waiting: 0,
                    shutdown: false,
                }),
                available: Condvar::new(),
                started: AtomicBool::new(false),
            }),
            concurrency_level,
            flow_context,
        })
    }

    /// Creates a context-flowing pool sized after the default number
    /// of worker threads.
    ///
    /// See [`config::available_threads`] for how the size is chosen.
    pub fn from_env() -> Result<Self, Error> {
        Self::new(config::available_threads()?, true)
    }

    /// The number of worker threads this pool runs.
    #[inline]
    pub fn concurrency_level(&self) -> usize {
        self.concurrency_level
    }

    /// Whether caller context is captured on submission.
    #[inline]
    pub fn flows_context(&self) -> bool {
        self.flow_context
    }

    /// Whether the worker threads were started.
    pub fn is_started(&self) -> bool {
        self.shared.started.load(Ordering::Acquire)
    }

    /// The number of items waiting to be claimed by a worker.
    pub fn queued(&self) -> usize {
        self.shared.lock().queue.len()
    }

    /// Submits a closure for execution on one of the workers.
    pub fn submit<F>(&self, work: F) -> Result<(), Error>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit_item(WorkItem::new(work))
    }

    /// Submits `work` to be called with `argument` on one of the workers.
    pub fn submit_with<F, A>(&self, work: F, argument: A) -> Result<(), Error>
    where
        F: FnOnce(A) + Send + 'static,
        A: Send + 'static,
    {
        self.submit_item(WorkItem::with_argument(work, argument))
    }

    /// Submits a prepared [`WorkItem`].
    ///
    /// If context flowing is enabled, the current [`Context`] replaces
    /// whatever context the item carried.
    pub fn submit_item(&self, mut item: WorkItem) -> Result<(), Error> {
        if self.flow_context {
            item = item.in_context(Context::capture());
        }

        self.ensure_started()?;

        let mut state = self.shared.lock();
        if state.shutdown {
            return Err(Error::ShutDown);
        }

        state.queue.push_back(item);
        if state.waiting > 0 {
            self.shared.available.notify_one();
        }

        Ok(())
    }

    fn ensure_started(&self) -> Result<(), Error> {
        if self.shared.started.load(Ordering::Acquire) {
            return Ok(());
        }

        let mut state = self.shared.lock();
        if state.shutdown {
            return Err(Error::ShutDown);
        }
        if !state.threads.is_empty() {
            return Ok(());
        }

        log::debug!("Starting {} pool workers", self.concurrency_level);

        // Whatever got spawned before a failure stays registered so
        // that shutdown can join it; the pool just runs short-handed.
        let mut result = Ok(());
        for id in 0..self.concurrency_level {
            let shared = self.shared.clone();
            let spawned = thread::Builder::new()
                .name(format!("{WORKER_NAME}-{id}"))
                .stack_size(WORKER_STACK)
                .spawn(move || shared.dispatch_loop());

            match spawned {
                Ok(handle) => state.threads.push(handle),
                Err(e) => {
                    result = Err(Error::Spawn(e));
                    break;
                }
            }
        }

        if !state.threads.is_empty() {
            self.shared.started.store(true, Ordering::Release);
        }

        result
    }

    /// Stops the pool and waits for all worker threads to exit.
    ///
    /// Workers finish the item they are currently running, but no
    /// further items are claimed. Calling this a second time fails
    /// with [`Error::ShutDown`].
    ///
    /// Must not be called from inside a work item of this pool; the
    /// calling worker is left detached in that case.
    pub fn shutdown(&self) -> Result<(), Error> {
        let (threads, abandoned) = {
            let mut state = self.shared.lock();
            if state.shutdown {
                return Err(Error::ShutDown);
            }

            state.shutdown = true;
            self.shared.available.notify_all();

            (
                std::mem::take(&mut state.threads),
                std::mem::take(&mut state.queue),
            )
        };

        log::debug!("Shutting down pool with {} workers", threads.len());

        let me = thread::current().id();
        for handle in threads {
            if handle.thread().id() == me {
                continue;
            }

            if handle.join().is_err() {
                log::warn!("A pool worker had died from a panicking work item");
            }
        }

        if !abandoned.is_empty() {
            log::warn!(
                "Pool shut down with {} unclaimed work items",
                abandoned.len()
            );
        }

        Ok(())
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}
