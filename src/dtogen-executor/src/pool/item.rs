use std::fmt;

use crate::Context;

/// A type-erased unit of work which can be sent to another thread.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// A deferred unit of work for the [`WorkerPool`](super::WorkerPool).
///
/// Consists of the callable (with its argument already bound) and,
/// optionally, the caller [`Context`] captured at submission time.
pub struct WorkItem {
    job: Job,
    context: Option<Context>,
}

impl WorkItem {
    /// Creates a work item from a closure.
    pub fn new<F>(work: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            job: Box::new(work),
            context: None,
        }
    }

    /// Creates a work item which calls `work` with `argument`.
    pub fn with_argument<F, A>(work: F, argument: A) -> Self
    where
        F: FnOnce(A) + Send + 'static,
        A: Send + 'static,
    {
        Self::new(move || work(argument))
    }

    /// Attaches a captured caller context to the item.
    #[must_use]
    pub fn in_context(mut self, context: Option<Context>) -> Self {
        self.context = context;
        self
    }

    /// The captured context, if any.
    pub fn context(&self) -> Option<&Context> {
        self.context.as_ref()
    }

    /// Runs the work, under the captured context when present.
    ///
    /// Panics from the callable propagate to the caller.
    pub fn invoke(self) {
        match self.context {
            Some(ctx) => ctx.scope(self.job),
            None => (self.job)(),
        }
    }
}

impl fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkItem")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
