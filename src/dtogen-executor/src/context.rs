//! Ambient caller context which may flow into deferred work.
//!
//! Every thread has a current [`Context`], empty unless one was
//! installed with [`Context::enter`] or [`Context::scope`]. A
//! [`WorkerPool`](crate::WorkerPool) configured to flow context
//! captures the submitter's current context and installs it again
//! around the execution of the work item.

use std::{cell::RefCell, collections::BTreeMap, fmt, marker::PhantomData, sync::Arc};

thread_local! {
    static CURRENT: RefCell<Context> = RefCell::new(Context::empty());
}

/// An immutable snapshot of ambient key/value state, such as a
/// locale, a security principal or a tracing scope.
///
/// Contexts are cheap to clone; deriving a new context with
/// [`Context::with`] leaves the original untouched.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Context {
    values: Arc<BTreeMap<String, String>>,
}

impl Context {
    /// Creates a context without any values.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Gets a clone of the context active on the current thread.
    pub fn current() -> Self {
        CURRENT.with(|c| c.borrow().clone())
    }

    /// Captures the current context for later restoration.
    ///
    /// Empty contexts are not worth carrying around, so `None` is
    /// returned for them.
    pub fn capture() -> Option<Self> {
        let current = Self::current();
        (!current.is_empty()).then_some(current)
    }

    /// Derives a new context with `key` set to `value`.
    #[must_use]
    pub fn with(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut values = (*self.values).clone();
        values.insert(key.into(), value.into());

        Self {
            values: Arc::new(values),
        }
    }

    /// Looks up the value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Whether the context holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Installs this context on the current thread.
    ///
    /// The previously active context is restored when the returned
    /// guard is dropped, which also happens during unwinding.
    #[must_use = "the context is uninstalled when the guard is dropped"]
    pub fn enter(self) -> ContextGuard {
        let previous = CURRENT.with(|c| c.replace(self));

        ContextGuard {
            previous: Some(previous),
            _not_send: PhantomData,
        }
    }

    /// Runs `f` with this context installed on the current thread.
    pub fn scope<F, R>(self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = self.enter();
        f()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.values.iter()).finish()
    }
}

/// Restores the previously active [`Context`] when dropped.
///
/// Guards are bound to the thread that created them.
pub struct ContextGuard {
    previous: Option<Context>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            // The thread-local may already be gone during thread teardown.
            let _ = CURRENT.try_with(|c| c.replace(previous));
        }
    }
}
