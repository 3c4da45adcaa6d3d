use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use dtogen_executor::{
    config, shared_executor, Countdown, Execute, ResultSlot, TaskFailure, TaskResult,
    ThrottledFanOutBarrier, WorkerPool,
};

use crate::{CSharpEmitter, ClassDescription, Emitter, Error, SourceUnit};

/// The generated DTO for one class description.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DtoDescription {
    /// The name of the class the DTO was generated for.
    pub class_name: String,
    /// The rendered source, or why rendering failed.
    pub unit: TaskResult<SourceUnit>,
}

// Counts a pool job as done however it ends, including when the pool
// drops it unexecuted on shutdown.
struct SignalOnDrop(Arc<Countdown>);

impl Drop for SignalOnDrop {
    fn drop(&mut self) {
        self.0.signal();
    }
}

/// Generates DTO sources for batches of class descriptions, rendering
/// the classes concurrently.
pub struct DtoGenerator {
    namespace: Arc<str>,
    concurrency_limit: usize,
    emitter: Arc<dyn Emitter>,
}

impl DtoGenerator {
    /// Creates a generator declaring DTOs in `namespace` which renders
    /// about `concurrency_limit` classes at once.
    ///
    /// Uses [`CSharpEmitter`] unless configured otherwise.
    pub fn new(namespace: impl Into<String>, concurrency_limit: usize) -> Result<Self, Error> {
        let namespace = namespace.into();
        if namespace.trim().is_empty() {
            return Err(Error::EmptyNamespace);
        }
        if concurrency_limit == 0 {
            return Err(dtogen_executor::Error::InvalidConcurrency.into());
        }

        Ok(Self {
            namespace: namespace.into(),
            concurrency_limit,
            emitter: Arc::new(CSharpEmitter),
        })
    }

    /// Creates a generator whose concurrency limit is the default
    /// number of worker threads.
    pub fn from_env(namespace: impl Into<String>) -> Result<Self, Error> {
        Self::new(namespace, config::available_threads()?)
    }

    /// Replaces the emitter used for rendering classes.
    #[must_use]
    pub fn with_emitter<E: Emitter + 'static>(mut self, emitter: E) -> Self {
        self.emitter = Arc::new(emitter);
        self
    }

    /// The namespace DTOs are declared in.
    #[inline]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The number of classes rendered at once.
    #[inline]
    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    fn render_task(
        &self,
        class: ClassDescription,
    ) -> impl FnOnce() -> SourceUnit + Send + 'static {
        let emitter = self.emitter.clone();
        let namespace = self.namespace.clone();

        move || emitter.emit(&namespace, &class)
    }

    /// Renders all `classes` on the process-wide [`shared_executor`].
    ///
    /// The output preserves the order of the input.
    pub fn generate_code(
        &self,
        classes: Vec<ClassDescription>,
    ) -> Result<Vec<DtoDescription>, Error> {
        self.generate_with(classes, shared_executor()?)
    }

    /// Renders all `classes` on the given executor.
    ///
    /// Submission is throttled to roughly the configured concurrency
    /// limit and the call returns when every class was processed.
    pub fn generate_with<E>(
        &self,
        classes: Vec<ClassDescription>,
        executor: &E,
    ) -> Result<Vec<DtoDescription>, Error>
    where
        E: Execute + ?Sized,
    {
        log::debug!(
            "Generating {} DTOs in namespace '{}'",
            classes.len(),
            self.namespace
        );

        let names: Vec<String> = classes.iter().map(|c| c.name.clone()).collect();
        let tasks: Vec<_> = classes
            .into_iter()
            .map(|class| self.render_task(class))
            .collect();

        let barrier = ThrottledFanOutBarrier::new(tasks.len(), self.concurrency_limit)?;
        let units = barrier.run_all(tasks, executor)?;

        Ok(names
            .into_iter()
            .zip(units)
            .map(|(class_name, unit)| DtoDescription { class_name, unit })
            .collect())
    }

    /// Renders all `classes` on a [`WorkerPool`] owned by the caller.
    ///
    /// The pool itself bounds concurrency, so the generator's limit
    /// does not apply. Rendering panics are caught per class since
    /// they would otherwise kill pool workers.
    pub fn generate_on_pool(
        &self,
        classes: Vec<ClassDescription>,
        pool: &WorkerPool,
    ) -> Result<Vec<DtoDescription>, Error> {
        log::debug!(
            "Generating {} DTOs on a pool of {} workers",
            classes.len(),
            pool.concurrency_level()
        );

        let done = Arc::new(Countdown::new(classes.len()));
        let mut pending = Vec::with_capacity(classes.len());

        for class in classes {
            let slot = Arc::new(ResultSlot::new());
            pending.push((class.name.clone(), slot.clone()));

            let render = self.render_task(class);
            let signal = SignalOnDrop(done.clone());
            pool.submit(move || {
                let _signal = signal;
                let outcome =
                    panic::catch_unwind(AssertUnwindSafe(render)).map_err(TaskFailure::from_panic);
                let _ = slot.set(outcome);
            })?;
        }

        done.wait();

        Ok(pending
            .into_iter()
            .map(|(class_name, slot)| DtoDescription {
                class_name,
                unit: slot.take(),
            })
            .collect())
    }
}
