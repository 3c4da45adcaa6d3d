use std::{
    any::Any,
    fmt,
    sync::{Mutex, MutexGuard, PoisonError},
};

use crate::Error;

/// Marks a task that did not produce a value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskFailure {
    /// The task body panicked with the given message.
    Panicked(String),
    /// The task was dropped without ever running.
    Abandoned,
}

impl TaskFailure {
    /// Converts the payload of a caught panic into a failure marker.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(s) => *s,
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(s) => (*s).to_owned(),
                Err(_) => "<non-string panic payload>".to_owned(),
            },
        };

        Self::Panicked(message)
    }
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Panicked(msg) => write!(f, "task panicked: {msg}"),
            Self::Abandoned => f.write_str("task was abandoned before it ran"),
        }
    }
}

/// Outcome of a single task as seen by the caller.
pub type TaskResult<T> = Result<T, TaskFailure>;

/// A write-once cell receiving the outcome of one task.
///
/// The slot is owned by the caller and shared with the task, which
/// fills it exactly once. It should only be read after the task has
/// signalled its completion.
pub struct ResultSlot<T> {
    value: Mutex<Option<TaskResult<T>>>,
}

impl<T> ResultSlot<T> {
    /// Creates an empty slot.
    pub const fn new() -> Self {
        Self {
            value: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<TaskResult<T>>> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores the outcome of the task.
    ///
    /// Fails if the slot was already written.
    pub fn set(&self, outcome: TaskResult<T>) -> Result<(), Error> {
        let mut value = self.lock();
        if value.is_some() {
            return Err(Error::SlotAlreadyFilled);
        }

        *value = Some(outcome);
        Ok(())
    }

    /// Whether the slot was written.
    pub fn is_filled(&self) -> bool {
        self.lock().is_some()
    }

    /// Takes the outcome out of the slot.
    ///
    /// A slot that was never written yields [`TaskFailure::Abandoned`].
    pub fn take(&self) -> TaskResult<T> {
        self.lock().take().unwrap_or(Err(TaskFailure::Abandoned))
    }
}

impl<T> Default for ResultSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ResultSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultSlot")
            .field("filled", &self.is_filled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn written_once() {
        let slot = ResultSlot::new();
        slot.set(Ok(1)).unwrap();

        assert!(matches!(slot.set(Ok(2)), Err(Error::SlotAlreadyFilled)));
        assert_eq!(slot.take(), Ok(1));
    }

    #[test]
    fn empty_slot_is_abandoned() {
        let slot = ResultSlot::<()>::new();
        assert_eq!(slot.take(), Err(TaskFailure::Abandoned));
    }

    #[test]
    fn panic_messages() {
        let payload = std::panic::catch_unwind(|| panic!("code {}", 7)).unwrap_err();
        assert_eq!(
            TaskFailure::from_panic(payload),
            TaskFailure::Panicked("code 7".into())
        );

        let payload = std::panic::catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(
            TaskFailure::from_panic(payload),
            TaskFailure::Panicked("static".into())
        );
    }
}
