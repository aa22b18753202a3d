//! Units of background work.

/// An opaque unit of work with a single entry point.
///
/// Ownership moves to the queue on submission and to the executing thread on
/// dequeue; the task is consumed by [`run`](Task::run), so it executes at most
/// once and is dropped right after.
///
/// A task must not fail: the pool does not catch panics. Tasks that need
/// resilience trap their own failures before returning.
pub trait Task: Send {
    /// Execute the task, consuming it.
    fn run(self: Box<Self>);
}

impl<F> Task for F
where
    F: FnOnce() + Send,
{
    fn run(self: Box<Self>) {
        (*self)();
    }
}

/// Caller's estimate of how long a background task will run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExpectedRuntime {
    /// Finishes quickly.
    #[default]
    Short,
    /// May occupy a worker for a long time.
    Long,
}
