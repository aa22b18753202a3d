//! Synchronization primitives used by the sweeper handshake.
//!
//! Normal builds use `parking_lot` and `std`. Under `--cfg loom` the same
//! names resolve to `loom`'s models so the handshake can be checked
//! exhaustively.

#[cfg(not(loom))]
pub use parking_lot::{Condvar, Mutex, MutexGuard};
#[cfg(not(loom))]
pub use std::sync::atomic::AtomicBool;
#[cfg(not(loom))]
pub use std::sync::Arc;
#[cfg(not(loom))]
pub use std::thread::{Builder, JoinHandle};

/// Block on `cond`, handing the guard back once woken.
#[cfg(not(loom))]
pub fn wait<'a, T>(cond: &Condvar, mut guard: MutexGuard<'a, T>) -> MutexGuard<'a, T> {
    cond.wait(&mut guard);
    guard
}

#[cfg(loom)]
pub use self::model::{wait, Condvar, Mutex, MutexGuard};
#[cfg(loom)]
pub use loom::sync::atomic::AtomicBool;
#[cfg(loom)]
pub use loom::sync::Arc;
#[cfg(loom)]
pub use loom::thread::{Builder, JoinHandle};

#[cfg(loom)]
mod model {
    use std::fmt;
    use std::sync::PoisonError;

    pub type MutexGuard<'a, T> = loom::sync::MutexGuard<'a, T>;

    /// `loom` mutex with `parking_lot`'s non-poisoning `lock`.
    pub struct Mutex<T>(loom::sync::Mutex<T>);

    impl<T> Mutex<T> {
        pub fn new(value: T) -> Self {
            Self(loom::sync::Mutex::new(value))
        }

        pub fn lock(&self) -> MutexGuard<'_, T> {
            self.0.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    impl<T: Default> Default for Mutex<T> {
        fn default() -> Self {
            Self::new(T::default())
        }
    }

    impl<T> fmt::Debug for Mutex<T> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("Mutex").finish_non_exhaustive()
        }
    }

    pub struct Condvar(loom::sync::Condvar);

    impl Condvar {
        pub fn new() -> Self {
            Self(loom::sync::Condvar::new())
        }

        pub fn notify_one(&self) {
            self.0.notify_one();
        }

        pub fn notify_all(&self) {
            self.0.notify_all();
        }
    }

    impl Default for Condvar {
        fn default() -> Self {
            Self::new()
        }
    }

    impl fmt::Debug for Condvar {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("Condvar").finish_non_exhaustive()
        }
    }

    pub fn wait<'a, T>(cond: &Condvar, guard: MutexGuard<'a, T>) -> MutexGuard<'a, T> {
        cond.0.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }
}
