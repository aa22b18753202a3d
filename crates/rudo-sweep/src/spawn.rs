//! Thread creation for workers and sweepers.

use crate::sync::{Builder, JoinHandle};

/// Spawn a named OS thread, aborting the process if the OS refuses.
///
/// Both thread groups promise a fixed amount of parallelism to their
/// callers, so a failed spawn is not degraded into fewer threads.
#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
pub fn spawn_named<F>(name: &str, f: F) -> JoinHandle<()>
where
    F: FnOnce() + Send + 'static,
{
    match Builder::new().name(name.to_owned()).spawn(f) {
        Ok(handle) => handle,
        Err(error) => {
            #[cfg(feature = "tracing")]
            crate::tracing::internal::log_spawn_failed(name, &error);
            std::process::abort()
        }
    }
}
