//! Runtime construction helpers.
//!
//! Downstream crates never build tokio runtimes themselves; the test macro and
//! host binaries use the functions below.

pub use tokio::runtime::{Builder, Handle, Runtime};

/// Runs the provided future to completion on a fresh current-thread runtime.
pub fn block_on<F>(future: F) -> F::Output
where
    F: std::future::Future,
{
    Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("core_async::runtime::block_on: failed to build Tokio runtime")
        .block_on(future)
}

/// Like [`block_on`], but the runtime clock starts paused and auto-advances
/// whenever every task is idle. Sleeps of minutes complete instantly.
#[cfg(feature = "test-util")]
pub fn block_on_paused<F>(future: F) -> F::Output
where
    F: std::future::Future,
{
    Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .expect("core_async::runtime::block_on_paused: failed to build Tokio runtime")
        .block_on(future)
}

/// Builds the multi-threaded runtime used by long-running hosts.
pub fn multi_thread(worker_threads: usize) -> std::io::Result<Runtime> {
    Builder::new_multi_thread()
        .worker_threads(worker_threads.max(1))
        .thread_name("playlist-mirror")
        .enable_all()
        .build()
}
