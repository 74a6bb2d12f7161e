//! Async facade for the playlist mirror workspace.
//!
//! Every `core-*`, `bridge-*` and `provider-*` crate reaches the runtime
//! through this crate instead of depending on tokio directly. The modules are
//! thin re-exports plus a few helpers, so swapping the executor or pinning a
//! tokio feature set happens in one place.
//!
//! # Modules
//!
//! - `task`: spawning async and blocking work
//! - `time`: sleeps, intervals, timeouts and the runtime-aware `Instant`
//! - `sync`: locks, channels, semaphores and `CancellationToken`
//! - `fs`: async filesystem calls
//! - `process`: async subprocesses for external tools
//!
//! # Examples
//!
//! ```rust
//! use core_async::task;
//! use core_async::time::{sleep, Duration};
//!
//! async fn example() {
//!     let handle = task::spawn(async {
//!         sleep(Duration::from_millis(10)).await;
//!         42
//!     });
//!     assert_eq!(handle.await.unwrap(), 42);
//! }
//! ```

// Test attribute so downstream crates never need a direct tokio dev-dependency.
pub use core_async_macros::test;

pub mod fs;
pub mod process;
pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

pub use task::spawn;
pub use time::{sleep, Duration, Instant};
