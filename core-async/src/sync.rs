//! Synchronization primitives.
//!
//! Async-aware locks and channels from `tokio::sync`, plus the cancellation
//! token used to stop background loops.
//!
//! Unbounded `mpsc` senders are the cross-thread handoff primitive: `send` is
//! synchronous and may be called from threads the runtime does not own (for
//! example an audio callback thread).
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::{CancellationToken, Mutex};
//!
//! async fn example() {
//!     let mutex = Mutex::new(1);
//!     *mutex.lock().await += 1;
//!
//!     let token = CancellationToken::new();
//!     token.cancel();
//!     token.cancelled().await;
//! }
//! ```

pub use tokio::sync::{
    broadcast, mpsc, oneshot, watch, Mutex, MutexGuard, Notify, OwnedRwLockReadGuard,
    OwnedRwLockWriteGuard, OwnedSemaphorePermit, RwLock, RwLockReadGuard, RwLockWriteGuard,
    Semaphore, SemaphorePermit,
};
pub use tokio_util::sync::CancellationToken;
