//! Exclusive access to the live library directory.
//!
//! The directory swap removes the live library and moves the staged copy into
//! place. The player must not open a file or list the library halfway through
//! that, so both sides share one [`LibraryGate`]: the swap holds it for
//! writing, and the player holds it for reading from the moment it looks at
//! the library until the new stream is published as active.

use std::sync::Arc;

use core_async::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

#[derive(Clone, Default)]
pub struct LibraryGate {
    lock: Arc<RwLock<()>>,
}

impl LibraryGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared access; many readers at once, none during a swap.
    pub async fn read(&self) -> OwnedRwLockReadGuard<()> {
        Arc::clone(&self.lock).read_owned().await
    }

    /// Exclusive access for replacing the live directory.
    pub async fn write(&self) -> OwnedRwLockWriteGuard<()> {
        Arc::clone(&self.lock).write_owned().await
    }
}
