//! Lock service capability.
//!
//! The gate only issues `acquire`/`release` calls keyed by [`LockKey`]; it
//! never stores a lock handle. Exclusivity across processes is entirely the
//! implementation's job.
//!
//! Every lock is labelled with a holder (the work item name). `release` only
//! removes a lock carrying the same holder, so a self-heal pass for one work
//! item can never drop a lock held for another.
//!
//! # Implementations
//!
//! - [`FileLockService`]: one lock file per key, created with create-new
//!   semantics so only one process can hold a key at a time.
//! - [`MemoryLockService`]: in-process map, for tests and embedding.

mod file;
mod memory;

pub use file::{FileLockService, LockInfo, LockMetadata};
pub(crate) use file::owner_string;
pub use memory::MemoryLockService;

use crate::error::Result;
use crate::key::LockKey;

/// A named, non-blocking mutual-exclusion service.
pub trait LockService {
    /// Try once to take the lock for `holder`.
    ///
    /// Returns `Ok(false)` when the key is already held, by anyone. Contention
    /// is an expected outcome, not an error.
    fn acquire(&self, key: &LockKey, holder: &str) -> Result<bool>;

    /// Release the lock if `holder` holds it.
    ///
    /// Safe to call on an unheld key or a key held by someone else.
    fn release(&self, key: &LockKey, holder: &str) -> Result<()>;
}

impl<L: LockService + ?Sized> LockService for &L {
    fn acquire(&self, key: &LockKey, holder: &str) -> Result<bool> {
        (**self).acquire(key, holder)
    }

    fn release(&self, key: &LockKey, holder: &str) -> Result<()> {
        (**self).release(key, holder)
    }
}
