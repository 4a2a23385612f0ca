//! In-process lock service.

use super::LockService;
use crate::error::{AloneError, Result};
use crate::key::LockKey;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Lock service backed by a mutex-guarded map of key to holder.
#[derive(Debug, Default)]
pub struct MemoryLockService {
    held: Mutex<HashMap<LockKey, String>>,
}

impl MemoryLockService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current holder of `key`, if any.
    pub fn holder(&self, key: &LockKey) -> Option<String> {
        self.held.lock().ok()?.get(key).cloned()
    }

    fn table(&self) -> Result<MutexGuard<'_, HashMap<LockKey, String>>> {
        self.held
            .lock()
            .map_err(|_| AloneError::LockService("lock table mutex poisoned".to_string()))
    }
}

impl LockService for MemoryLockService {
    fn acquire(&self, key: &LockKey, holder: &str) -> Result<bool> {
        let mut table = self.table()?;
        if table.contains_key(key) {
            return Ok(false);
        }
        table.insert(key.clone(), holder.to_string());
        Ok(true)
    }

    fn release(&self, key: &LockKey, holder: &str) -> Result<()> {
        let mut table = self.table()?;
        if table.get(key).is_some_and(|h| h == holder) {
            table.remove(key);
        }
        Ok(())
    }
}
