//! Per-page writer locks
//!
//! Version numbers must be gap-free, so writers of the same page run one at
//! a time. Different pages never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
pub struct PageLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl PageLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock handle for a page; hold the guard from `.lock()` for the whole write.
    pub fn handle(&self, page_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(page_id.to_string()).or_default())
    }
}

/// Acquire a page lock, ignoring poisoning: the guarded state is on disk.
pub fn acquire(handle: &Mutex<()>) -> MutexGuard<'_, ()> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_page_shares_lock() {
        let locks = PageLocks::new();
        let a = locks.handle("uuid-1");
        let b = locks.handle("uuid-1");
        let c = locks.handle("uuid-2");

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn test_guard_excludes_second_writer() {
        let locks = PageLocks::new();
        let handle = locks.handle("uuid-1");
        let _guard = acquire(&handle);

        let other = locks.handle("uuid-1");
        assert!(other.try_lock().is_err());
        assert!(locks.handle("uuid-2").try_lock().is_ok());
    }
}
