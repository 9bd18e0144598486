//! Reconstruction cache
//!
//! Versions are immutable, so a reconstructed `(page, version)` never goes
//! stale. The cache only bounds memory; eviction is least-recently-used.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

type Key = (String, u64);

#[derive(Debug, Default)]
struct LruState {
    entries: HashMap<Key, String>,
    /// Front is least recently used
    order: VecDeque<Key>,
}

impl LruState {
    fn touch(&mut self, key: &Key) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }
}

/// Bounded LRU cache of reconstructed content
#[derive(Debug)]
pub struct ReconstructionCache {
    capacity: usize,
    state: Mutex<LruState>,
}

impl ReconstructionCache {
    /// A capacity of 0 disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(LruState::default()),
        }
    }

    pub fn get(&self, page_id: &str, version: u64) -> Option<String> {
        if self.capacity == 0 {
            return None;
        }
        let key = (page_id.to_string(), version);
        let mut state = self.lock();
        let content = state.entries.get(&key).cloned()?;
        state.touch(&key);
        Some(content)
    }

    pub fn insert(&self, page_id: &str, version: u64, content: &str) {
        if self.capacity == 0 {
            return;
        }
        let key = (page_id.to_string(), version);
        let mut state = self.lock();

        if state.entries.insert(key.clone(), content.to_string()).is_some() {
            state.touch(&key);
            return;
        }

        state.order.push_back(key);
        while state.order.len() > self.capacity {
            if let Some(evicted) = state.order.pop_front() {
                state.entries.remove(&evicted);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
