//! LRU cache of raw line bytes keyed by source line number.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

#[derive(Debug)]
pub struct LineCache {
    entries: LruCache<usize, Arc<[u8]>>,
}

impl LineCache {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Look up a line and mark it most recently used.
    pub fn get(&mut self, line: usize) -> Option<Arc<[u8]>> {
        self.entries.get(&line).cloned()
    }

    /// Cache a line, evicting the least recently used entry when full.
    pub fn insert(&mut self, line: usize, bytes: Arc<[u8]>) {
        self.entries.put(line, bytes);
    }

    pub fn contains(&self, line: usize) -> bool {
        self.entries.contains(&line)
    }

    /// Drop every entry for `first_line` and later; returns how many were dropped.
    pub fn invalidate_from(&mut self, first_line: usize) -> usize {
        let stale: Vec<usize> = self
            .entries
            .iter()
            .map(|(&line, _)| line)
            .filter(|&line| line >= first_line)
            .collect();
        for line in &stale {
            self.entries.pop(line);
        }
        stale.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }
}
