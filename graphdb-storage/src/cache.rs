//! Bounded LRU cache fronting the disk-backed edge store (C3).

use crate::edgelist::CompressedEdgeList;
use dashmap::DashMap;
use graphdb_core::node::NodeId;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Outgoing,
    Incoming,
}

pub type CacheKey = (Direction, NodeId);

#[derive(Debug, Default, Clone, Copy)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// A concurrency-safe, capacity-bounded cache of compressed edge lists keyed
/// by `(direction, node)`. Eviction is least-recently-used, tracked via an
/// access-order deque behind a single mutex, the same split the teacher's
/// `LruCache` uses between its `DashMap` value store and `RwLock<VecDeque<K>>`
/// order tracker — simplified here since this cache carries no TTL.
pub struct EdgeCache {
    entries: DashMap<CacheKey, CompressedEdgeList>,
    order: Mutex<VecDeque<CacheKey>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl EdgeCache {
    /// `capacity` of `0` is treated as "unbounded is not allowed"; the caller
    /// (the store) is responsible for resolving `<= 0` config values to the
    /// implementation default before constructing this cache.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: CacheKey) -> Option<CompressedEdgeList> {
        match self.entries.get(&key) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                self.touch(key);
                Some(entry.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn put(&self, key: CacheKey, list: CompressedEdgeList) {
        let is_new = !self.entries.contains_key(&key);
        self.entries.insert(key, list);
        if is_new {
            let mut order = self.order.lock();
            order.push_back(key);
            while self.entries.len() > self.capacity {
                if let Some(oldest) = order.pop_front() {
                    self.entries.remove(&oldest);
                } else {
                    break;
                }
            }
        } else {
            self.touch(key);
        }
    }

    pub fn invalidate(&self, key: CacheKey) {
        self.entries.remove(&key);
        self.order.lock().retain(|k| *k != key);
    }

    fn touch(&self, key: CacheKey) {
        let mut order = self.order.lock();
        if let Some(pos) = order.iter().position(|k| *k == key) {
            order.remove(pos);
        }
        order.push_back(key);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
