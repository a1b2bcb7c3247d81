//! Detection result caching.
//!
//! A fixed-capacity LRU keyed by a SHA-256 fingerprint of the exact
//! input text. The cache is only allocated when a caller opts in, so
//! the default path pays nothing for it.

use std::collections::{HashMap, VecDeque};

use sha2::{Digest, Sha256};

use crate::types::DetectionResult;

pub(crate) type Fingerprint = [u8; 32];

/// Fingerprint of the exact input text.
pub(crate) fn fingerprint(text: &str) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.finalize().into()
}

/// LRU cache of detection results. Recency order lives in a deque with
/// the least recently used fingerprint at the front.
pub(crate) struct ResultCache {
    capacity: usize,
    entries: HashMap<Fingerprint, DetectionResult>,
    order: VecDeque<Fingerprint>,
}

impl ResultCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Adjust capacity, evicting least recently used entries when
    /// shrinking below the current size.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.entries.len() > self.capacity {
            match self.order.pop_front() {
                Some(evicted) => {
                    self.entries.remove(&evicted);
                }
                None => break,
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Look up a fingerprint, refreshing its recency on a hit.
    pub fn get(&mut self, key: &Fingerprint) -> Option<DetectionResult> {
        let result = self.entries.get(key)?.clone();
        self.touch(key);
        Some(result)
    }

    /// Insert an entry, evicting the least recently used one when the
    /// cache is full. Re-inserting an existing key refreshes it.
    pub fn put(&mut self, key: Fingerprint, result: DetectionResult) {
        if self.entries.insert(key, result).is_some() {
            self.touch(&key);
            return;
        }
        if self.entries.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.entries.remove(&evicted);
            }
        }
        self.order.push_back(key);
    }

    fn touch(&mut self, key: &Fingerprint) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
            self.order.push_back(*key);
        }
    }
}
