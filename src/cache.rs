//! # Outcome cache
//!
//! Processing is deterministic, so outcomes can be memoized by the content
//! hash of the input bytes. The cache is injected into
//! [`crate::pipeline::ActivityProcessor`]; its lifetime is whatever the caller
//! gives the processor.

use crate::types::Outcome;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;

/// SHA-256 of a file's bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn of(bytes: &[u8]) -> Self {
        Self(Sha256::digest(bytes).into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Storage for processed outcomes keyed by content hash
pub trait OutcomeCache {
    fn get(&mut self, key: &ContentHash) -> Option<Outcome>;
    fn insert(&mut self, key: ContentHash, outcome: Outcome);
    fn invalidate(&mut self, key: &ContentHash);
    fn clear(&mut self);
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cache that never stores anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl OutcomeCache for NoCache {
    fn get(&mut self, _key: &ContentHash) -> Option<Outcome> {
        None
    }

    fn insert(&mut self, _key: ContentHash, _outcome: Outcome) {}

    fn invalidate(&mut self, _key: &ContentHash) {}

    fn clear(&mut self) {}

    fn len(&self) -> usize {
        0
    }
}

/// Least-recently-used cache with O(n) eviction.
///
/// Capacities are small (a handful of files), so a linear scan on eviction
/// keeps this simpler than a linked list.
#[derive(Debug)]
pub struct LruOutcomeCache {
    capacity: usize,
    entries: HashMap<ContentHash, CacheEntry>,
    access_counter: u64,
}

#[derive(Debug)]
struct CacheEntry {
    outcome: Outcome,
    last_access: u64,
}

impl LruOutcomeCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            access_counter: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains(&self, key: &ContentHash) -> bool {
        self.entries.contains_key(key)
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(key, _)| *key);
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}

impl OutcomeCache for LruOutcomeCache {
    fn get(&mut self, key: &ContentHash) -> Option<Outcome> {
        let entry = self.entries.get_mut(key)?;
        self.access_counter += 1;
        entry.last_access = self.access_counter;
        Some(entry.outcome.clone())
    }

    fn insert(&mut self, key: ContentHash, outcome: Outcome) {
        if self.capacity == 0 {
            return;
        }

        self.access_counter += 1;
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.outcome = outcome;
            entry.last_access = self.access_counter;
            return;
        }

        if self.entries.len() >= self.capacity {
            self.evict_oldest();
        }

        self.entries.insert(
            key,
            CacheEntry {
                outcome,
                last_access: self.access_counter,
            },
        );
    }

    fn invalidate(&mut self, key: &ContentHash) {
        self.entries.remove(key);
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
