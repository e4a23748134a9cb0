//! Insertion Order Module
//!
//! Tracks the order in which keys were first inserted, for FIFO eviction.

use std::collections::VecDeque;

// == Insertion Order ==
/// Tracks insertion order for FIFO eviction.
///
/// Keys are stored in a VecDeque where:
/// - Front = Oldest insertion
/// - Back = Newest insertion
///
/// Reads and overwrites never reorder keys.
#[derive(Debug, Default)]
pub struct InsertionOrder {
    order: VecDeque<String>,
}

impl InsertionOrder {
    // == Constructor ==
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self {
            order: VecDeque::new(),
        }
    }

    // == Push ==
    /// Records a newly inserted key at the back.
    ///
    /// Callers must only push keys that are not already tracked.
    pub fn push(&mut self, key: &str) {
        self.order.push_back(key.to_string());
    }

    // == Remove ==
    /// Removes a key from the tracker.
    pub fn remove(&mut self, key: &str) {
        self.order.retain(|k| k != key);
    }

    // == Evict Oldest ==
    /// Returns and removes the earliest inserted key.
    pub fn evict_oldest(&mut self) -> Option<String> {
        self.order.pop_front()
    }

    // == Peek Oldest ==
    /// Returns the earliest inserted key without removing it.
    pub fn peek_oldest(&self) -> Option<&String> {
        self.order.front()
    }

    /// Iterates keys from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.order.iter()
    }

    pub fn clear(&mut self) {
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    // == Contains ==
    /// Checks if a key is being tracked.
    pub fn contains(&self, key: &str) -> bool {
        self.order.iter().any(|k| k == key)
    }
}
