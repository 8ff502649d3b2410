// Bounded query -> results cache behind the add-player search box.
//
// Eviction is first-in-first-out by insertion order. A cache hit does not
// refresh an entry's position.

use std::collections::{HashMap, VecDeque};

pub const DEFAULT_CAPACITY: usize = 20;

#[derive(Debug, Clone)]
pub struct SearchCache<T> {
    capacity: usize,
    entries: HashMap<String, Vec<T>>,
    /// Queries in insertion order, oldest first.
    insertion_order: VecDeque<String>,
}

impl<T> SearchCache<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        SearchCache {
            capacity,
            entries: HashMap::with_capacity(capacity + 1),
            insertion_order: VecDeque::with_capacity(capacity + 1),
        }
    }

    /// Exact-string lookup on the raw query.
    pub fn get(&self, query: &str) -> Option<&[T]> {
        self.entries.get(query).map(Vec::as_slice)
    }

    /// Store results for `query`. Re-inserting an existing query replaces its
    /// results in place without moving it in the eviction order. Returns the
    /// evicted query, if any.
    pub fn insert(&mut self, query: impl Into<String>, results: Vec<T>) -> Option<String> {
        let query = query.into();
        if let Some(existing) = self.entries.get_mut(&query) {
            *existing = results;
            return None;
        }

        self.insertion_order.push_back(query.clone());
        self.entries.insert(query, results);

        if self.insertion_order.len() > self.capacity {
            let oldest = self.insertion_order.pop_front()?;
            self.entries.remove(&oldest);
            return Some(oldest);
        }
        None
    }

    pub fn contains(&self, query: &str) -> bool {
        self.entries.contains_key(query)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.insertion_order.clear();
    }
}

impl<T> Default for SearchCache<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
