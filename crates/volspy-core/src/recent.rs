//! Time-windowed record of recently changed uniforms.
//!
//! Entries are kept in insertion order (a re-inserted key moves to the back)
//! and are swept lazily whenever the cache is read. The cache is purely for
//! introspection; rendering never reads it.

use std::time::{Duration, Instant};

use crate::uniforms::UniformValue;

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    name: String,
    value: UniformValue,
    stamp: Instant,
}

/// A recently set uniform together with its remaining lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct AgedUniform {
    pub name: String,
    pub value: UniformValue,
    /// Time left before the entry expires.
    pub remaining: Duration,
}

/// Bounded, age-limited map from uniform name to its last value.
#[derive(Debug, Clone)]
pub struct RecentUniforms {
    entries: Vec<Entry>,
    limit: usize,
    max_age: Duration,
}

impl RecentUniforms {
    /// Creates an empty cache holding at most `limit` entries for `max_age` each.
    pub fn new(limit: usize, max_age: Duration) -> Self {
        Self {
            entries: Vec::with_capacity(limit),
            limit: limit.max(1),
            max_age,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Records `value` for `name` now.
    pub fn insert(&mut self, name: &str, value: UniformValue) {
        self.insert_at(name, value, Instant::now());
    }

    /// Records `value` for `name` with an explicit timestamp.
    pub fn insert_at(&mut self, name: &str, value: UniformValue, stamp: Instant) {
        self.entries.retain(|e| e.name != name);
        if self.entries.len() >= self.limit {
            let excess = self.entries.len() + 1 - self.limit;
            self.entries.drain(..excess);
        }
        self.entries.push(Entry {
            name: name.to_owned(),
            value,
            stamp,
        });
    }

    /// Looks up `name`, purging expired entries first.
    pub fn get(&mut self, name: &str) -> Option<UniformValue> {
        self.get_at(name, Instant::now())
    }

    pub fn get_at(&mut self, name: &str, now: Instant) -> Option<UniformValue> {
        self.purge(now);
        self.entries.iter().find(|e| e.name == name).map(|e| e.value)
    }

    /// Live entries, soonest to expire first.
    pub fn items_aged(&mut self) -> Vec<AgedUniform> {
        self.items_aged_at(Instant::now())
    }

    pub fn items_aged_at(&mut self, now: Instant) -> Vec<AgedUniform> {
        self.purge(now);
        let mut items: Vec<AgedUniform> = self
            .entries
            .iter()
            .map(|e| AgedUniform {
                name: e.name.clone(),
                value: e.value,
                remaining: self.max_age.saturating_sub(now.saturating_duration_since(e.stamp)),
            })
            .collect();
        items.sort_by_key(|item| item.remaining);
        items
    }

    /// Drops every entry older than the maximum age.
    pub fn purge(&mut self, now: Instant) {
        let max_age = self.max_age;
        self.entries
            .retain(|e| now.saturating_duration_since(e.stamp) <= max_age);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for RecentUniforms {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(10))
    }
}
