// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared sets: tasks currently being transferred, and reachable
//! remote IPs.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

/// Tasks with a transfer subprocess in progress.
///
/// Guarantees at-most-one concurrent transfer per path: `begin` claims a
/// task atomically and fails if some worker already holds it.
#[derive(Clone, Default)]
pub struct InFlightSet {
    inner: Arc<Mutex<HashSet<String>>>,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `task`. Returns false if it is already in flight.
    pub fn begin(&self, task: &str) -> bool {
        self.inner.lock().insert(task.to_string())
    }

    /// Release a claim taken with [`begin`](Self::begin).
    pub fn finish(&self, task: &str) {
        self.inner.lock().remove(task);
    }

    pub fn contains(&self, task: &str) -> bool {
        self.inner.lock().contains(task)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Sorted copy for status reporting.
    pub fn snapshot(&self) -> Vec<String> {
        let mut items: Vec<String> = self.inner.lock().iter().cloned().collect();
        items.sort();
        items
    }
}

/// Remote IPs the prober last reported as responding.
#[derive(Clone, Default)]
pub struct IpSet {
    inner: Arc<Mutex<HashSet<String>>>,
}

impl IpSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `ip` was newly added.
    pub fn insert(&self, ip: &str) -> bool {
        self.inner.lock().insert(ip.to_string())
    }

    /// Returns true if `ip` was present.
    pub fn remove(&self, ip: &str) -> bool {
        self.inner.lock().remove(ip)
    }

    pub fn contains(&self, ip: &str) -> bool {
        self.inner.lock().contains(ip)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Sorted copy for status reporting.
    pub fn snapshot(&self) -> Vec<String> {
        let mut items: Vec<String> = self.inner.lock().iter().cloned().collect();
        items.sort();
        items
    }
}

#[cfg(test)]
#[path = "sets_tests.rs"]
mod tests;
