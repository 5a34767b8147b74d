// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded deduplicating FIFO of task paths.
//!
//! Two instances exist in the daemon: the task queue (drained in batches
//! by the worker pool) and the retry queue (drained whole by the retry
//! loop). A queue never holds duplicates and never exceeds its capacity;
//! every insert past half capacity logs a warning.

use parking_lot::Mutex;
use tracing::{debug, error, warn};

/// Result of a [`DedupQueue::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Appended to the tail.
    Added,
    /// Already queued; nothing changed.
    Duplicate,
    /// Queue is at capacity; the task was dropped.
    Rejected,
}

/// Ordered task queue with O(len) duplicate suppression.
pub struct DedupQueue {
    name: &'static str,
    capacity: usize,
    items: Mutex<Vec<String>>,
}

impl DedupQueue {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self { name, capacity, items: Mutex::new(Vec::new()) }
    }

    /// Append `task` unless it is already queued or the queue is full.
    pub fn push(&self, task: &str) -> PushOutcome {
        let mut items = self.items.lock();
        if items.iter().any(|t| t == task) {
            return PushOutcome::Duplicate;
        }
        let len = items.len();
        if len >= self.capacity {
            error!(
                queue = self.name,
                "task count >= {}, can't append task anymore", self.capacity
            );
            return PushOutcome::Rejected;
        }
        if len > self.capacity / 2 {
            warn!(queue = self.name, "task count > {}", self.capacity / 2);
        }
        items.push(task.to_string());
        PushOutcome::Added
    }

    /// Pop a batch off the head for one worker.
    ///
    /// The batch size scales down under load so no single worker runs
    /// away with the queue, while short bursts drain in one grab. A
    /// non-empty queue always yields a non-empty batch.
    pub fn take_batch(&self, worker_count: usize) -> Vec<String> {
        let mut items = self.items.lock();
        let len = items.len();
        if len == 0 {
            return Vec::new();
        }
        debug!(queue = self.name, "task count={}", len);
        let size = if len > 100 {
            (len / worker_count.max(1)).max(1)
        } else if len >= 50 {
            15
        } else if len >= 9 {
            8
        } else {
            len
        };
        items.drain(..size.min(len)).collect()
    }

    /// Atomically pop and return the entire contents.
    pub fn take_all(&self) -> Vec<String> {
        std::mem::take(&mut *self.items.lock())
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Copy of the queued tasks, head first. For status reporting.
    pub fn snapshot(&self) -> Vec<String> {
        self.items.lock().clone()
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
