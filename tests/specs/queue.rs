// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task-queue behavior under the dispatcher/worker interplay.

use fsync_core::{DedupQueue, PushOutcome};

#[test]
fn repeated_events_for_one_path_cost_one_slot() {
    let queue = DedupQueue::new("task", 100);
    for _ in 0..10 {
        queue.push("/data");
    }
    assert_eq!(queue.len(), 1);
}

#[test]
fn length_is_bounded_by_capacity_under_pressure() {
    let queue = DedupQueue::new("task", 50);
    for i in 0..500 {
        queue.push(&format!("/data/burst{i}"));
    }
    assert_eq!(queue.len(), 50);
}

#[test]
fn workers_drain_a_large_backlog_in_even_shares() {
    let worker_count = 4;
    let queue = DedupQueue::new("task", 10_000);
    for i in 0..120 {
        assert_eq!(queue.push(&format!("/data/{i}")), PushOutcome::Added);
    }

    // First grab: 120/4; the rest shrinks through the banded sizes.
    assert_eq!(queue.take_batch(worker_count).len(), 30);
    assert_eq!(queue.len(), 90);
    assert_eq!(queue.take_batch(worker_count).len(), 15);
    assert_eq!(queue.take_batch(worker_count).len(), 15);
    assert_eq!(queue.take_batch(worker_count).len(), 15);
    assert_eq!(queue.take_batch(worker_count).len(), 8);

    // Drain the tail; every batch from a non-empty queue is non-empty.
    let mut drained = 0;
    while !queue.is_empty() {
        let batch = queue.take_batch(worker_count);
        assert!(!batch.is_empty());
        drained += batch.len();
    }
    assert_eq!(drained, 120 - 30 - 45 - 8);
}

#[test]
fn a_drained_task_can_be_enqueued_again() {
    let queue = DedupQueue::new("task", 10);
    queue.push("/data");
    let batch = queue.take_batch(2);
    assert_eq!(batch, vec!["/data".to_string()]);
    // Same path after the transfer completed: new event, new task.
    assert_eq!(queue.push("/data"), PushOutcome::Added);
}

#[test]
fn retry_queue_hands_everything_to_the_retry_worker() {
    let retries = DedupQueue::new("retry", 100);
    retries.push("/data/a");
    retries.push("/data/b");
    retries.push("/data/a");

    let all = retries.take_all();
    assert_eq!(all, vec!["/data/a".to_string(), "/data/b".to_string()]);
    assert!(retries.is_empty());
}
