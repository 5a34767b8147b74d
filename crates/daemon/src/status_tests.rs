// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use tempfile::TempDir;

use super::*;
use crate::test_util::{env_fixture, ConfBuilder};

fn report() -> StatusReport {
    StatusReport {
        daemon_pid: 1234,
        watcher_pid: 5678,
        syncing: vec!["/data/a".to_string()],
        waiting: vec!["/data/b".to_string(), "/data/c".to_string()],
        retry: vec![],
        alive_ips: vec!["10.0.0.2".to_string(), "10.0.0.3".to_string()],
        missing: vec!["/gone".to_string()],
    }
}

#[test]
fn render_contains_pids_counts_and_lists() {
    let text = report().render();
    assert!(text.contains(" daemon pid: 1234"));
    assert!(text.contains("watcher pid: 5678"));
    assert!(text.contains("syncing: 1"));
    assert!(text.contains("waiting: 2"));
    assert!(text.contains("  retry: 0"));
    assert!(text.contains("\n\t/data/a"));
    assert!(text.contains("   alive-ip: 10.0.0.2, 10.0.0.3"));
    assert!(text.contains("missing-path: /gone"));
}

#[test]
fn empty_lists_render_without_entries() {
    let mut status = report();
    status.syncing.clear();
    let text = status.render();
    assert!(text.contains("syncing:\n"));
}

#[test]
fn gather_reflects_pool_and_config_state() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("data");
    let config = ConfBuilder::new().listen(&root).store(dir.path());
    let pool =
        crate::sync::SyncPool::new(env_fixture(dir.path()), Arc::clone(&config)).unwrap();
    pool.tasks.push("/data/wait");
    pool.retries.push("/data/retry");
    pool.in_flight.begin("/data/busy");
    pool.live_ips.insert("10.0.0.2");

    let status = StatusReport::gather(&pool, 42, &config);

    assert_eq!(status.daemon_pid, std::process::id());
    assert_eq!(status.watcher_pid, 42);
    assert_eq!(status.syncing, vec!["/data/busy".to_string()]);
    assert_eq!(status.waiting, vec!["/data/wait".to_string()]);
    assert_eq!(status.retry, vec!["/data/retry".to_string()]);
    assert_eq!(status.alive_ips, vec!["10.0.0.2".to_string()]);
    assert!(status.missing.is_empty());
}
