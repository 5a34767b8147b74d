// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status text block, written to `run/status.flag` on request.

use fsync_config::ConfigStore;

use crate::sync::SyncPool;

pub struct StatusReport {
    pub daemon_pid: u32,
    pub watcher_pid: u32,
    pub syncing: Vec<String>,
    pub waiting: Vec<String>,
    pub retry: Vec<String>,
    pub alive_ips: Vec<String>,
    pub missing: Vec<String>,
}

impl StatusReport {
    pub fn gather(pool: &SyncPool, watcher_pid: u32, config: &ConfigStore) -> Self {
        Self {
            daemon_pid: std::process::id(),
            watcher_pid,
            syncing: pool.in_flight.snapshot(),
            waiting: pool.tasks.snapshot(),
            retry: pool.retries.snapshot(),
            alive_ips: pool.live_ips.snapshot(),
            missing: config.missing_listens(),
        }
    }

    pub fn render(&self) -> String {
        format!(
            "[PIDS]\n\
             \x20daemon pid: {}\n\
             watcher pid: {}\n\
             \n\
             [TASK-COUNT]\n\
             syncing: {}\n\
             waiting: {}\n\
             \x20\x20retry: {}\n\
             \n\
             [TASK-LIST]\n\
             syncing:{}\n\
             \x20\x20retry:{}\n\
             \n\
             [OTHERS]\n\
             \x20\x20\x20alive-ip: {}\n\
             missing-path: {}\n",
            self.daemon_pid,
            self.watcher_pid,
            self.syncing.len(),
            self.waiting.len(),
            self.retry.len(),
            task_list(&self.syncing),
            task_list(&self.retry),
            self.alive_ips.join(", "),
            self.missing.join(", "),
        )
    }
}

fn task_list(tasks: &[String]) -> String {
    if tasks.is_empty() {
        return String::new();
    }
    let mut out = String::new();
    for task in tasks {
        out.push_str("\n\t");
        out.push_str(task);
    }
    out
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
