// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Master dispatcher: raw watcher events → deduplicated sync tasks.
//!
//! Runs on a `sync_period` timer. Each tick drains the event buffer to
//! empty; a path that is neither a configured single-file listen nor an
//! existing directory is promoted to its parent directory, collapsing
//! bursts of per-file events inside an unwatched subtree into one
//! directory-level task. The task queue rejects duplicates, which
//! dedups the rest of the burst.

use std::path::Path;
use std::sync::Arc;

use fsync_config::ConfigStore;
use fsync_core::bus::{topics, MessageBus, Reply};
use fsync_core::DedupQueue;
use tracing::{debug, warn};

pub struct Master {
    bus: Arc<MessageBus>,
    config: Arc<ConfigStore>,
    tasks: Arc<DedupQueue>,
}

impl Master {
    pub fn new(bus: Arc<MessageBus>, config: Arc<ConfigStore>, tasks: Arc<DedupQueue>) -> Arc<Self> {
        Arc::new(Self { bus, config, tasks })
    }

    /// Drain the event buffer to empty, pushing one task per event.
    pub fn drain(&self) {
        let events = match self.bus.send(topics::EVENT_FETCH) {
            Ok(Reply::Events(events)) => events,
            _ => {
                warn!("event buffer not available, skipping dispatch tick");
                return;
            }
        };

        while let Some(line) = events.pop() {
            let Some((event, path)) = line.split_once(char::is_whitespace) else {
                debug!("discarding malformed watcher line: {}", line);
                continue;
            };
            debug!("get watcher event: {} {}", event, path);
            let task = self.normalize(path);
            self.tasks.push(&task);
        }
    }

    /// Promote unwatchable paths to their parent directory.
    fn normalize(&self, path: &str) -> String {
        if self.config.is_listen_file(path) || Path::new(path).is_dir() {
            return path.to_string();
        }
        match Path::new(path).parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.display().to_string(),
            _ => path.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "master_tests.rs"]
mod tests;
