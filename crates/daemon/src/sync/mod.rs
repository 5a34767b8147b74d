// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker pool: drains the task queue and replicates each task to its
//! remote destinations via the transfer subprocess.
//!
//! One shared processing path serves three callers: the worker tasks
//! (failures go to the retry queue), the retry loop (worker id `Retry`,
//! failures terminal) and the full-sync loop (worker id `Full`,
//! failures terminal). Retries never re-enter the retry queue, which
//! bounds retry amplification.

mod command;

pub use command::{transfer_command, ListenOptions};

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use fsync_config::{ConfigError, ConfigStore, EnvConfig, Generation};
use fsync_core::{DedupQueue, InFlightSet, IpSet};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::loops::{spawn_periodic, Controls};

/// Interval between a worker's queue polls.
const WORKER_PERIOD: Duration = Duration::from_secs(1);

pub struct SyncPool {
    env: Arc<EnvConfig>,
    config: Arc<ConfigStore>,
    pub tasks: Arc<DedupQueue>,
    pub retries: Arc<DedupQueue>,
    pub in_flight: InFlightSet,
    pub live_ips: IpSet,
    /// Set once the first reachability probe completed; full sync waits
    /// on it so fresh destinations are not mistaken for dead ones.
    pub ready: Arc<AtomicBool>,
    worker_count: usize,
}

impl SyncPool {
    pub fn new(env: Arc<EnvConfig>, config: Arc<ConfigStore>) -> Result<Arc<Self>, ConfigError> {
        let worker_count = config.global_u64("thread_count")? as usize;
        if !(1..=100).contains(&worker_count) {
            return Err(ConfigError::Invalid(format!(
                "thread_count is invalid:{worker_count}"
            )));
        }
        let task_capacity = config.global_u64("sync_queue_size")? as usize;
        let retry_capacity = config.global_u64("fail_queue_size")? as usize;
        Ok(Arc::new(Self {
            env,
            config,
            tasks: Arc::new(DedupQueue::new("task", task_capacity)),
            retries: Arc::new(DedupQueue::new("retry", retry_capacity)),
            in_flight: InFlightSet::new(),
            live_ips: IpSet::new(),
            ready: Arc::new(AtomicBool::new(false)),
            worker_count,
        }))
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Spawn the worker tasks plus the retry and full-sync loops.
    pub fn spawn(self: &Arc<Self>, controls: &Controls, retry_period: Duration, fullsync_period: Duration) {
        for i in 0..self.worker_count {
            let pool = Arc::clone(self);
            spawn_periodic(format!("worker-{i}"), WORKER_PERIOD, controls.clone(), move || {
                let pool = Arc::clone(&pool);
                async move { pool.worker_tick(&format!("thread{i}")).await }
            });
        }

        let pool = Arc::clone(self);
        spawn_periodic("retry", retry_period, controls.clone(), move || {
            let pool = Arc::clone(&pool);
            async move { pool.retry_tick().await }
        });

        let pool = Arc::clone(self);
        let fullsync_controls = controls.clone();
        spawn_periodic("full-sync", fullsync_period, controls.clone(), move || {
            let pool = Arc::clone(&pool);
            let controls = fullsync_controls.clone();
            async move { pool.full_sync_tick(&controls).await }
        });
    }

    async fn worker_tick(&self, worker: &str) {
        let batch = self.tasks.take_batch(self.worker_count);
        if batch.is_empty() {
            return;
        }
        info!(worker, "got {} tasks:\n{}", batch.len(), batch.join("\n"));
        self.process(worker, batch, false).await;
    }

    /// Retry-queue drain. Failures here are terminal.
    pub async fn retry_tick(&self) {
        let batch = self.retries.take_all();
        if batch.is_empty() {
            return;
        }
        info!("retrying {} failed tasks", batch.len());
        self.process("Retry", batch, true).await;
    }

    /// Enqueue every full-sync listen root as a synthetic task.
    pub async fn full_sync_tick(&self, controls: &Controls) {
        self.wait_ready(controls).await;
        if controls.is_stopped() {
            return;
        }
        let batch: Vec<String> = self
            .config
            .listen_paths(Generation::Current)
            .into_iter()
            .filter(|listen| {
                self.config.get_in("full_sync", listen, Generation::Current).as_deref()
                    == Some("true")
            })
            .collect();
        if batch.is_empty() {
            return;
        }
        info!("full sync of {} listen paths", batch.len());
        self.process("Full", batch, true).await;
    }

    /// Block until the first reachability probe completed.
    async fn wait_ready(&self, controls: &Controls) {
        while !self.ready.load(Ordering::SeqCst) {
            if !controls.sleep(Duration::from_secs(1)).await {
                return;
            }
        }
    }

    /// Process a batch serially, deferring in-flight collisions to a
    /// second pass and dropping tasks that still collide there.
    pub async fn process(&self, worker: &str, batch: Vec<String>, is_retry: bool) {
        let mut collisions = Vec::new();
        for task in batch {
            if self.in_flight.begin(&task) {
                self.sync_one(worker, &task, is_retry).await;
                self.in_flight.finish(&task);
            } else {
                debug!(worker, "{} crash syncing", task);
                collisions.push(task);
            }
        }
        for task in collisions {
            if self.in_flight.begin(&task) {
                self.sync_one(worker, &task, is_retry).await;
                self.in_flight.finish(&task);
            } else {
                debug!(worker, "{} syncing still, ignored", task);
            }
        }
    }

    /// Resolve, compose and execute the transfers for one task.
    async fn sync_one(&self, worker: &str, task: &str, is_retry: bool) {
        let Some((root, generation)) = self.resolve_root(task) else {
            error!(worker, "{} not in config ini, ignore", task);
            return;
        };
        if generation == Generation::Previous {
            warn!(worker, "{} in last config section {}", task, root);
        }
        // Temp files often vanish between the event and the transfer.
        if !Path::new(task).exists() {
            warn!(worker, "{} is not exist, ignore", task);
            return;
        }

        let options = ListenOptions::load(&self.config, &root, generation);
        for ip in &options.remote_ips {
            if !self.live_ips.contains(ip) {
                warn!(worker, "{} is unavailable IP, ignore {}", ip, task);
                continue;
            }
            let cmd = transfer_command(&self.env.rsync_tool, &self.env.rsync_user, task, ip, &options);
            debug!(worker, "exec: {}", cmd);
            let started = Instant::now();
            let (code, stderr) = run_shell(&cmd).await;
            let cost = started.elapsed().as_secs_f64();
            if code == 0 {
                info!(worker, "sync success {}, To {}, cost time {:.3}s", task, ip, cost);
            } else if is_retry {
                error!(
                    worker,
                    "sync failed {}, To {}, cost time {:.3}s (ret:{} err:{})",
                    task, ip, cost, code, stderr
                );
            } else {
                warn!(
                    worker,
                    "sync failed {}, To {}, cost time {:.3}s (ret:{} err:{}), will retry",
                    task, ip, cost, code, stderr
                );
                self.retries.push(task);
            }
        }
    }

    /// Owning listen root by longest-prefix match, `current` first,
    /// then `previous` so in-flight work survives one reload.
    fn resolve_root(&self, task: &str) -> Option<(String, Generation)> {
        for generation in [Generation::Current, Generation::Previous] {
            let owner = self
                .config
                .listen_paths(generation)
                .into_iter()
                .filter(|root| task == root.as_str() || Path::new(task).starts_with(root))
                .max_by_key(String::len);
            if let Some(root) = owner {
                return Some((root, generation));
            }
        }
        None
    }
}

/// Run a composed command through the shell, returning the exit code
/// and trimmed stderr. Spawn failures map to exit code -1.
async fn run_shell(cmd: &str) -> (i32, String) {
    match Command::new("sh").arg("-c").arg(cmd).output().await {
        Ok(output) => (
            output.status.code().unwrap_or(-1),
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ),
        Err(e) => (-1, e.to_string()),
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
