// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Change-watcher adapter.
//!
//! Supervises the external inotify-class watcher subprocess. The
//! watcher is started with a listen-root list file and a set of `-e`
//! event flags, and prints one `EVENT PATH` line per observed change; a
//! reader task appends those lines to the shared [`EventBuffer`].
//!
//! Bus contract: the event-fetch topic returns the live buffer (the
//! master pops from it in place) and the heartbeat topic reports
//! subprocess liveness. When the subprocess dies, liveness flips false
//! and the monitor issues a reload, which respawns it.

use std::io;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use fsync_config::{ConfigError, ConfigStore, EnvConfig, Generation, Paths};
use fsync_core::bus::{topics, MessageBus, Reply};
use fsync_core::EventBuffer;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{info, warn};

/// `(GLOBAL key, watcher -e argument)` pairs, in flag order.
const EVENT_FLAGS: [(&str, &str); 7] = [
    ("event_delete", "delete"),
    ("event_create", "create"),
    ("event_closewrite", "close_write"),
    ("event_move", "move"),
    ("event_movedto", "moved_to"),
    ("event_movedfrom", "moved_from"),
    ("event_attrib", "attrib"),
];

#[derive(Debug, Error)]
pub enum WatcherError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to spawn {tool}: {source}")]
    Spawn { tool: String, source: io::Error },

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub struct Watcher {
    env: Arc<EnvConfig>,
    config: Arc<ConfigStore>,
    paths: Paths,
    buffer: EventBuffer,
    alive: Arc<AtomicBool>,
    pid: Arc<AtomicU32>,
    child: tokio::sync::Mutex<Option<Child>>,
}

impl Watcher {
    pub fn new(env: Arc<EnvConfig>, config: Arc<ConfigStore>, paths: Paths) -> Arc<Self> {
        Arc::new(Self {
            env,
            config,
            paths,
            buffer: EventBuffer::new(),
            alive: Arc::new(AtomicBool::new(false)),
            pid: Arc::new(AtomicU32::new(0)),
            child: tokio::sync::Mutex::new(None),
        })
    }

    /// Bind the event-fetch and heartbeat topics.
    pub fn register(self: &Arc<Self>, bus: &MessageBus) {
        let buffer = self.buffer.clone();
        bus.bind(topics::EVENT_FETCH, move || Reply::Events(buffer.clone()));
        let watcher = Arc::clone(self);
        bus.bind(topics::WATCHER_HEARTBEAT, move || Reply::Alive(watcher.is_alive()));
    }

    /// Spawn the watcher subprocess and its stdout reader.
    pub async fn start(&self) -> Result<(), WatcherError> {
        let flags = self.event_flags()?;
        self.write_listen_file()?;

        let tool = self.env.inotify_tool.display().to_string();
        let mut child = Command::new(&self.env.inotify_tool)
            .arg("-rmq")
            .args(["--format", "%e %w%f"])
            .args(&flags)
            .arg("--fromfile")
            .arg(self.paths.listen_file())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| WatcherError::Spawn { tool: tool.clone(), source })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            io::Error::new(io::ErrorKind::Other, "watcher stdout not captured")
        })?;
        let pid = child.id().unwrap_or(0);
        self.pid.store(pid, Ordering::SeqCst);
        self.alive.store(true, Ordering::SeqCst);
        info!("start {} -rmq --format '%e %w%f' {} --fromfile {}", tool, flags.join(" "),
            self.paths.listen_file().display());
        info!("watcher pid: {}", pid);

        let buffer = self.buffer.clone();
        let alive = Arc::clone(&self.alive);
        let watcher_pid = Arc::clone(&self.pid);
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let line = line.trim();
                if !line.is_empty() {
                    buffer.push(line);
                }
            }
            // Stream closed: the subprocess exited or was killed.
            alive.store(false, Ordering::SeqCst);
            watcher_pid.store(0, Ordering::SeqCst);
            warn!("watcher stdout closed, heartbeat will fail");
        });

        *self.child.lock().await = Some(child);
        Ok(())
    }

    /// Kill the subprocess and reap it.
    pub async fn stop(&self) {
        let taken = self.child.lock().await.take();
        if let Some(mut child) = taken {
            if let Some(pid) = child.id() {
                info!("watcher ({}) exit", pid);
            }
            if let Err(e) = child.start_kill() {
                warn!("could not kill watcher: {}", e);
            }
            let _ = child.wait().await;
        }
        self.alive.store(false, Ordering::SeqCst);
        self.pid.store(0, Ordering::SeqCst);
    }

    /// Stop, re-derive flags and listen list, and start again.
    pub async fn reload(&self) -> Result<(), WatcherError> {
        self.stop().await;
        self.start().await
    }

    pub fn pid(&self) -> u32 {
        self.pid.load(Ordering::SeqCst)
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Write one listen root per line for `--fromfile`.
    fn write_listen_file(&self) -> Result<(), WatcherError> {
        let roots = self.config.listen_paths(Generation::Current);
        if roots.is_empty() {
            return Err(ConfigError::Invalid("watcher listen path is NULL".to_string()).into());
        }
        info!("watcher listen paths: {}", roots.join(", "));
        let mut contents = roots.join("\n");
        contents.push('\n');
        std::fs::write(self.paths.listen_file(), contents)?;
        Ok(())
    }

    /// Compose `-e NAME` arguments from the GLOBAL event booleans.
    fn event_flags(&self) -> Result<Vec<String>, ConfigError> {
        let mut flags = Vec::new();
        for (key, name) in EVENT_FLAGS {
            if self.config.global_bool(key) {
                flags.push("-e".to_string());
                flags.push(name.to_string());
            }
        }
        if flags.is_empty() {
            return Err(ConfigError::Invalid("ALL event type is false".to_string()));
        }
        Ok(flags)
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
