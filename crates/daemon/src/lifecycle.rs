// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon-side lifecycle: PID file, signal handlers, and the control
//! loop translating signals and bus requests into component actions.
//!
//! Signal numbers are the compatibility contract: TERM stops, 10
//! pauses, 12 resumes, 30 reloads, 31 prints status.

use std::fs::File;
use std::io;
use std::io::Write as _;
use std::sync::Arc;

use fs2::FileExt;
use fsync_config::{ConfigStore, Paths};
use fsync_core::bus::{topics, MessageBus, Reply, Signal, Subscriber};
use thiserror::Error;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::loops::ControlHandle;
use crate::status::StatusReport;
use crate::sync::SyncPool;
use crate::watcher::Watcher;

/// Raw signal numbers for the non-termination commands.
const SIG_PAUSE: i32 = 10;
const SIG_RESUME: i32 = 12;
const SIG_RELOAD: i32 = 30;
const SIG_STATUS: i32 = 31;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Stop,
    Pause,
    Resume,
    Reload,
    Status,
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("failed to acquire pid lock: daemon already running?")]
    AlreadyRunning(#[source] io::Error),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Take the exclusive PID-file lock and record our PID in it.
///
/// The lock, not the file contents, is what makes a second daemon back
/// off: a stale file from a dead process carries no lock.
pub fn acquire_pid_file(paths: &Paths) -> Result<File, LifecycleError> {
    // Do not truncate before holding the lock; the file may belong to a
    // running daemon.
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(paths.pid_file())?;
    file.try_lock_exclusive().map_err(LifecycleError::AlreadyRunning)?;
    file.set_len(0)?;
    write!(file, "{}", std::process::id())?;
    Ok(file)
}

/// Spawn one forwarding task per bound signal.
pub fn spawn_signal_listeners(
    tx: &mpsc::UnboundedSender<ControlAction>,
) -> io::Result<()> {
    let pairs = [
        (SignalKind::terminate(), ControlAction::Stop),
        (SignalKind::from_raw(SIG_PAUSE), ControlAction::Pause),
        (SignalKind::from_raw(SIG_RESUME), ControlAction::Resume),
        (SignalKind::from_raw(SIG_RELOAD), ControlAction::Reload),
        (SignalKind::from_raw(SIG_STATUS), ControlAction::Status),
    ];
    for (kind, action) in pairs {
        let mut stream = signal(kind)?;
        let tx = tx.clone();
        tokio::spawn(async move {
            while stream.recv().await.is_some() {
                if tx.send(action).is_err() {
                    break;
                }
            }
        });
    }
    Ok(())
}

/// The assembled daemon, driven by [`Daemon::run`].
pub struct Daemon {
    pub paths: Paths,
    pub bus: Arc<MessageBus>,
    pub config: Arc<ConfigStore>,
    pub pool: Arc<SyncPool>,
    pub watcher: Arc<Watcher>,
    pub handle: ControlHandle,
}

impl Daemon {
    /// Bind the unicast topics the monitor drives reload/stop through.
    pub fn bind_control_topics(&self, tx: &mpsc::UnboundedSender<ControlAction>) {
        let reload_tx = tx.clone();
        self.bus.bind(topics::RELOAD_REQUEST, move || {
            let _ = reload_tx.send(ControlAction::Reload);
            Reply::Ack
        });
        let stop_tx = tx.clone();
        self.bus.bind(topics::STOP_REQUEST, move || {
            let _ = stop_tx.send(ControlAction::Stop);
            Reply::Ack
        });
    }

    /// Register the lifecycle broadcast subscribers.
    pub fn register_subscribers(&self) {
        let handle = self.handle.clone();
        self.bus.register(
            topics::SIGNAL,
            Subscriber::new("scheduler", move |signal| {
                match signal {
                    Signal::Pause => handle.pause(),
                    Signal::Resume => handle.resume(),
                    Signal::Stop => handle.stop(),
                    _ => {}
                }
                Ok(())
            }),
        );

        let pool = Arc::clone(&self.pool);
        let watcher = Arc::clone(&self.watcher);
        let config = Arc::clone(&self.config);
        let status_path = self.paths.status_flag();
        self.bus.register(
            topics::SIGNAL,
            Subscriber::new("status", move |signal| {
                if *signal != Signal::Status {
                    return Ok(());
                }
                let text = StatusReport::gather(&pool, watcher.pid(), &config).render();
                info!("\n{}", text);
                std::fs::write(&status_path, &text).map_err(|e| e.to_string())?;
                Ok(())
            }),
        );
    }

    /// Dispatch control actions until a stop arrives.
    pub async fn run(&self, rx: &mut mpsc::UnboundedReceiver<ControlAction>) {
        while let Some(action) = rx.recv().await {
            match action {
                ControlAction::Pause => {
                    if self.handle.is_paused() {
                        info!("filesync already paused");
                    } else {
                        info!("pause filesync");
                        self.bus.notify(topics::SIGNAL, Signal::Pause);
                    }
                }
                ControlAction::Resume => {
                    info!("resume filesync");
                    self.bus.notify(topics::SIGNAL, Signal::Resume);
                }
                ControlAction::Status => {
                    info!("print filesync status");
                    self.bus.notify(topics::SIGNAL, Signal::Status);
                }
                ControlAction::Reload => self.reload().await,
                ControlAction::Stop => {
                    self.shutdown().await;
                    break;
                }
            }
        }
    }

    /// Rotate configuration generations and respawn the watcher.
    ///
    /// The watcher restarts even when the config reload fails: a
    /// heartbeat-driven reload must still revive a dead subprocess.
    async fn reload(&self) {
        info!("reload filesync start");
        self.bus.notify(topics::SIGNAL, Signal::Reload);
        if let Err(e) = self.config.reload() {
            warn!("config reload failed: {}", e);
        }
        if let Err(e) = self.watcher.reload().await {
            error!("watcher reload failed: {}", e);
        }
        // Clear the legacy touchpoint left by the CLI.
        let _ = std::fs::remove_file(self.paths.reload_flag());
    }

    /// Cooperative stop: loops exit at their next flag check, the
    /// watcher dies now, queued tasks are dropped.
    async fn shutdown(&self) {
        info!("stop filesync");
        self.bus.notify(topics::SIGNAL, Signal::Stop);
        self.watcher.stop().await;
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
