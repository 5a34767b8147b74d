// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic task scaffolding.
//!
//! Every periodic component runs as one tokio task: run the body, sleep
//! the period, repeat. Each loop respects two shared flags: a pause
//! flag (set means wait before the next tick) and a run flag (cancelled
//! means exit). Sleeps themselves are not interrupted by pause, only by
//! stop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Owner side of the loop flags, held by the lifecycle controller.
#[derive(Clone)]
pub struct ControlHandle {
    run: CancellationToken,
    pause_tx: Arc<watch::Sender<bool>>,
}

/// Loop side of the flags. Cloned into every periodic task.
#[derive(Clone)]
pub struct Controls {
    run: CancellationToken,
    pause_rx: watch::Receiver<bool>,
}

pub fn new_controls() -> (ControlHandle, Controls) {
    let run = CancellationToken::new();
    let (pause_tx, pause_rx) = watch::channel(false);
    (
        ControlHandle { run: run.clone(), pause_tx: Arc::new(pause_tx) },
        Controls { run, pause_rx },
    )
}

impl ControlHandle {
    pub fn pause(&self) {
        let _ = self.pause_tx.send(true);
    }

    pub fn resume(&self) {
        let _ = self.pause_tx.send(false);
    }

    pub fn stop(&self) {
        // Paused loops must wake to observe the run flag.
        self.run.cancel();
        let _ = self.pause_tx.send(false);
    }

    pub fn is_paused(&self) -> bool {
        *self.pause_tx.borrow()
    }
}

impl Controls {
    pub fn is_stopped(&self) -> bool {
        self.run.is_cancelled()
    }

    /// Block while the pause flag is set; returns promptly on stop.
    pub async fn wait_if_paused(&self) {
        let mut pause_rx = self.pause_rx.clone();
        while *pause_rx.borrow() {
            tokio::select! {
                changed = pause_rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                () = self.run.cancelled() => return,
            }
        }
    }

    /// Sleep one period; false means the run flag was cleared.
    pub async fn sleep(&self, period: Duration) -> bool {
        tokio::select! {
            () = tokio::time::sleep(period) => true,
            () = self.run.cancelled() => false,
        }
    }
}

/// Spawn a run-body-then-sleep loop honoring the shared flags.
pub fn spawn_periodic<F, Fut>(
    name: impl Into<String>,
    period: Duration,
    controls: Controls,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let name = name.into();
    tokio::spawn(async move {
        debug!(task = %name, "periodic task started");
        loop {
            controls.wait_if_paused().await;
            if controls.is_stopped() {
                break;
            }
            tick().await;
            if !controls.sleep(period).await {
                break;
            }
        }
        debug!(task = %name, "periodic task stopped");
    })
}

#[cfg(test)]
#[path = "loops_tests.rs"]
mod tests;
