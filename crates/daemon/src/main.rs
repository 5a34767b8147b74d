// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fsyncd: the filesync daemon process.
//!
//! Normally started detached by `filesync start` from the deployment
//! directory (the one holding `env.ini` and `filesync.ini`). Exit
//! codes: 2 when the environment fails to initialize, 3 when a
//! component fails to initialize, 0 on a clean stop.

mod lifecycle;
mod logging;
mod loops;
mod master;
mod monitor;
mod prober;
mod rotate;
mod status;
mod sync;
#[cfg(test)]
mod test_util;
mod watcher;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use fsync_config::{ConfigStore, EnvConfig, Paths};
use fsync_core::bus::{topics, MessageBus, Signal};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::lifecycle::Daemon;
use crate::loops::spawn_periodic;
use crate::master::Master;
use crate::monitor::Monitor;
use crate::prober::Prober;
use crate::rotate::Rotator;
use crate::sync::SyncPool;
use crate::watcher::Watcher;

const EXIT_ENV: u8 = 2;
const EXIT_COMPONENT: u8 = 3;

#[tokio::main]
async fn main() -> ExitCode {
    // Environment first; there is no logger yet, so failures go to
    // stderr for the CLI to relay.
    let base = match std::env::current_dir() {
        Ok(base) => base,
        Err(e) => {
            eprintln!("fsyncd: cannot determine working directory: {e}");
            return ExitCode::from(EXIT_ENV);
        }
    };
    let paths = Paths::new(&base);
    let env = match EnvConfig::load(&paths.env_ini(), &base) {
        Ok(env) => Arc::new(env),
        Err(e) => {
            eprintln!("fsyncd: environment init failed: {e}");
            return ExitCode::from(EXIT_ENV);
        }
    };
    if let Err(e) = paths.ensure_run_dir() {
        eprintln!("fsyncd: cannot create run directory: {e}");
        return ExitCode::from(EXIT_ENV);
    }

    // Logger
    let log = match logging::init(&env.log_file, &env.log_level) {
        Ok(log) => Arc::new(log),
        Err(e) => {
            eprintln!("fsyncd: logger init failed: {e}");
            return ExitCode::from(EXIT_COMPONENT);
        }
    };
    info!("< Init FileSync >");
    info!("log level: {}", log.current());

    let pid_file = match lifecycle::acquire_pid_file(&paths) {
        Ok(file) => file,
        Err(e) => {
            error!("{}", e);
            eprintln!("fsyncd: {e}");
            return ExitCode::from(EXIT_COMPONENT);
        }
    };

    let (handle, controls) = loops::new_controls();

    // LogRotator
    let rotator = Arc::new(Rotator::new(&env));
    spawn_periodic(
        "log-rotator",
        Duration::from_secs(env.log_trunc_period),
        controls.clone(),
        move || {
            let rotator = Arc::clone(&rotator);
            async move { rotator.tick().await }
        },
    );

    // ConfigStore
    let config = Arc::new(ConfigStore::new(paths.conf_ini()));
    if let Err(e) = config.init() {
        error!("config init failed: {}", e);
        return ExitCode::from(EXIT_COMPONENT);
    }
    let sync_period = match config.global_u64("sync_period") {
        Ok(period) => period.max(1),
        Err(e) => {
            error!("config init failed: {}", e);
            return ExitCode::from(EXIT_COMPONENT);
        }
    };
    let fullsync_period = match config.global_f64("fullsync_period") {
        Ok(period) => period,
        Err(e) => {
            error!("config init failed: {}", e);
            return ExitCode::from(EXIT_COMPONENT);
        }
    };
    let retry_period = config.global_u64_or("retry_period", 60);
    let check_period = config.global_u64_or("check_period", 60);

    let bus = Arc::new(MessageBus::new());

    // Watcher
    let watcher = Watcher::new(Arc::clone(&env), Arc::clone(&config), paths.clone());
    watcher.register(&bus);
    if let Err(e) = watcher.start().await {
        error!("watcher init failed: {}", e);
        return ExitCode::from(EXIT_COMPONENT);
    }

    // Master: queues, dispatcher, workers, retry, full sync, prober
    let pool = match SyncPool::new(Arc::clone(&env), Arc::clone(&config)) {
        Ok(pool) => pool,
        Err(e) => {
            error!("master init failed: {}", e);
            watcher.stop().await;
            return ExitCode::from(EXIT_COMPONENT);
        }
    };
    info!("starting {} sync workers", pool.worker_count());
    let master = Master::new(Arc::clone(&bus), Arc::clone(&config), Arc::clone(&pool.tasks));
    spawn_periodic(
        "master",
        Duration::from_secs(sync_period),
        controls.clone(),
        move || {
            let master = Arc::clone(&master);
            async move { master.drain() }
        },
    );
    pool.spawn(
        &controls,
        Duration::from_secs(retry_period),
        Duration::from_secs_f64(fullsync_period),
    );
    let prober = Prober::new(
        Arc::clone(&env),
        Arc::clone(&config),
        paths.clone(),
        pool.live_ips.clone(),
        Arc::clone(&pool.ready),
    );
    spawn_periodic(
        "prober",
        Duration::from_secs(check_period),
        controls.clone(),
        move || {
            let prober = Arc::clone(&prober);
            async move { prober.tick().await }
        },
    );

    // Monitor
    let monitor = Monitor::new(
        paths.env_ini(),
        Arc::clone(&config),
        pool.live_ips.clone(),
        Arc::clone(&bus),
        Arc::clone(&log),
    );
    spawn_periodic("monitor", monitor::PERIOD, controls.clone(), move || {
        let monitor = Arc::clone(&monitor);
        async move { monitor.tick() }
    });

    // Lifecycle controller
    let daemon = Daemon {
        paths: paths.clone(),
        bus: Arc::clone(&bus),
        config,
        pool,
        watcher,
        handle,
    };
    let (tx, mut rx) = mpsc::unbounded_channel();
    daemon.bind_control_topics(&tx);
    daemon.register_subscribers();
    if let Err(e) = lifecycle::spawn_signal_listeners(&tx) {
        error!("signal init failed: {}", e);
        return ExitCode::from(EXIT_COMPONENT);
    }

    info!("filesync pid: {}", std::process::id());
    bus.notify(topics::SIGNAL, Signal::Start);

    daemon.run(&mut rx).await;

    // Clean exit: release the lock, then remove the PID file.
    drop(pid_file);
    let _ = std::fs::remove_file(paths.pid_file());
    info!("filesync exited");
    ExitCode::SUCCESS
}
