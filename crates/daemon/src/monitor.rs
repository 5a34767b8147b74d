// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Housekeeping monitor.
//!
//! Every tick: pick up live `log_level` edits, watch for sustained
//! loss of every remote destination (stop request), for missing listen
//! roots that reappeared (reload request), and for a dead watcher
//! subprocess (reload request after two consecutive heartbeat
//! failures).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use fsync_config::{ConfigStore, EnvConfig};
use fsync_core::bus::{topics, MessageBus, Reply};
use fsync_core::IpSet;
use tracing::{error, info, warn};

use crate::logging::LogControl;

pub const PERIOD: std::time::Duration = std::time::Duration::from_secs(2);

/// Ticks of continuous live-IP emptiness before the daemon gives up.
const IP_NULL_LIMIT: u32 = 30;
/// Consecutive heartbeat failures before the watcher is respawned.
const HB_FAIL_LIMIT: u32 = 2;

pub struct Monitor {
    env_ini: PathBuf,
    config: Arc<ConfigStore>,
    live_ips: IpSet,
    bus: Arc<MessageBus>,
    log: Arc<LogControl>,
    ip_null_count: AtomicU32,
    hb_fail_count: AtomicU32,
}

impl Monitor {
    pub fn new(
        env_ini: PathBuf,
        config: Arc<ConfigStore>,
        live_ips: IpSet,
        bus: Arc<MessageBus>,
        log: Arc<LogControl>,
    ) -> Arc<Self> {
        Arc::new(Self {
            env_ini,
            config,
            live_ips,
            bus,
            log,
            ip_null_count: AtomicU32::new(0),
            hb_fail_count: AtomicU32::new(0),
        })
    }

    pub fn tick(&self) {
        let level = EnvConfig::parse_log_level(&self.env_ini);
        if self.log.apply(&level) {
            info!("LogLevel changed to {}", level);
        }

        if self.live_ips.is_empty() {
            let count = self.ip_null_count.fetch_add(1, Ordering::SeqCst) + 1;
            if count >= IP_NULL_LIMIT {
                error!("no remote IP reachable after {} checks, requesting stop", count);
                let _ = self.bus.send(topics::STOP_REQUEST);
                return;
            }
            warn!("connected IP list is empty ({}/{})", count, IP_NULL_LIMIT);
        } else {
            self.ip_null_count.store(0, Ordering::SeqCst);
        }

        let mut reload = false;
        for listen in self.config.missing_listens() {
            if Path::new(&listen).exists() {
                info!("missing listen path {} appeared", listen);
                reload = true;
            }
        }
        if reload {
            let _ = self.bus.send(topics::RELOAD_REQUEST);
            return;
        }

        let alive = matches!(
            self.bus.send(topics::WATCHER_HEARTBEAT),
            Ok(Reply::Alive(true))
        );
        if alive {
            self.hb_fail_count.store(0, Ordering::SeqCst);
            return;
        }
        let count = self.hb_fail_count.fetch_add(1, Ordering::SeqCst) + 1;
        if count >= HB_FAIL_LIMIT {
            warn!("watcher heartbeat lost, requesting reload");
            self.hb_fail_count.store(0, Ordering::SeqCst);
            let _ = self.bus.send(topics::RELOAD_REQUEST);
        } else {
            warn!("watcher heartbeat failed ({}/{})", count, HB_FAIL_LIMIT);
        }
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
