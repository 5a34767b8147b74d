// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote reachability prober.
//!
//! Collects the remote IPs of both configuration generations, hands
//! them to the probe tool on stdin (`cat <file> | sudo <fping>`), and
//! maintains the live-IP set from the `<ip> is alive` output lines.
//! The ready flag gates the first full sync so fresh destinations are
//! not mistaken for dead ones.

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use fsync_config::{ConfigStore, EnvConfig, Generation, Paths};
use fsync_core::IpSet;
use tokio::process::Command;
use tracing::{debug, warn};

pub struct Prober {
    env: Arc<EnvConfig>,
    config: Arc<ConfigStore>,
    paths: Paths,
    live_ips: IpSet,
    ready: Arc<AtomicBool>,
}

impl Prober {
    pub fn new(
        env: Arc<EnvConfig>,
        config: Arc<ConfigStore>,
        paths: Paths,
        live_ips: IpSet,
        ready: Arc<AtomicBool>,
    ) -> Arc<Self> {
        Arc::new(Self { env, config, paths, live_ips, ready })
    }

    pub async fn tick(&self) {
        let candidates = self.gather_ips();
        if candidates.is_empty() {
            // Nothing to probe; the full-sync gate can open regardless.
            self.ready.store(true, Ordering::SeqCst);
            return;
        }

        let ip_list = self.paths.ip_list_file();
        if let Err(e) = std::fs::write(&ip_list, candidates.join("\n")) {
            warn!("could not write probe input {}: {}", ip_list.display(), e);
            return;
        }

        let cmd = format!(
            "cat {} | sudo {}",
            ip_list.display(),
            self.env.fping_tool.display()
        );
        let output = match Command::new("sh").arg("-c").arg(&cmd).output().await {
            Ok(output) => String::from_utf8_lossy(&output.stdout).into_owned(),
            Err(e) => {
                warn!("probe command failed: {}", e);
                return;
            }
        };

        self.apply_probe(&candidates, &parse_alive(&output));
        self.ready.store(true, Ordering::SeqCst);
        debug!("connect_list={:?}", self.live_ips.snapshot());
    }

    /// Unique remote IPs across both generations; malformed entries are
    /// skipped with a warning.
    fn gather_ips(&self) -> Vec<String> {
        let mut ips: Vec<String> = Vec::new();
        for generation in [Generation::Current, Generation::Previous] {
            for listen in self.config.listen_paths(generation) {
                let Some(value) = self.config.get_in("remote_ip", &listen, generation) else {
                    continue;
                };
                for ip in value.split(',') {
                    let ip = ip.trim();
                    if ip.parse::<Ipv4Addr>().is_err() {
                        warn!("IP of {} is invalid:{}", listen, ip);
                        continue;
                    }
                    if !ips.iter().any(|seen| seen == ip) {
                        ips.push(ip.to_string());
                    }
                }
            }
        }
        ips
    }

    /// Add newly-live IPs and drop probed IPs that went dark.
    fn apply_probe(&self, candidates: &[String], alive: &HashSet<String>) {
        for ip in candidates {
            if alive.contains(ip) {
                self.live_ips.insert(ip);
            } else if self.live_ips.remove(ip) {
                warn!("{} is disconnect", ip);
            }
        }
    }
}

/// IPs the probe tool reported as responding.
fn parse_alive(output: &str) -> HashSet<String> {
    output
        .lines()
        .filter_map(|line| line.trim().strip_suffix(" is alive"))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
#[path = "prober_tests.rs"]
mod tests;
