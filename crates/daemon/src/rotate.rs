// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log rotation.
//!
//! When the log file reaches the size threshold it is moved aside,
//! archived to `<stem>_YYYYMMDD-HHMM.tar.gz` via the system `tar`, and
//! the newest `max_count` archives are kept. The writer reopens the log
//! per line, so the next message recreates the file.

use std::io;
use std::path::{Path, PathBuf};

use fsync_config::EnvConfig;
use tokio::process::Command;
use tracing::{info, warn};

pub struct Rotator {
    log_file: PathBuf,
    max_size: u64,
    max_count: usize,
}

impl Rotator {
    pub fn new(env: &EnvConfig) -> Self {
        Self {
            log_file: env.log_file.clone(),
            max_size: env.max_log_size,
            max_count: env.max_log_count,
        }
    }

    pub async fn tick(&self) {
        let size = std::fs::metadata(&self.log_file).map(|meta| meta.len()).unwrap_or(0);
        if size < self.max_size {
            return;
        }
        info!("trunc log: {} ({} bytes)", self.log_file.display(), size);
        if let Err(e) = self.rotate().await {
            warn!("log rotation failed: {}", e);
        }
        if let Err(e) = self.prune() {
            warn!("archive pruning failed: {}", e);
        }
    }

    async fn rotate(&self) -> io::Result<()> {
        let dir = parent_of(&self.log_file)?;
        let aside_name = format!("{}.1", file_name_of(&self.log_file)?);
        let aside = dir.join(&aside_name);
        let archive = self.archive_path(&chrono::Local::now().format("%Y%m%d-%H%M").to_string())?;

        std::fs::rename(&self.log_file, &aside)?;

        let status = Command::new("tar")
            .arg("zcf")
            .arg(&archive)
            .arg("-C")
            .arg(dir)
            .arg(&aside_name)
            .output()
            .await?;
        if !status.status.success() {
            // Keep the moved-aside file for inspection.
            return Err(io::Error::new(io::ErrorKind::Other, format!(
                "tar exited with {}",
                status.status.code().unwrap_or(-1)
            )));
        }
        std::fs::remove_file(&aside)?;
        Ok(())
    }

    /// Archive path for a given timestamp, next to the log file.
    fn archive_path(&self, stamp: &str) -> io::Result<PathBuf> {
        let dir = parent_of(&self.log_file)?;
        let stem = self
            .log_file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "filesync".to_string());
        Ok(dir.join(format!("{stem}_{stamp}.tar.gz")))
    }

    /// Delete all but the newest `max_count` archives. Archive names
    /// embed the timestamp, so name order is age order.
    fn prune(&self) -> io::Result<()> {
        let dir = parent_of(&self.log_file)?;
        let stem = self
            .log_file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "filesync".to_string());
        let prefix = format!("{stem}_");

        let mut archives: Vec<String> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.starts_with(&prefix) && name.ends_with(".tar.gz"))
            .collect();
        archives.sort();
        archives.reverse();

        for stale in archives.iter().skip(self.max_count) {
            if let Err(e) = std::fs::remove_file(dir.join(stale)) {
                warn!("could not remove archive {}: {}", stale, e);
            }
        }
        Ok(())
    }
}

fn parent_of(path: &Path) -> io::Result<&Path> {
    path.parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, format!("{} has no parent directory", path.display())))
}

fn file_name_of(path: &Path) -> io::Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, format!("{} has no file name", path.display())))
}

#[cfg(test)]
#[path = "rotate_tests.rs"]
mod tests;
