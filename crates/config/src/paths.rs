// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Working-directory layout shared by the daemon and the CLI.
//!
//! Both config files live in the base directory; scratch and control
//! files live under `run/`.

use std::io;
use std::path::{Path, PathBuf};

/// Resolver for the fixed file layout rooted at the working directory.
#[derive(Debug, Clone)]
pub struct Paths {
    base: PathBuf,
}

impl Paths {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn env_ini(&self) -> PathBuf {
        self.base.join("env.ini")
    }

    pub fn conf_ini(&self) -> PathBuf {
        self.base.join("filesync.ini")
    }

    pub fn run_dir(&self) -> PathBuf {
        self.base.join("run")
    }

    pub fn pid_file(&self) -> PathBuf {
        self.run_dir().join("filesync.pid")
    }

    /// Listen-root list consumed by the watcher subprocess.
    pub fn listen_file(&self) -> PathBuf {
        self.run_dir().join("listen.ini")
    }

    /// Probe input, overwritten each reachability cycle.
    pub fn ip_list_file(&self) -> PathBuf {
        self.run_dir().join("ip_list.ini")
    }

    /// Status text block, overwritten per status request.
    pub fn status_flag(&self) -> PathBuf {
        self.run_dir().join("status.flag")
    }

    /// Legacy reload touchpoint; kept overwritable for older tooling.
    pub fn reload_flag(&self) -> PathBuf {
        self.run_dir().join("reload.flag")
    }

    pub fn ensure_run_dir(&self) -> io::Result<()> {
        std::fs::create_dir_all(self.run_dir())
    }
}
