// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PID-file inspection and signaling.
//!
//! A PID file naming a live process means "running"; a stale file
//! (process gone) is treated as not running.

use std::path::Path;

use fsync_config::Paths;
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

/// Parse the recorded PID, if any. No trailing newline is required.
pub fn read_pid(paths: &Paths) -> Option<i32> {
    read_pid_from(&paths.pid_file())
}

fn read_pid_from(path: &Path) -> Option<i32> {
    let contents = std::fs::read_to_string(path).ok()?;
    contents.trim().parse::<i32>().ok().filter(|pid| *pid > 0)
}

/// Probe liveness with a null signal. A permission error still means
/// the process exists.
pub fn is_alive(pid: i32) -> bool {
    match kill(Pid::from_raw(pid), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// PID of the running daemon, or None when absent or stale.
pub fn running_pid(paths: &Paths) -> Option<i32> {
    read_pid(paths).filter(|pid| is_alive(*pid))
}

/// Send one of the control signals to the daemon.
pub fn send(pid: i32, signal: Signal) -> nix::Result<()> {
    kill(Pid::from_raw(pid), signal)
}
