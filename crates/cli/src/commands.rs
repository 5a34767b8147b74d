// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control commands: locate the daemon through the PID file and drive
//! it with signals.

use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use fsync_config::Paths;
use nix::sys::signal::Signal;

use crate::pidfile;

/// Component-init failure, shared with the daemon's exit contract.
const EXIT_COMPONENT: u8 = 3;

/// Raw signal numbers; the numbers, not the names, are the contract.
const SIG_PAUSE: i32 = 10;
const SIG_RESUME: i32 = 12;
const SIG_RELOAD: i32 = 30;
const SIG_STATUS: i32 = 31;

/// Spawn the daemon detached and wait for it to confirm startup.
pub fn start(paths: &Paths) -> Result<u8> {
    if let Some(pid) = pidfile::running_pid(paths) {
        println!("filesync already running (pid {pid})");
        return Ok(0);
    }
    paths.ensure_run_dir().context("cannot create run directory")?;

    let binary = find_daemon_binary();
    let mut child = Command::new(&binary)
        .current_dir(paths.base())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .process_group(0)
        .spawn()
        .with_context(|| format!("failed to spawn {}", binary.display()))?;

    // Either the daemon dies during init (propagate its exit code) or
    // its PID file shows up live.
    for _ in 0..30 {
        if let Some(status) = child.try_wait()? {
            let code = status.code().map(|c| c as u8).unwrap_or(EXIT_COMPONENT);
            eprintln!("filesync failed to start (exit {code})");
            return Ok(if code == 0 { EXIT_COMPONENT } else { code });
        }
        if pidfile::running_pid(paths).is_some() {
            println!("filesync started");
            return Ok(0);
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    eprintln!("filesync did not confirm startup");
    Ok(EXIT_COMPONENT)
}

/// TERM the daemon and wait for the process to go away.
pub fn stop(paths: &Paths) -> Result<u8> {
    let Some(pid) = pidfile::running_pid(paths) else {
        println!("filesync not running");
        return Ok(0);
    };
    pidfile::send(pid, Signal::SIGTERM).context("failed to signal daemon")?;
    for _ in 0..100 {
        if !pidfile::is_alive(pid) {
            println!("filesync stopped");
            return Ok(0);
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    eprintln!("filesync (pid {pid}) did not exit");
    Ok(EXIT_COMPONENT)
}

pub fn restart(paths: &Paths) -> Result<u8> {
    let code = stop(paths)?;
    if code != 0 {
        return Ok(code);
    }
    // Grace period for the OS to release the PID-file lock.
    std::thread::sleep(Duration::from_millis(500));
    start(paths)
}

/// Ask the daemon for a status block and print it.
pub fn status(paths: &Paths) -> Result<u8> {
    let Some(pid) = pidfile::running_pid(paths) else {
        println!("filesync not running");
        return Ok(0);
    };

    let flag = paths.status_flag();
    let _ = std::fs::remove_file(&flag);
    pidfile::send(pid, signal_from(SIG_STATUS)?).context("failed to signal daemon")?;

    for _ in 0..40 {
        if flag.exists() {
            // One extra beat so the write completes.
            std::thread::sleep(Duration::from_millis(50));
            let text = std::fs::read_to_string(&flag)
                .with_context(|| format!("cannot read {}", flag.display()))?;
            print!("{text}");
            return Ok(0);
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    eprintln!("filesync (pid {pid}) did not report status");
    Ok(EXIT_COMPONENT)
}

pub fn reload(paths: &Paths) -> Result<u8> {
    // Legacy touchpoint for older tooling that watches the run dir.
    let _ = std::fs::write(paths.reload_flag(), "");
    control(paths, SIG_RELOAD, "reload")
}

pub fn pause(paths: &Paths) -> Result<u8> {
    control(paths, SIG_PAUSE, "pause")
}

pub fn resume(paths: &Paths) -> Result<u8> {
    control(paths, SIG_RESUME, "resume")
}

fn control(paths: &Paths, raw: i32, verb: &str) -> Result<u8> {
    let Some(pid) = pidfile::running_pid(paths) else {
        println!("filesync not running");
        return Ok(EXIT_COMPONENT);
    };
    pidfile::send(pid, signal_from(raw)?).context("failed to signal daemon")?;
    println!("filesync {verb} requested");
    Ok(0)
}

fn signal_from(raw: i32) -> Result<Signal> {
    Signal::try_from(raw).map_err(|e| anyhow!("signal {raw} unavailable: {e}"))
}

/// Prefer the `fsyncd` next to this binary, fall back to PATH.
fn find_daemon_binary() -> PathBuf {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("fsyncd");
            if sibling.exists() {
                return sibling;
            }
        }
    }
    PathBuf::from("fsyncd")
}
