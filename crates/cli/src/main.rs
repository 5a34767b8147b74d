// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! filesync: control surface for the sync daemon.
//!
//! Run from the deployment directory. Exit codes: 0 success, 1 usage,
//! 2 environment init failed, 3 component init failed, 4 unknown
//! command.

mod commands;
mod pidfile;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use fsync_config::Paths;

#[derive(Parser, Debug)]
#[command(name = "filesync", about = "File synchronization daemon", version)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Start the daemon in the background
    Start,
    /// Stop the daemon
    Stop,
    /// Stop and start the daemon
    Restart,
    /// Print the daemon's status block
    Status,
    /// Reload the configuration
    Reload,
    /// Pause synchronization
    Pause,
    /// Resume synchronization
    Resume,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = usage_code(err.kind());
            let _ = err.print();
            return ExitCode::from(code);
        }
    };

    let base = match std::env::current_dir() {
        Ok(base) => base,
        Err(e) => {
            eprintln!("filesync: cannot determine working directory: {e}");
            return ExitCode::from(2);
        }
    };
    let paths = Paths::new(base);

    let result = match cli.command {
        Cmd::Start => commands::start(&paths),
        Cmd::Stop => commands::stop(&paths),
        Cmd::Restart => commands::restart(&paths),
        Cmd::Status => commands::status(&paths),
        Cmd::Reload => commands::reload(&paths),
        Cmd::Pause => commands::pause(&paths),
        Cmd::Resume => commands::resume(&paths),
    };
    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("filesync: {e:#}");
            ExitCode::from(3)
        }
    }
}

/// Usage faults exit 1, unknown commands exit 4, help/version exit 0.
fn usage_code(kind: clap::error::ErrorKind) -> u8 {
    use clap::error::ErrorKind;
    match kind {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        ErrorKind::InvalidSubcommand => 4,
        _ => 1,
    }
}
