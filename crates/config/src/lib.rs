// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fsync-config: configuration model for the filesync daemon.
//!
//! Covers the `env.ini` environment file, the `filesync.ini` sync
//! configuration with dual-generation retention across reloads, and the
//! working-directory path layout shared by the daemon and the CLI.

pub mod env;
pub mod ini;
pub mod paths;
pub mod store;

pub use env::EnvConfig;
pub use paths::Paths;
pub use store::{ConfigSnapshot, ConfigStore, Generation, GLOBAL};

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Malformed or inconsistent configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("parse error: {0}")]
    Ini(#[from] ini::IniError),

    #[error("{0} section not in config file")]
    MissingSection(String),

    #[error("{key} option is not in {section}")]
    MissingKey { section: String, key: String },

    #[error("{key} of {section} must be {ty}")]
    BadType { section: String, key: String, ty: &'static str },

    #[error("listen path is NULL")]
    NoListenRoots,

    #[error("{0}")]
    Invalid(String),
}
