// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment configuration (`env.ini`).
//!
//! Every key in the `[ENV]` section is required. Tool paths must point
//! at existing files and the configured transfer user must match the
//! invoking user, since the transfer subprocess runs with the daemon's
//! credentials.

use std::path::{Path, PathBuf};

use crate::{ini, ConfigError};

const SECTION: &str = "ENV";
const LEVELS: [&str; 3] = ["info", "debug", "error"];

/// Parsed and validated `env.ini`.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Initial log level; later edits are picked up live by the monitor.
    pub log_level: String,
    pub log_dir: PathBuf,
    /// `<log_dir>/filesync.log`
    pub log_file: PathBuf,
    /// Rotation threshold in bytes.
    pub max_log_size: u64,
    /// Archives kept after rotation.
    pub max_log_count: usize,
    /// Rotation check period in seconds.
    pub log_trunc_period: u64,
    pub rsync_user: String,
    pub rsync_tool: PathBuf,
    pub fping_tool: PathBuf,
    pub inotify_tool: PathBuf,
    pub so_path: PathBuf,
}

impl EnvConfig {
    /// Load `env.ini`, resolving a relative `log_dir` against `base`.
    pub fn load(path: &Path, base: &Path) -> Result<Self, ConfigError> {
        let sections = ini::parse_file(path)?;
        let env = sections
            .get(SECTION)
            .ok_or_else(|| ConfigError::MissingSection(SECTION.to_string()))?;

        let required = |key: &str| -> Result<String, ConfigError> {
            match env.get(key) {
                Some(value) if !value.is_empty() => Ok(value.clone()),
                Some(_) => Err(ConfigError::Invalid(format!("{key} is NULL"))),
                None => Err(ConfigError::MissingKey {
                    section: SECTION.to_string(),
                    key: key.to_string(),
                }),
            }
        };
        let required_u64 = |key: &str| -> Result<u64, ConfigError> {
            required(key)?.parse::<u64>().map_err(|_| ConfigError::BadType {
                section: SECTION.to_string(),
                key: key.to_string(),
                ty: "int_type",
            })
        };

        // Unsupported levels fall back to info rather than failing init.
        let log_level = {
            let level = required("log_level")?;
            if LEVELS.contains(&level.as_str()) {
                level
            } else {
                "info".to_string()
            }
        };

        let mut log_dir = PathBuf::from(required("log_dir")?);
        if log_dir.is_relative() {
            log_dir = base.join(log_dir);
        }

        let rsync_user = required("rsync_user")?;
        check_user(&rsync_user)?;

        let config = Self {
            log_file: log_dir.join("filesync.log"),
            log_dir,
            max_log_size: required_u64("max_log_size")?,
            max_log_count: required_u64("max_log_count")? as usize,
            log_trunc_period: required_u64("log_trunc_period")?,
            rsync_user,
            rsync_tool: existing_file(required("rsync_tool")?, "rsync tool")?,
            fping_tool: existing_file(required("fping_tool")?, "fping tool")?,
            inotify_tool: existing_file(required("inotify_tool")?, "inotify tool")?,
            so_path: existing_dir(required("so_path")?)?,
            log_level,
        };

        std::fs::create_dir_all(&config.log_dir)
            .map_err(|source| ConfigError::Io { path: config.log_dir.clone(), source })?;

        Ok(config)
    }

    /// Re-read only `log_level`, falling back to `info` for missing or
    /// unsupported values. Used by the monitor to pick up live edits.
    pub fn parse_log_level(path: &Path) -> String {
        match ini::read_value(path, SECTION, "log_level") {
            Some(level) if LEVELS.contains(&level.as_str()) => level,
            _ => "info".to_string(),
        }
    }
}

fn existing_file(value: String, what: &str) -> Result<PathBuf, ConfigError> {
    let path = PathBuf::from(value);
    if path.is_file() {
        Ok(path)
    } else {
        Err(ConfigError::Invalid(format!("{} is not a valid {what}", path.display())))
    }
}

fn existing_dir(value: String) -> Result<PathBuf, ConfigError> {
    let path = PathBuf::from(value);
    if path.is_dir() {
        Ok(path)
    } else {
        Err(ConfigError::Invalid(format!("{} is not a valid directory path", path.display())))
    }
}

/// The transfer subprocess inherits our credentials, so the configured
/// user must be the one running the daemon.
fn check_user(expected: &str) -> Result<(), ConfigError> {
    let current = nix::unistd::User::from_uid(nix::unistd::Uid::effective())
        .ok()
        .flatten()
        .map(|user| user.name);
    match current {
        Some(name) if name == expected => Ok(()),
        _ => Err(ConfigError::Invalid(format!("please switch to {expected} to continue"))),
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
