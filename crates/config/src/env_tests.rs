// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use tempfile::TempDir;

use super::*;

fn current_user() -> String {
    nix::unistd::User::from_uid(nix::unistd::Uid::effective()).unwrap().unwrap().name
}

/// Write an env.ini whose tool paths exist inside the temp dir.
fn write_env(dir: &Path, overrides: &[(&str, &str)]) -> std::path::PathBuf {
    let tool = dir.join("tool");
    std::fs::write(&tool, "").unwrap();
    let user = current_user();
    let tool_str = tool.display().to_string();
    let mut pairs = vec![
        ("log_level", "info".to_string()),
        ("log_dir", "logs".to_string()),
        ("max_log_size", "1048576".to_string()),
        ("max_log_count", "14".to_string()),
        ("log_trunc_period", "1800".to_string()),
        ("rsync_user", user),
        ("rsync_tool", tool_str.clone()),
        ("fping_tool", tool_str.clone()),
        ("inotify_tool", tool_str),
        ("so_path", dir.display().to_string()),
    ];
    for (key, value) in overrides {
        if let Some(pair) = pairs.iter_mut().find(|(k, _)| k == key) {
            pair.1 = value.to_string();
        }
    }
    let mut text = String::from("[ENV]\n");
    for (key, value) in &pairs {
        text.push_str(&format!("{key} = {value}\n"));
    }
    let path = dir.join("env.ini");
    std::fs::write(&path, text).unwrap();
    path
}

#[test]
fn loads_a_complete_environment() {
    let dir = TempDir::new().unwrap();
    let path = write_env(dir.path(), &[]);
    let env = EnvConfig::load(&path, dir.path()).unwrap();
    assert_eq!(env.log_level, "info");
    assert_eq!(env.max_log_size, 1_048_576);
    assert_eq!(env.max_log_count, 14);
    assert_eq!(env.log_trunc_period, 1800);
    // Relative log_dir resolves against the base directory.
    assert_eq!(env.log_dir, dir.path().join("logs"));
    assert_eq!(env.log_file, dir.path().join("logs").join("filesync.log"));
    assert!(env.log_dir.is_dir());
}

#[test]
fn missing_key_fails() {
    let dir = TempDir::new().unwrap();
    let path = write_env(dir.path(), &[]);
    let text = std::fs::read_to_string(&path).unwrap();
    let stripped: String =
        text.lines().filter(|l| !l.starts_with("fping_tool")).collect::<Vec<_>>().join("\n");
    std::fs::write(&path, stripped).unwrap();
    assert!(matches!(
        EnvConfig::load(&path, dir.path()),
        Err(ConfigError::MissingKey { key, .. }) if key == "fping_tool"
    ));
}

#[test]
fn empty_value_fails() {
    let dir = TempDir::new().unwrap();
    let path = write_env(dir.path(), &[("rsync_user", "")]);
    assert!(EnvConfig::load(&path, dir.path()).is_err());
}

#[test]
fn nonexistent_tool_fails() {
    let dir = TempDir::new().unwrap();
    let path = write_env(dir.path(), &[("rsync_tool", "/nonexistent/rsync")]);
    assert!(EnvConfig::load(&path, dir.path()).is_err());
}

#[test]
fn wrong_user_fails() {
    let dir = TempDir::new().unwrap();
    let path = write_env(dir.path(), &[("rsync_user", "no-such-user-xyz")]);
    assert!(EnvConfig::load(&path, dir.path()).is_err());
}

#[test]
fn non_numeric_size_fails() {
    let dir = TempDir::new().unwrap();
    let path = write_env(dir.path(), &[("max_log_size", "lots")]);
    assert!(matches!(
        EnvConfig::load(&path, dir.path()),
        Err(ConfigError::BadType { key, .. }) if key == "max_log_size"
    ));
}

#[test]
fn unsupported_level_falls_back_to_info() {
    let dir = TempDir::new().unwrap();
    let path = write_env(dir.path(), &[("log_level", "verbose")]);
    let env = EnvConfig::load(&path, dir.path()).unwrap();
    assert_eq!(env.log_level, "info");
}

#[test]
fn parse_log_level_reads_live_edits() {
    let dir = TempDir::new().unwrap();
    let path = write_env(dir.path(), &[("log_level", "debug")]);
    assert_eq!(EnvConfig::parse_log_level(&path), "debug");

    let path2 = write_env(dir.path(), &[("log_level", "noisy")]);
    assert_eq!(EnvConfig::parse_log_level(&path2), "info");

    assert_eq!(EnvConfig::parse_log_level(&dir.path().join("absent.ini")), "info");
}
