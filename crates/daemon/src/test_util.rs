// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for daemon tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fsync_config::{ConfigStore, EnvConfig};

/// Environment whose transfer tool is `/bin/true`, so composed commands
/// execute harmlessly. Override `rsync_tool` per test to force failures.
pub fn env_fixture(dir: &Path) -> Arc<EnvConfig> {
    Arc::new(EnvConfig {
        log_level: "info".to_string(),
        log_dir: dir.join("logs"),
        log_file: dir.join("logs").join("filesync.log"),
        max_log_size: 1_048_576,
        max_log_count: 5,
        log_trunc_period: 1800,
        rsync_user: current_user(),
        rsync_tool: PathBuf::from("/bin/true"),
        fping_tool: PathBuf::from("/bin/true"),
        inotify_tool: PathBuf::from("/bin/true"),
        so_path: dir.to_path_buf(),
    })
}

pub fn current_user() -> String {
    nix::unistd::User::from_uid(nix::unistd::Uid::effective())
        .ok()
        .flatten()
        .map(|user| user.name)
        .unwrap_or_else(|| "root".to_string())
}

const SCHEMA: &str = "\
[__GLOBAL_REQUIRED__]
int_type = thread_count
    sync_queue_size
    fail_queue_size
    sync_period
bool_type = make_remote_dir
float_type = fullsync_period

[__LISTEN_REQUIRED__]
str_type = remote_ip
bool_type = checksum
    compress
    full_sync
";

/// Builder for `filesync.ini` fixtures.
pub struct ConfBuilder {
    globals: Vec<(String, String)>,
    listens: Vec<(String, Vec<(String, String)>)>,
}

impl ConfBuilder {
    pub fn new() -> Self {
        let globals = [
            ("thread_count", "2"),
            ("sync_queue_size", "1000"),
            ("fail_queue_size", "500"),
            ("sync_period", "1"),
            ("fullsync_period", "60.0"),
            ("make_remote_dir", "false"),
            ("event_delete", "true"),
            ("event_create", "true"),
            ("event_closewrite", "true"),
            ("event_move", "false"),
            ("event_movedto", "false"),
            ("event_movedfrom", "false"),
            ("event_attrib", "false"),
        ];
        Self {
            globals: globals.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            listens: Vec::new(),
        }
    }

    pub fn global(mut self, key: &str, value: &str) -> Self {
        if let Some(pair) = self.globals.iter_mut().find(|(k, _)| k == key) {
            pair.1 = value.to_string();
        } else {
            self.globals.push((key.to_string(), value.to_string()));
        }
        self
    }

    /// Add a listen root with default options; the directory is created.
    pub fn listen(self, root: &Path) -> Self {
        self.listen_with(root, &[])
    }

    pub fn listen_with(mut self, root: &Path, overrides: &[(&str, &str)]) -> Self {
        std::fs::create_dir_all(root).ok();
        let mut options = vec![
            ("remote_ip".to_string(), "10.0.0.2".to_string()),
            ("checksum".to_string(), "false".to_string()),
            ("compress".to_string(), "false".to_string()),
            ("exclude".to_string(), String::new()),
            ("full_sync".to_string(), "true".to_string()),
        ];
        for (key, value) in overrides {
            if let Some(pair) = options.iter_mut().find(|(k, _)| k == key) {
                pair.1 = value.to_string();
            } else {
                options.push((key.to_string(), value.to_string()));
            }
        }
        self.listens.push((root.display().to_string(), options));
        self
    }

    pub fn write(self, dir: &Path) -> PathBuf {
        let mut body = String::from("[GLOBAL]\n");
        for (key, value) in &self.globals {
            body.push_str(&format!("{key} = {value}\n"));
        }
        body.push('\n');
        body.push_str(SCHEMA);
        for (root, options) in &self.listens {
            body.push_str(&format!("\n[{root}]\n"));
            for (key, value) in options {
                body.push_str(&format!("{key} = {value}\n"));
            }
        }
        let path = dir.join("filesync.ini");
        std::fs::write(&path, body).ok();
        path
    }

    /// Write and init, panicking on invalid fixtures.
    pub fn store(self, dir: &Path) -> Arc<ConfigStore> {
        let path = self.write(dir);
        let store = Arc::new(ConfigStore::new(path));
        store.init().unwrap();
        store
    }
}
