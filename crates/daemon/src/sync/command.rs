// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-destination transfer command composition.
//!
//! Commands are shell strings run through `sh -c`: the multi-exclude
//! form `--exclude={a,b}` is a shell brace expansion and only works
//! with two or more elements, so a single exclude must use the plain
//! `--exclude=VAL` form.

use std::path::Path;

use fsync_config::{ConfigStore, Generation, GLOBAL};

/// Options resolved from the owning listen section (and GLOBAL, for
/// `make_remote_dir`) in one configuration generation.
#[derive(Debug, Clone)]
pub struct ListenOptions {
    pub remote_ips: Vec<String>,
    pub checksum: bool,
    pub compress: bool,
    pub exclude: Option<String>,
    pub make_remote_dir: bool,
}

impl ListenOptions {
    pub fn load(config: &ConfigStore, root: &str, generation: Generation) -> Self {
        let remote_ips = config
            .get_in("remote_ip", root, generation)
            .map(|value| {
                value
                    .split(',')
                    .map(|ip| ip.trim().to_string())
                    .filter(|ip| !ip.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Self {
            remote_ips,
            checksum: config.get_in("checksum", root, generation).as_deref() == Some("true"),
            compress: config.get_in("compress", root, generation).as_deref() == Some("true"),
            exclude: config
                .get_in("exclude", root, generation)
                .filter(|value| !value.is_empty()),
            make_remote_dir: config.get_in("make_remote_dir", GLOBAL, generation).as_deref()
                == Some("true"),
        }
    }
}

/// `(parent directory, basename)` of a task path. The transfer always
/// enters the parent and replicates the basename, whether the task is a
/// file or a directory.
pub fn split_task(task: &str) -> (String, String) {
    let path = Path::new(task);
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.display().to_string(),
        _ => "/".to_string(),
    };
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| task.to_string());
    (dir, name)
}

/// Compose the shell command replicating `task` to one destination.
pub fn transfer_command(
    rsync_tool: &Path,
    user: &str,
    task: &str,
    ip: &str,
    options: &ListenOptions,
) -> String {
    let (dir, name) = split_task(task);

    let mut param = format!("{} -a", rsync_tool.display());
    if options.checksum {
        param.push('c');
    }
    if options.compress {
        param.push('z');
    }
    if let Some(exclude) = &options.exclude {
        if exclude.contains(',') {
            param.push_str(&format!(" --exclude={{{exclude}}}"));
        } else {
            param.push_str(&format!(" --exclude={exclude}"));
        }
    }
    param.push_str(&format!(" --delete --rsh=ssh {name} {user}@{ip}:{dir}"));

    let cmd = format!("cd {dir} && {param}");
    if options.make_remote_dir {
        format!("ssh {user}@{ip} 'mkdir -p {dir}'; {cmd}")
    } else {
        cmd
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
