// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dual-generation retention across reloads.

use std::path::Path;

use fsync_config::{ConfigStore, Generation};
use tempfile::TempDir;

const SCHEMA: &str = "\
[__GLOBAL_REQUIRED__]
int_type = thread_count
bool_type =
float_type =

[__LISTEN_REQUIRED__]
str_type = remote_ip
";

fn write_conf(dir: &Path, roots: &[&Path]) {
    let mut body = String::from("[GLOBAL]\nthread_count = 4\nsync_period = 2\n\n");
    body.push_str(SCHEMA);
    for root in roots {
        std::fs::create_dir_all(root).unwrap();
        body.push_str(&format!("\n[{}]\nremote_ip = 10.0.0.2\n", root.display()));
    }
    std::fs::write(dir.join("filesync.ini"), body).unwrap();
}

/// A task under the old root stays resolvable for exactly one reload
/// cycle after its listen root is replaced.
#[test]
fn replaced_root_survives_exactly_one_reload() {
    let dir = TempDir::new().unwrap();
    let old_root = dir.path().join("data");
    let new_root = dir.path().join("data2");

    write_conf(dir.path(), &[&old_root]);
    let store = ConfigStore::new(dir.path().join("filesync.ini"));
    store.init().unwrap();

    write_conf(dir.path(), &[&new_root]);
    store.reload().unwrap();

    let old = old_root.display().to_string();
    assert!(!store.listen_paths(Generation::Current).contains(&old));
    assert!(store.listen_paths(Generation::Previous).contains(&old));

    store.reload().unwrap();
    assert!(!store.listen_paths(Generation::Previous).contains(&old));
}

/// Every root resolvable before a reload stays resolvable right after
/// it, through one generation or the other.
#[test]
fn reload_preserves_the_union_of_resolvable_roots() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    let c = dir.path().join("c");

    write_conf(dir.path(), &[&a, &b]);
    let store = ConfigStore::new(dir.path().join("filesync.ini"));
    store.init().unwrap();

    write_conf(dir.path(), &[&b, &c]);
    store.reload().unwrap();

    let resolvable: Vec<String> = store
        .listen_paths(Generation::Current)
        .into_iter()
        .chain(store.listen_paths(Generation::Previous))
        .collect();
    for root in [&a, &b, &c] {
        assert!(resolvable.contains(&root.display().to_string()));
    }
}

#[test]
fn reload_with_identical_input_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("data");
    write_conf(dir.path(), &[&root]);

    let store = ConfigStore::new(dir.path().join("filesync.ini"));
    store.init().unwrap();
    let before = store.current_snapshot();
    store.reload().unwrap();
    assert_eq!(store.current_snapshot(), before);
}

#[test]
fn broken_rewrite_does_not_disturb_a_running_daemon() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("data");
    write_conf(dir.path(), &[&root]);

    let store = ConfigStore::new(dir.path().join("filesync.ini"));
    store.init().unwrap();
    let before = store.current_snapshot();

    std::fs::write(dir.path().join("filesync.ini"), "[GLOBAL]\n").unwrap();
    assert!(store.reload().is_err());

    assert_eq!(store.current_snapshot(), before);
    assert!(store.is_listen_file(&root.display().to_string()));
}
