// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sync configuration store (`filesync.ini`) with dual-generation
//! retention.
//!
//! The store keeps two snapshots: `current` (active) and `previous`
//! (retained across exactly one reload) so in-flight tasks created
//! under the old configuration can still resolve their listen root.
//! A reload only rotates the generations after the fresh parse
//! validates; on failure both snapshots stay untouched.
//!
//! Listen roots that are declared but absent on disk are not an error:
//! they move into the missing-listen set, are dropped from `current`,
//! and the monitor triggers a reload when they reappear.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::ini::{self, SectionMap};
use crate::ConfigError;

/// Daemon-wide tunables live in this section.
pub const GLOBAL: &str = "GLOBAL";

const GLOBAL_REQUIRED: &str = "__GLOBAL_REQUIRED__";
const LISTEN_REQUIRED: &str = "__LISTEN_REQUIRED__";
const TYPE_KEYS: [&str; 4] = ["str_type", "int_type", "bool_type", "float_type"];

/// Which retained snapshot to consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generation {
    Current,
    Previous,
}

/// One parsed-and-validated configuration: `section → (key → value)`.
///
/// After validation the synthetic schema sections are stripped, so the
/// remaining sections are `GLOBAL` plus one section per listen root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConfigSnapshot {
    sections: BTreeMap<String, SectionMap>,
}

impl ConfigSnapshot {
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section)?.get(key).map(String::as_str)
    }

    /// Section names excluding `GLOBAL`, i.e. the listen roots.
    pub fn listen_paths(&self) -> Vec<String> {
        self.sections.keys().filter(|name| name.as_str() != GLOBAL).cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

#[derive(Default)]
struct Generations {
    current: ConfigSnapshot,
    previous: ConfigSnapshot,
}

/// Shared handle to the dual-generation configuration.
pub struct ConfigStore {
    path: PathBuf,
    generations: RwLock<Generations>,
    missing: Mutex<HashSet<String>>,
    appeared: Mutex<HashSet<String>>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            generations: RwLock::new(Generations::default()),
            missing: Mutex::new(HashSet::new()),
            appeared: Mutex::new(HashSet::new()),
        }
    }

    /// First load. On failure the store stays empty and the error is
    /// returned for the caller to abort startup.
    pub fn init(&self) -> Result<(), ConfigError> {
        let (snapshot, missing) = self.load_validated()?;
        info!("curr_config: {}", pretty(&snapshot));
        self.generations.write().current = snapshot;
        *self.missing.lock() = missing;
        Ok(())
    }

    /// Hot reload. Rotates current→previous only once the fresh parse
    /// validates; on failure both generations stay installed.
    pub fn reload(&self) -> Result<(), ConfigError> {
        let prev_missing = self.missing.lock().clone();
        match self.load_validated() {
            Ok((snapshot, missing)) => {
                {
                    let mut generations = self.generations.write();
                    generations.previous =
                        std::mem::replace(&mut generations.current, snapshot);
                    info!("last_config: {}", pretty(&generations.previous));
                    info!("curr_config: {}", pretty(&generations.current));
                }
                *self.appeared.lock() =
                    prev_missing.difference(&missing).cloned().collect();
                *self.missing.lock() = missing;
                Ok(())
            }
            Err(e) => {
                error!("config reload failed, keeping installed generations: {}", e);
                Err(e)
            }
        }
    }

    fn load_validated(&self) -> Result<(ConfigSnapshot, HashSet<String>), ConfigError> {
        if !self.path.is_file() {
            return Err(ConfigError::Invalid(format!("{} is not exist", self.path.display())));
        }
        let mut sections = ini::parse_file(&self.path)?;
        let missing = validate(&mut sections)?;
        Ok((ConfigSnapshot { sections }, missing))
    }

    /// Listen roots in the selected generation.
    pub fn listen_paths(&self, generation: Generation) -> Vec<String> {
        let generations = self.generations.read();
        self.select(&generations, generation).listen_paths()
    }

    /// True iff `path` equals a configured listen root in `current`,
    /// i.e. a single-file listen.
    pub fn is_listen_file(&self, path: &str) -> bool {
        self.generations
            .read()
            .current
            .listen_paths()
            .iter()
            .any(|root| root == path)
    }

    /// GLOBAL lookup in `current`.
    pub fn get(&self, key: &str) -> Option<String> {
        self.get_in(key, GLOBAL, Generation::Current)
    }

    pub fn get_in(&self, key: &str, section: &str, generation: Generation) -> Option<String> {
        let generations = self.generations.read();
        self.select(&generations, generation).get(section, key).map(str::to_string)
    }

    fn select<'a>(&self, generations: &'a Generations, generation: Generation) -> &'a ConfigSnapshot {
        match generation {
            Generation::Current => &generations.current,
            Generation::Previous => &generations.previous,
        }
    }

    /// Copy of `current` for equality checks in tests and status dumps.
    pub fn current_snapshot(&self) -> ConfigSnapshot {
        self.generations.read().current.clone()
    }

    pub fn missing_listens(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.missing.lock().iter().cloned().collect();
        paths.sort();
        paths
    }

    pub fn appeared_listens(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.appeared.lock().iter().cloned().collect();
        paths.sort();
        paths
    }

    /// Required GLOBAL integer, already schema-checked to be positive.
    pub fn global_u64(&self, key: &str) -> Result<u64, ConfigError> {
        let value = self.get(key).ok_or_else(|| ConfigError::MissingKey {
            section: GLOBAL.to_string(),
            key: key.to_string(),
        })?;
        value.parse::<u64>().map_err(|_| ConfigError::BadType {
            section: GLOBAL.to_string(),
            key: key.to_string(),
            ty: "int_type",
        })
    }

    /// Optional GLOBAL integer with a default.
    pub fn global_u64_or(&self, key: &str, default: u64) -> u64 {
        self.get(key).and_then(|value| value.parse::<u64>().ok()).unwrap_or(default)
    }

    pub fn global_f64(&self, key: &str) -> Result<f64, ConfigError> {
        let value = self.get(key).ok_or_else(|| ConfigError::MissingKey {
            section: GLOBAL.to_string(),
            key: key.to_string(),
        })?;
        value.parse::<f64>().map_err(|_| ConfigError::BadType {
            section: GLOBAL.to_string(),
            key: key.to_string(),
            ty: "float_type",
        })
    }

    pub fn global_bool(&self, key: &str) -> bool {
        self.get(key).as_deref() == Some("true")
    }
}

fn pretty(snapshot: &ConfigSnapshot) -> String {
    serde_json::to_string_pretty(snapshot).unwrap_or_else(|_| "<unprintable>".to_string())
}

/// Validation pass over a freshly parsed `filesync.ini`.
///
/// Returns the missing-listen set; absent roots are dropped from the
/// sections rather than rejected. The synthetic schema sections are
/// stripped on the way out.
fn validate(sections: &mut BTreeMap<String, SectionMap>) -> Result<HashSet<String>, ConfigError> {
    if !sections.contains_key(GLOBAL) {
        return Err(ConfigError::MissingSection(GLOBAL.to_string()));
    }

    let listen_keys: Vec<String> = sections
        .keys()
        .filter(|name| {
            name.as_str() != GLOBAL
                && name.as_str() != GLOBAL_REQUIRED
                && name.as_str() != LISTEN_REQUIRED
        })
        .cloned()
        .collect();
    if listen_keys.is_empty() {
        return Err(ConfigError::NoListenRoots);
    }

    let global_required = schema_of(sections, GLOBAL_REQUIRED)?;
    let listen_required = schema_of(sections, LISTEN_REQUIRED)?;

    for (ty, keys) in &global_required {
        for key in keys {
            check_key(sections, GLOBAL, key, ty)?;
        }
    }
    for (ty, keys) in &listen_required {
        for key in keys {
            for listen in &listen_keys {
                check_key(sections, listen, key, ty)?;
            }
        }
    }

    let mut missing = HashSet::new();
    for listen in &listen_keys {
        if !Path::new(listen).exists() {
            warn!("path of {} is not exist", listen);
            missing.insert(listen.clone());
        }
    }

    sections.remove(GLOBAL_REQUIRED);
    sections.remove(LISTEN_REQUIRED);
    for gone in &missing {
        sections.remove(gone);
    }

    Ok(missing)
}

/// Read one schema section into `(type, declared keys)` pairs. A type
/// key left empty (or absent) declares nothing.
fn schema_of(
    sections: &BTreeMap<String, SectionMap>,
    name: &str,
) -> Result<Vec<(&'static str, Vec<String>)>, ConfigError> {
    let section = sections
        .get(name)
        .ok_or_else(|| ConfigError::MissingSection(name.to_string()))?;

    let mut schema = Vec::new();
    for ty in TYPE_KEYS {
        let Some(declared) = section.get(ty) else { continue };
        if declared.is_empty() {
            continue;
        }
        let keys = declared.split('\n').map(|key| key.trim().to_string()).collect();
        schema.push((ty, keys));
    }
    Ok(schema)
}

fn check_key(
    sections: &BTreeMap<String, SectionMap>,
    section: &str,
    key: &str,
    ty: &'static str,
) -> Result<(), ConfigError> {
    let value = sections
        .get(section)
        .and_then(|keys| keys.get(key))
        .ok_or_else(|| ConfigError::MissingKey {
            section: section.to_string(),
            key: key.to_string(),
        })?;
    if !check_type(value, ty) {
        return Err(ConfigError::BadType {
            section: section.to_string(),
            key: key.to_string(),
            ty,
        });
    }
    Ok(())
}

/// Type semantics for schema-declared keys. Values arrive as strings.
fn check_type(value: &str, ty: &str) -> bool {
    match ty {
        "str_type" => !value.is_empty(),
        "int_type" => value.parse::<i64>().map(|n| n > 0).unwrap_or(false),
        "bool_type" => value == "true" || value == "false",
        "float_type" => value.parse::<f64>().map(|f| f >= 0.0).unwrap_or(false),
        _ => true,
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
