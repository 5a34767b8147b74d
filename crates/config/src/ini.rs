// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal INI reader.
//!
//! Narrow contract: `[section]` headers, `key = value` (or `key: value`)
//! pairs, `#`/`;` comments, blank lines. A value continues onto
//! following lines that start with whitespace; continuation lines are
//! joined with `\n`, which the schema sections rely on for their
//! newline-joined key lists.

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

use crate::ConfigError;

/// One parsed section: key → value, insertion order not preserved.
pub type SectionMap = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum IniError {
    #[error("line {line}: {reason}")]
    Syntax { line: usize, reason: String },
}

/// Parse INI text into `section → (key → value)`.
pub fn parse(text: &str) -> Result<BTreeMap<String, SectionMap>, IniError> {
    let mut sections: BTreeMap<String, SectionMap> = BTreeMap::new();
    let mut current: Option<String> = None;
    let mut last_key: Option<String> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            last_key = None;
            continue;
        }

        // Continuation: indented line under an existing key.
        if raw.starts_with(char::is_whitespace) {
            if let (Some(section), Some(key)) = (&current, &last_key) {
                if let Some(value) =
                    sections.get_mut(section).and_then(|keys| keys.get_mut(key))
                {
                    if !value.is_empty() {
                        value.push('\n');
                    }
                    value.push_str(trimmed);
                    continue;
                }
            }
            return Err(IniError::Syntax {
                line,
                reason: "continuation line without a preceding key".to_string(),
            });
        }

        if let Some(name) = trimmed.strip_prefix('[') {
            let Some(name) = name.strip_suffix(']') else {
                return Err(IniError::Syntax {
                    line,
                    reason: "unterminated section header".to_string(),
                });
            };
            let name = name.trim().to_string();
            sections.entry(name.clone()).or_default();
            current = Some(name);
            last_key = None;
            continue;
        }

        let Some((key, value)) = trimmed.split_once(|c| c == '=' || c == ':') else {
            return Err(IniError::Syntax {
                line,
                reason: format!("expected key = value, got {trimmed:?}"),
            });
        };
        let Some(section) = &current else {
            return Err(IniError::Syntax {
                line,
                reason: "key outside of any section".to_string(),
            });
        };
        let key = key.trim().to_string();
        if key.is_empty() {
            return Err(IniError::Syntax { line, reason: "empty key".to_string() });
        }
        if let Some(keys) = sections.get_mut(section) {
            keys.insert(key.clone(), value.trim().to_string());
        }
        last_key = Some(key);
    }

    Ok(sections)
}

/// Parse an INI file from disk.
pub fn parse_file(path: &Path) -> Result<BTreeMap<String, SectionMap>, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
    Ok(parse(&text)?)
}

/// Re-read a single value from disk. Any failure yields `None`; the
/// monitor uses this for live `log_level` edits and tolerates missing
/// or briefly malformed files.
pub fn read_value(path: &Path, section: &str, key: &str) -> Option<String> {
    let text = std::fs::read_to_string(path).ok()?;
    let sections = parse(&text).ok()?;
    sections.get(section)?.get(key).cloned()
}

#[cfg(test)]
#[path = "ini_tests.rs"]
mod tests;
