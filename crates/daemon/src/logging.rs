// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon log writer.
//!
//! Writes `[LEVEL] YYYY-MM-DD HH:MM:SS.mmm: <message>` lines to the log
//! file, opening it in append mode per write so rotation can move the
//! file aside at any time. The active level is adjustable at runtime
//! through [`LogControl`]; the monitor drives it from live `log_level`
//! edits.

use std::fmt::Write as _;
use std::io;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::reload;
use tracing_subscriber::util::TryInitError;

const LEVELS: [&str; 3] = ["info", "debug", "error"];

/// Runtime handle for the active log level.
pub struct LogControl {
    current: Mutex<String>,
    apply_fn: Box<dyn Fn(&str) + Send + Sync>,
}

impl LogControl {
    pub fn new(initial: &str, apply_fn: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self { current: Mutex::new(initial.to_string()), apply_fn: Box::new(apply_fn) }
    }

    /// Switch to `level` if it is legal and differs from the active one.
    /// Returns whether a change was applied.
    pub fn apply(&self, level: &str) -> bool {
        if !LEVELS.contains(&level) {
            return false;
        }
        let mut current = self.current.lock();
        if *current == level {
            return false;
        }
        *current = level.to_string();
        (self.apply_fn)(level);
        true
    }

    pub fn current(&self) -> String {
        self.current.lock().clone()
    }
}

/// Install the global subscriber writing to `log_file`.
pub fn init(log_file: &Path, initial_level: &str) -> Result<LogControl, TryInitError> {
    let (filter, handle) = reload::Layer::new(to_filter(initial_level));
    let writer = AppendWriter::new(log_file);
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(LineFormat)
                .with_writer(writer)
                .with_ansi(false),
        )
        .try_init()?;

    Ok(LogControl::new(initial_level, move |level| {
        let _ = handle.reload(to_filter(level));
    }))
}

/// Config level names onto tracing filters. `error` keeps only errors,
/// matching the file format contract (warn is suppressed at `error`).
pub fn to_filter(level: &str) -> LevelFilter {
    match level {
        "debug" => LevelFilter::DEBUG,
        "error" => LevelFilter::ERROR,
        _ => LevelFilter::INFO,
    }
}

fn level_token(level: &Level) -> &'static str {
    if *level == Level::ERROR {
        "ERROR"
    } else if *level == Level::WARN {
        "WARN "
    } else if *level == Level::INFO {
        "INFO "
    } else if *level == Level::DEBUG {
        "DEBUG"
    } else {
        "TRACE"
    }
}

/// `[LEVEL] YYYY-MM-DD HH:MM:SS.mmm: <message>`
pub struct LineFormat;

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        write!(
            writer,
            "[{}] {}: ",
            level_token(event.metadata().level()),
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f")
        )?;
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Opens the log file per write, append mode, so a rotated file is
/// simply recreated on the next line.
#[derive(Clone)]
pub struct AppendWriter {
    path: Arc<PathBuf>,
}

impl AppendWriter {
    pub fn new(path: &Path) -> Self {
        Self { path: Arc::new(path.to_path_buf()) }
    }
}

impl<'a> MakeWriter<'a> for AppendWriter {
    type Writer = LogSink;

    fn make_writer(&'a self) -> Self::Writer {
        match std::fs::OpenOptions::new().create(true).append(true).open(self.path.as_ref()) {
            Ok(file) => LogSink::File(file),
            Err(_) => LogSink::Discard,
        }
    }
}

/// Write target that degrades to discarding when the file is unopenable.
pub enum LogSink {
    File(std::fs::File),
    Discard,
}

impl io::Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            LogSink::File(file) => file.write(buf),
            LogSink::Discard => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            LogSink::File(file) => file.flush(),
            LogSink::Discard => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
