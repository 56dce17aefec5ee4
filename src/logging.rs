/*!
 * Console logger with an optional per-document log file.
 *
 * Console lines are colored by level and prefixed with a timestamp and an
 * emoji. While a `DocumentLog` guard is alive, every enabled record is also
 * appended to that document's log file as a plain line.
 */

use anyhow::{Context, Result};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::file_utils::FileManager;

/// Currently attached document log, if any
static FILE_SINK: Lazy<Mutex<Option<BufWriter<File>>>> = Lazy::new(|| Mutex::new(None));

// @struct: Custom logger implementation
pub struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    pub fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger; `level` can be changed later with `log::set_max_level`
    pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color prefix for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let now = chrono::Local::now();
        let _ = writeln!(
            std::io::stderr(),
            "{}{} {} {}\x1B[0m",
            Self::get_color_for_level(record.level()),
            now.format("%H:%M:%S.%3f"),
            Self::get_emoji_for_level(record.level()),
            record.args()
        );

        if let Some(sink) = FILE_SINK.lock().as_mut() {
            let _ = writeln!(
                sink,
                "[{}] {} {}",
                now.format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
        if let Some(sink) = FILE_SINK.lock().as_mut() {
            let _ = sink.flush();
        }
    }
}

/// Keeps a document log file attached; flushed and detached on drop
#[derive(Debug)]
pub struct DocumentLog {
    path: PathBuf,
}

impl DocumentLog {
    /// Append all log records to `path` until the guard is dropped.
    ///
    /// Attaching replaces any previously attached file.
    pub fn attach<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            FileManager::ensure_dir(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {:?}", path))?;

        *FILE_SINK.lock() = Some(BufWriter::new(file));
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DocumentLog {
    fn drop(&mut self) {
        if let Some(mut sink) = FILE_SINK.lock().take() {
            let _ = sink.flush();
        }
    }
}
