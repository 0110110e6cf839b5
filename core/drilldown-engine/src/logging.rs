//! FILENAME: core/drilldown-engine/src/logging.rs
// PURPOSE: Unified logging for the engine and its transports.
// FORMAT: seq|level|category|message, one line per event.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Mutex;

use once_cell::sync::Lazy;

// ============================================================================
// UNIFIED LOGGING SYSTEM
// ============================================================================

/// Global sequence counter, shared by every category.
static LOG_SEQ: AtomicU64 = AtomicU64::new(0);

/// Global log file handle.
pub static LOG_FILE: Lazy<Mutex<Option<File>>> = Lazy::new(|| Mutex::new(None));

/// Path of the currently open log file.
static LOG_PATH: Lazy<Mutex<Option<PathBuf>>> = Lazy::new(|| Mutex::new(None));

/// Lines below this level are dropped.
static MIN_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

/// Mirror every line to stderr.
static CONSOLE_ECHO: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "D",
            LogLevel::Info => "I",
            LogLevel::Warn => "W",
            LogLevel::Error => "E",
        }
    }

    /// Accepts "debug"/"info"/"warn"/"error" as well as the one-letter codes.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "d" | "debug" => Some(LogLevel::Debug),
            "i" | "info" => Some(LogLevel::Info),
            "w" | "warn" | "warning" => Some(LogLevel::Warn),
            "e" | "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => LogLevel::Debug,
            1 => LogLevel::Info,
            2 => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}

/// Get next sequence number
pub fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst) + 1
}

pub fn set_min_level(level: LogLevel) {
    MIN_LEVEL.store(level as u8, Ordering::SeqCst);
}

pub fn min_level() -> LogLevel {
    LogLevel::from_u8(MIN_LEVEL.load(Ordering::SeqCst))
}

pub fn set_console_echo(enabled: bool) {
    CONSOLE_ECHO.store(enabled, Ordering::SeqCst);
}

/// Path of the open log file, if any.
pub fn log_path() -> Option<PathBuf> {
    LOG_PATH.lock().ok().and_then(|guard| guard.clone())
}

/// Opens (and truncates) the log file. Creates missing parent directories.
pub fn init_log_file(path: &Path) -> io::Result<PathBuf> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;

    let mut log_file = LOG_FILE
        .lock()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("Lock error: {}", e)))?;
    *log_file = Some(file);

    if let Ok(mut guard) = LOG_PATH.lock() {
        *guard = Some(path.to_path_buf());
    }

    Ok(path.to_path_buf())
}

/// Write a log line in unified format
pub fn write_log(level: LogLevel, category: &str, message: &str) {
    if level < min_level() {
        return;
    }

    let seq = next_seq();
    let line = format!("{}|{}|{}|{}", seq, level.as_str(), category, message);

    if let Ok(mut guard) = LOG_FILE.lock() {
        if let Some(ref mut file) = *guard {
            if let Err(e) = writeln!(file, "{}", line) {
                eprintln!("[LOG_ERROR] Failed to write: {}", e);
            }
            let _ = file.flush();
        }
    }

    if CONSOLE_ECHO.load(Ordering::SeqCst) {
        eprintln!("{}", line);
    }
}

/// Write an ENTER log line for function entry
pub fn write_log_enter(level: LogLevel, category: &str, func_name: &str, params: &str) {
    let message = if params.is_empty() {
        format!("ENTER {}", func_name)
    } else {
        format!("ENTER {} {}", func_name, params)
    };
    write_log(level, category, &message);
}

/// Write an EXIT log line for function exit
pub fn write_log_exit(level: LogLevel, category: &str, func_name: &str, result: &str) {
    let message = if result.is_empty() {
        format!("EXIT {}", func_name)
    } else {
        format!("EXIT {} {}", func_name, result)
    };
    write_log(level, category, &message);
}

/// Sort the log file by sequence number. Lines written concurrently can
/// land out of order; this restores the logical order. Returns the line count.
pub fn sort_log_file() -> io::Result<usize> {
    let mut guard = LOG_FILE
        .lock()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("Lock error: {}", e)))?;

    let file = guard
        .as_mut()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Log file not initialized"))?;

    file.flush()?;
    file.seek(SeekFrom::Start(0))?;

    let mut content = String::new();
    file.read_to_string(&mut content)?;

    let mut lines: Vec<(u64, String)> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let seq = line
                .split('|')
                .next()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(u64::MAX);
            (seq, line.to_string())
        })
        .collect();

    lines.sort_by_key(|(seq, _)| *seq);

    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    for (_, line) in &lines {
        writeln!(file, "{}", line)?;
    }
    file.flush()?;

    Ok(lines.len())
}

// ============================================================================
// MACRO DEFINITIONS & EXPORTS
// ============================================================================

#[macro_export]
macro_rules! log_debug {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::write_log($crate::logging::LogLevel::Debug, $cat, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::write_log($crate::logging::LogLevel::Info, $cat, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::write_log($crate::logging::LogLevel::Warn, $cat, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::write_log($crate::logging::LogLevel::Error, $cat, &format!($($arg)*))
    };
}

// ENTER/EXIT macros for function tracing

#[macro_export]
macro_rules! log_enter {
    ($cat:expr, $func:expr) => {
        $crate::logging::write_log_enter($crate::logging::LogLevel::Debug, $cat, $func, "")
    };
    ($cat:expr, $func:expr, $($arg:tt)*) => {
        $crate::logging::write_log_enter($crate::logging::LogLevel::Debug, $cat, $func, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_exit {
    ($cat:expr, $func:expr) => {
        $crate::logging::write_log_exit($crate::logging::LogLevel::Debug, $cat, $func, "")
    };
    ($cat:expr, $func:expr, $($arg:tt)*) => {
        $crate::logging::write_log_exit($crate::logging::LogLevel::Debug, $cat, $func, &format!($($arg)*))
    };
}

// Re-export the macros so they can be imported via `use crate::logging::log_info;`
pub use log_debug;
pub use log_enter;
pub use log_error;
pub use log_exit;
pub use log_info;
pub use log_warn;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parse() {
        assert_eq!(LogLevel::parse("debug"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse(" WARN "), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("e"), Some(LogLevel::Error));
        assert_eq!(LogLevel::parse("loud"), None);
        assert!(LogLevel::Debug < LogLevel::Error);
    }

    #[test]
    fn test_sequence_is_monotonic() {
        let a = next_seq();
        let b = next_seq();
        assert!(b > a);
    }

    #[test]
    fn test_log_file_receives_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("explorer.log");

        init_log_file(&path).unwrap();
        write_log(LogLevel::Error, "TEST", "written to file");
        assert!(sort_log_file().unwrap() >= 1);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("|E|TEST|written to file"));
        assert_eq!(log_path(), Some(path));
    }
}
