//! File logger behind the `log` facade.
//!
//! Lines go to `tessera_debug.log` next to the executable. `TESSERA_LOG`
//! overrides the configured level.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{LevelFilter, Log, Metadata, Record};
use parking_lot::Mutex;

pub const LEVEL_ENV: &str = "TESSERA_LOG";

pub fn log_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tessera_debug.log")
}

struct FileLogger {
    level: LevelFilter,
    file: Mutex<File>,
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(record.level(), record.target(), &record.args().to_string());
        let _ = self.file.lock().write_all(line.as_bytes());
    }

    fn flush(&self) {
        let _ = self.file.lock().flush();
    }
}

fn format_line(level: log::Level, target: &str, message: &str) -> String {
    format!("[{level:<5} {target}] {message}\n")
}

/// Parse a level name; unknown names give `None`.
pub fn parse_level(name: &str) -> Option<LevelFilter> {
    name.trim().parse().ok()
}

/// Pick the effective level: the environment wins over the config value.
pub fn effective_level(configured: &str, env: Option<&str>) -> LevelFilter {
    env.and_then(parse_level)
        .or_else(|| parse_level(configured))
        .unwrap_or(LevelFilter::Info)
}

/// Install the file logger. Failure leaves logging disabled.
pub fn init(configured: &str) {
    let env = std::env::var(LEVEL_ENV).ok();
    let level = effective_level(configured, env.as_deref());
    if level == LevelFilter::Off {
        return;
    }
    let path = log_path();
    let file = match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("tessera: cannot open {}: {e}", path.display());
            return;
        }
    };
    let logger = FileLogger {
        level,
        file: Mutex::new(file),
    };
    if log::set_boxed_logger(Box::new(logger)).is_ok() {
        log::set_max_level(level);
    }
}
