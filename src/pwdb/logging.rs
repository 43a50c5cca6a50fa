//! Logger bootstrap for the binary.
//!
//! The core only uses the `log` macros and emits `event=... status=...` lines.
//! This module decides where they go: a size-rotated file when a log
//! directory is known, stderr otherwise. Sensitive values never reach a log
//! line.

use crate::error::{PwdbError, Result};
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::info;
use std::path::Path;

const LOG_FILE_BASENAME: &str = "pwdb";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 5 * 1024 * 1024;
const MAX_LOG_FILES: usize = 3;

/// Starts logging. The returned handle must be kept alive for the whole run.
pub fn init_logging(level: &str, log_dir: Option<&Path>) -> Result<LoggerHandle> {
    let level = normalize_level(level)?;
    let logger = Logger::try_with_str(level)
        .map_err(|e| PwdbError::Config(format!("invalid log level `{}`: {}", level, e)))?;

    let handle = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            logger
                .log_to_file(FileSpec::default().directory(dir).basename(LOG_FILE_BASENAME))
                .rotate(
                    Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(MAX_LOG_FILES),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .append()
                .format_for_files(flexi_logger::detailed_format)
                .start()
        }
        None => logger.log_to_stderr().start(),
    }
    .map_err(|e| PwdbError::Config(format!("failed to start logger: {}", e)))?;

    info!(
        "event=app_start module=logging status=ok version={} level={} log_dir={}",
        env!("CARGO_PKG_VERSION"),
        level,
        log_dir
            .map(|d| d.display().to_string())
            .unwrap_or_else(|| "stderr".to_string())
    );
    Ok(handle)
}

fn normalize_level(level: &str) -> Result<&'static str> {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" => Ok("off"),
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(PwdbError::Config(format!(
            "unsupported log level `{}`; expected off|trace|debug|info|warn|error",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_normalized() {
        assert_eq!(normalize_level(" WARNING ").unwrap(), "warn");
        assert_eq!(normalize_level("Debug").unwrap(), "debug");
        assert!(matches!(
            normalize_level("loud"),
            Err(PwdbError::Config(_))
        ));
    }
}
