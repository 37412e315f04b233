use crate::config;
use anyhow::{Context, Result};
use flexi_logger::{Duplicate, FileSpec, Logger, LoggerHandle, WriteMode};
use std::env;
use std::fs;

pub const LOG_LEVEL_ENV: &str = "TUNEDROP_LOG";

fn log_filter() -> String {
    match env::var(LOG_LEVEL_ENV) {
        Ok(spec) if !spec.trim().is_empty() => spec,
        _ => "tunedrop=info, warn".to_string(),
    }
}

/// File logging under the config root. The TUI owns the terminal, so stderr
/// only gets a copy in headless mode.
pub fn init(headless: bool) -> Result<LoggerHandle> {
    let dir = config::log_dir()?;
    fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let mut logger = Logger::try_with_str(log_filter())
        .context("invalid log filter")?
        .log_to_file(
            FileSpec::default()
                .directory(&dir)
                .basename("tunedrop")
                .suffix("log")
                .use_timestamp(false),
        )
        .append()
        .format_for_files(flexi_logger::opt_format)
        .write_mode(WriteMode::Direct);

    if headless {
        logger = logger.duplicate_to_stderr(Duplicate::Info);
    }

    logger.start().context("failed to start logger")
}
