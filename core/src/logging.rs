use std::fs::File;
use std::path::Path;

use once_cell::sync::OnceCell;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, LevelFilter, SharedLogger, TermLogger,
    TerminalMode, WriteLogger,
};

use crate::error::Result;

static LOGGER: OnceCell<()> = OnceCell::new();

fn config() -> Config {
    ConfigBuilder::new()
        .set_target_level(LevelFilter::Error)
        .set_thread_level(LevelFilter::Off)
        .build()
}

/// Logs to the terminal and, when `file` is given, to that file as well.
/// Only the first call installs anything.
pub fn init_logger(level: LevelFilter, file: Option<&Path>) -> Result<()> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        config(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if let Some(path) = file {
        loggers.push(WriteLogger::new(level, config(), File::create(path)?));
    }
    // another logger may already be installed by the host application
    if CombinedLogger::init(loggers).is_err() {
        log::debug!("logger already initialized");
    }
    let _ = LOGGER.set(());
    Ok(())
}

/// Parses a level name such as `info` or `DEBUG`, falling back to `Info`.
pub fn level_from_str(level: &str) -> LevelFilter {
    level.trim().parse().unwrap_or(LevelFilter::Info)
}
