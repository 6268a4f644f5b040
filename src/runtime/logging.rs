use std::fs::{self, File};

use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode, WriteLogger};

use crate::config::Settings;

pub fn init_logging(settings: &Settings, verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        settings.log_level().unwrap_or(LevelFilter::Warn)
    };

    let log_file = settings.logging.file.as_ref().and_then(|path| {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        File::create(path)
            .map_err(|e| eprintln!("msupack: cannot open log file {}: {e}", path.display()))
            .ok()
    });

    let result = match log_file {
        Some(file) => WriteLogger::init(level, Config::default(), file),
        None => TermLogger::init(
            level,
            Config::default(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ),
    };
    if let Err(e) = result {
        eprintln!("msupack: logger not initialized: {e}");
    }

    log::info!("msupack starting (log level: {level:?})");
}
