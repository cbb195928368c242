use std::fs::{File, OpenOptions};
use std::path::Path;

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

use crate::config::LoggingSettings;

/// Log to stderr and, when configured, append to the log file.
///
/// Best-effort: an unopenable log file only drops the file logger, and a
/// logger installed earlier in the process is kept.
pub fn init(settings: &LoggingSettings, level_override: Option<LevelFilter>) {
    let level = level_override.unwrap_or_else(|| settings.level_filter());
    let config = ConfigBuilder::new().set_time_format_rfc3339().build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        config.clone(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];
    if let Some(path) = settings.file_path()
        && let Some(file) = open_log_file(&path)
    {
        loggers.push(WriteLogger::new(level, config, file));
    }

    let _ = CombinedLogger::init(loggers);
}

fn open_log_file(path: &Path) -> Option<File> {
    if let Some(dir) = path.parent() {
        let _ = std::fs::create_dir_all(dir);
    }
    OpenOptions::new().create(true).append(true).open(path).ok()
}
