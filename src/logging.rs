use flexi_logger::{
    colored_default_format, opt_format, Cleanup, Criterion, Duplicate, FileSpec,
    FlexiLoggerError, Logger, LoggerHandle, Naming,
};

use crate::config::LoggingSettings;

/// Starts the global logger. `RUST_LOG` wins over the configured level.
///
/// With a log directory configured, records go to rotating files and warnings
/// are duplicated to stderr. The returned handle must be kept alive.
pub fn setup_logging(settings: &LoggingSettings) -> Result<LoggerHandle, FlexiLoggerError> {
    let logger = Logger::try_with_env_or_str(&settings.level)?;

    match &settings.directory {
        Some(directory) => logger
            .log_to_file(
                FileSpec::default()
                    .directory(directory)
                    .basename("tile_merge"),
            )
            .format(opt_format)
            .duplicate_to_stderr(Duplicate::Warn)
            .format_for_stderr(colored_default_format)
            .rotate(
                Criterion::Size(10 * 1024 * 1024), // 10 MB per file
                Naming::Numbers,
                Cleanup::KeepLogFiles(7),
            )
            .start(),
        None => logger.format(colored_default_format).start(),
    }
}
