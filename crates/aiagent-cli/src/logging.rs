//! Console and file logging.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use aiagent_core::Settings;

/// Keep at most this many rotated log files.
const MAX_LOG_FILES: usize = 5;

/// Install the global subscriber: console plus `{LOG_DIR}/{LOG_FILE}`.
///
/// The returned guard flushes the file writer on drop; hold it for the life
/// of the process.
pub fn init(settings: &Settings, verbose: bool) -> anyhow::Result<WorkerGuard> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    std::fs::create_dir_all(&settings.log_dir)?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(settings.log_file.as_str())
        .max_log_files(MAX_LOG_FILES)
        .build(&settings.log_dir)?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();

    Ok(guard)
}
