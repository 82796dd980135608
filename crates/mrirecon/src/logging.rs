use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use clap::ValueEnum;

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> tracing::level_filters::LevelFilter {
        match self {
            LogLevel::Error => tracing::level_filters::LevelFilter::ERROR,
            LogLevel::Warn => tracing::level_filters::LevelFilter::WARN,
            LogLevel::Info => tracing::level_filters::LevelFilter::INFO,
            LogLevel::Debug => tracing::level_filters::LevelFilter::DEBUG,
            LogLevel::Trace => tracing::level_filters::LevelFilter::TRACE,
        }
    }
}

/// Install the global subscriber, writing to `file` (appended) or stderr.
///
/// A log file that cannot be opened falls back to stderr with a warning.
pub fn init_logging(format: LogFormat, level: LogLevel, file: Option<&Path>) {
    let target = file.map(|path| (path, open_log_file(path)));
    match target {
        Some((_, Ok(file))) => install(format, level, Mutex::new(file)),
        Some((path, Err(err))) => {
            install(format, level, std::io::stderr);
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "cannot open log file, using stderr"
            );
        }
        None => install(format, level, std::io::stderr),
    }
}

fn install<W>(format: LogFormat, level: LogLevel, writer: W)
where
    W: for<'a> tracing_subscriber::fmt::MakeWriter<'a> + Send + Sync + 'static,
{
    let builder = tracing_subscriber::fmt()
        .with_writer(writer)
        .with_max_level(level.as_filter())
        .with_ansi(false)
        .with_target(false);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}
