// Import local time formatting tools from chrono
use chrono::Local;

// Set the global log level (e.g., Debug, Info, Warn, Error)
use log::LevelFilter;

// Set up the dispatch builder for combining logger outputs
use fern::Dispatch;
use fern::colors::{Color, ColoredLevelConfig};

// Standard I/O and filesystem operations (stdout, file creation)
use std::{fs, io};

// Used to initialize a static value only once in a thread-safe way
use std::sync::OnceLock;

use crate::config::LoggerConfig;

/// A simple Logger struct that wraps the logging macros.
/// Clonable to allow use across multiple threads/tasks.
#[derive(Clone, Default)]
pub struct Logger;

impl Logger {
    /// Logs a message at DEBUG level
    pub fn debug(&self, msg: &str) {
        log::debug!("{}", msg);
    }

    /// Logs a message at INFO level
    pub fn info(&self, msg: &str) {
        log::info!("{}", msg);
    }

    /// Logs a message at WARN level
    pub fn warn(&self, msg: &str) {
        log::warn!("{}", msg);
    }

    /// Logs a message at ERROR level
    pub fn error(&self, msg: &str) {
        log::error!("{}", msg);
    }
}

/// Static global LOGGER instance, initialized once
static LOGGER: OnceLock<Logger> = OnceLock::new();

/// Initialize the global logger exactly once, according to the provided
/// settings. After this call, every `log::debug!/info!/warn!/error!` (and
/// the `Logger` methods) goes through the configured fern dispatcher.
/// Later calls return the same handle without touching the dispatcher.
pub fn init_logger(name: &str, cfg: &LoggerConfig) -> Logger {
    LOGGER
        .get_or_init(|| {
            // Parse the configured level string into a log::LevelFilter.
            // If parsing fails, we default to Debug (most verbose).
            let level = cfg
                .log_level
                .parse::<LevelFilter>()
                .unwrap_or(LevelFilter::Debug);

            // Build the base fern::Dispatch with the global minimum level
            let mut base = Dispatch::new().level(level);

            // Console branch: timestamp, name, colored level, message,
            // piped to stdout.
            if cfg.enable_console_log {
                let colors = ColoredLevelConfig::new()
                    .info(Color::Green)
                    .warn(Color::Yellow)
                    .error(Color::Red)
                    .debug(Color::Blue);

                let nm = name.to_string();
                let datefmt = cfg.date_format.clone();

                base = base.chain(
                    Dispatch::new()
                        .format(move |out, message, record| {
                            out.finish(format_args!(
                                "{} - {} - {} - {}",
                                Local::now().format(&datefmt),
                                nm,
                                colors.color(record.level()),
                                message
                            ))
                        })
                        .chain(io::stdout()),
                );
            }

            // File branch: plain text or JSON envelopes, written to
            // "<log_file_path>/<name>.log".
            if cfg.enable_file_log {
                // Ensure the directory exists (no-op if empty or already present)
                if !cfg.log_file_path.is_empty() {
                    let _ = fs::create_dir_all(&cfg.log_file_path);
                }

                let nm = name.to_string();
                let datefmt = cfg.date_format.clone();
                let enable_json = cfg.enable_json_log;

                // Compute the logfile path
                let filepath = if cfg.log_file_path.is_empty() {
                    format!("{}.log", nm.replace('.', "_"))
                } else {
                    format!("{}/{}.log", cfg.log_file_path, nm.replace('.', "_"))
                };

                let log_format_file = move |out: fern::FormatCallback,
                                            message: &std::fmt::Arguments,
                                            record: &log::Record| {
                    if enable_json {
                        let envelope = serde_json::json!({
                            "timestamp": Local::now().format(&datefmt).to_string(),
                            "name":      nm,
                            "level":     record.level().to_string(),
                            "message":   message.to_string(),
                        });
                        out.finish(format_args!("{}", envelope))
                    } else {
                        out.finish(format_args!(
                            "{} - {} - {} - {}",
                            Local::now().format(&datefmt),
                            nm,
                            record.level(),
                            message
                        ))
                    }
                };

                // Attempt to open the logfile, but don't panic; fall back
                // to a sink on error.
                let file_output: Box<dyn io::Write + Send> = match fern::log_file(&filepath) {
                    Ok(fh) => Box::new(fh),
                    Err(err) => {
                        eprintln!("Warning: could not open log file {}: {}", filepath, err);
                        Box::new(io::sink())
                    }
                };

                base = base.chain(Dispatch::new().format(log_format_file).chain(file_output));
            }

            // Apply the composed dispatcher as the global logger. Another
            // logger may already be installed (e.g. in tests); warn and
            // carry on rather than aborting.
            if let Err(err) = base.apply() {
                eprintln!("Warning: logger already initialized: {}", err);
            }

            // Return our zero-sized Logger handle
            Logger
        })
        .clone()
}
