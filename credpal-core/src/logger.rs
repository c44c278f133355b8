use std::sync::{Arc, OnceLock};

/// Trait representing a logger that can receive the credential layer's log messages.
///
/// Implement it to route records into the platform's own logging facility
/// (a UART console, a syslog, a host application's logger).
///
/// # Examples
///
/// Implementing the `Logger` trait:
///
/// ```rust
/// use credpal_core::logger::{LogLevel, Logger};
///
/// struct ConsoleLogger;
///
/// impl Logger for ConsoleLogger {
///     fn log(&self, level: LogLevel, message: String) {
///         println!("[{level:?}] {message}");
///     }
/// }
/// ```
pub trait Logger: Sync + Send {
    /// Logs a message at the specified log level.
    ///
    /// # Arguments
    ///
    /// * `level` - The severity level of the log message.
    /// * `message` - The log message to be recorded.
    fn log(&self, level: LogLevel, message: String);
}

/// Enumeration of possible log levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Designates very low priority, often extremely detailed messages.
    Trace,
    /// Designates lower priority debugging information.
    Debug,
    /// Designates informational messages, such as a successful volume bootstrap.
    Info,
    /// Designates potentially harmful situations, such as a recovery format.
    Warn,
    /// Designates failed credential operations.
    Error,
}

/// Forwards `log` records to the [`Logger`] installed with [`set_logger`].
struct ForeignLogger;

impl log::Log for ForeignLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        if !should_forward(record.level(), record.module_path()) {
            return;
        }

        if let Some(logger) = LOGGER_INSTANCE.get() {
            logger.log(log_level(record.level()), format!("{}", record.args()));
        } else {
            eprintln!("Logger not set: {}", record.args());
        }
    }

    fn flush(&self) {}
}

/// Debug and trace records are only forwarded from this crate; other
/// crates contribute info and above.
fn should_forward(level: log::Level, module_path: Option<&str>) -> bool {
    let is_from_credpal = module_path.is_some_and(|path| path.starts_with("credpal"));
    let is_debug_or_trace = level == log::Level::Debug || level == log::Level::Trace;
    is_from_credpal || !is_debug_or_trace
}

/// Maps a `log::Level` to a [`LogLevel`].
const fn log_level(level: log::Level) -> LogLevel {
    match level {
        log::Level::Error => LogLevel::Error,
        log::Level::Warn => LogLevel::Warn,
        log::Level::Info => LogLevel::Info,
        log::Level::Debug => LogLevel::Debug,
        log::Level::Trace => LogLevel::Trace,
    }
}

static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Sets the global logger.
///
/// Call once during start-up, before [`crate::initialize_storage`], so the
/// bootstrap messages are captured. Later calls are ignored.
pub fn set_logger(logger: Arc<dyn Logger>) {
    if LOGGER_INSTANCE.set(logger).is_err() {
        eprintln!("Logger already set");
        return;
    }

    if let Err(e) = init_logger() {
        eprintln!("Failed to set logger: {e}");
    }
}

/// Installs [`ForeignLogger`] as the `log` backend.
///
/// # Errors
///
/// Returns a `log::SetLoggerError` if another `log` backend is already installed.
fn init_logger() -> Result<(), log::SetLoggerError> {
    static LOGGER: ForeignLogger = ForeignLogger;
    log::set_logger(&LOGGER)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}
