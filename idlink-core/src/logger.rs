//! Bridge from the `log` facade to a host-provided logger.

use std::sync::{Arc, OnceLock};

/// Receives log messages emitted by the library.
///
/// Hosts implement this to route the library's diagnostics into their own
/// logging system. With the `ffi` feature it is exported through `UniFFI`.
///
/// # Examples
///
/// ```rust
/// use idlink_core::logger::{LogLevel, Logger};
///
/// struct StderrLogger;
///
/// impl Logger for StderrLogger {
///     fn log(&self, level: LogLevel, message: String) {
///         eprintln!("[{level:?}] {message}");
///     }
/// }
/// ```
///
/// ## Kotlin
///
/// ```kotlin
/// object IdlinkLogBridge : Logger {
///     override fun log(level: LogLevel, message: String) {
///         Log.println(level.toPriority(), "idlink", message)
///     }
/// }
///
/// setLogger(IdlinkLogBridge) // once, at startup
/// ```
#[cfg_attr(feature = "ffi", uniffi::export(with_foreign))]
pub trait Logger: Sync + Send {
    /// Logs `message` at `level`.
    fn log(&self, level: LogLevel, message: String);
}

/// Severity of a log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum LogLevel {
    /// Very detailed tracing.
    Trace,
    /// Debugging information.
    Debug,
    /// Progress of association operations.
    Info,
    /// Refused or suspicious operations.
    Warn,
    /// Failures.
    Error,
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warn,
            log::Level::Info => Self::Info,
            log::Level::Debug => Self::Debug,
            log::Level::Trace => Self::Trace,
        }
    }
}

/// Forwards `log` records to the registered [`Logger`].
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
            logger.log(record.level().into(), record.args().to_string());
        } else {
            eprintln!("Logger not set: {}", record.args());
        }
    }

    fn flush(&self) {}
}

/// Debug and trace records are only forwarded from this library's own modules.
fn should_forward(level: log::Level, module_path: Option<&str>) -> bool {
    let is_verbose = matches!(level, log::Level::Debug | log::Level::Trace);
    !is_verbose || module_path.is_some_and(|path| path.starts_with("idlink"))
}

static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Registers the process-wide logger.
///
/// Only the first call takes effect; later calls print a notice and return.
#[cfg_attr(feature = "ffi", uniffi::export)]
pub fn set_logger(logger: Arc<dyn Logger>) {
    if LOGGER_INSTANCE.set(logger).is_err() {
        eprintln!("Logger already set");
        return;
    }

    if let Err(e) = init_logger() {
        eprintln!("Failed to set logger: {e}");
    }
}

fn init_logger() -> Result<(), log::SetLoggerError> {
    static LOGGER: ForeignLogger = ForeignLogger;
    log::set_logger(&LOGGER)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_forward() {
        assert!(should_forward(log::Level::Info, Some("hyper::client")));
        assert!(should_forward(log::Level::Warn, None));
        assert!(should_forward(
            log::Level::Debug,
            Some("idlink_core::authorizer")
        ));
        assert!(!should_forward(log::Level::Debug, Some("hyper::client")));
        assert!(!should_forward(log::Level::Trace, None));
    }

    #[test]
    fn test_level_mapping() {
        assert_eq!(LogLevel::from(log::Level::Warn), LogLevel::Warn);
        assert_eq!(LogLevel::from(log::Level::Trace), LogLevel::Trace);
    }
}
