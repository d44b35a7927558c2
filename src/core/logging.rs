//! Logging backend and fault markers
//!
//! All code logs through the `log` facade; the binary installs `flexi_logger` once via
//! [`init_logging`]. Plugin faults are written at error level with a leading `SEVERE` or
//! `FATAL` marker so they can be grepped (text formats) or filtered on the `marker`
//! field (json format).

use std::fmt;
use std::sync::{Mutex, OnceLock};
use thiserror::Error;

static LOGGER_HANDLE: OnceLock<Mutex<flexi_logger::LoggerHandle>> = OnceLock::new();

/// Marker for a logged fault that leaves the plugin loaded
pub const SEVERE_MARKER: &str = "SEVERE";
/// Marker for a logged fault that unloads the plugin
pub const FATAL_MARKER: &str = "FATAL";
/// Marker for the default classification applied to a panicking hook
pub const UNCLASSIFIED_MARKER: &str = "UNCLASSIFIED";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log specification '{spec}': {source}")]
    InvalidSpec {
        spec: String,
        #[source]
        source: flexi_logger::FlexiLoggerError,
    },

    #[error("failed to start logger: {source}")]
    StartFailed {
        #[source]
        source: flexi_logger::FlexiLoggerError,
    },

    #[error("logger not initialised; call init_logging first")]
    NotInitialised,

    #[error("logger handle lock poisoned")]
    HandlePoisoned,
}

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// `timestamp LVL message`
    #[default]
    Text,
    /// `timestamp LVL message (module/path.rs:line)`
    Extended,
    /// One compact JSON object per line
    Json,
}

impl LogFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "text" => Some(LogFormat::Text),
            "ext" | "extended" => Some(LogFormat::Extended),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Extended => write!(f, "ext"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Options for starting the logger
#[derive(Debug, Clone)]
pub struct LoggingOptions {
    pub level: String,
    pub format: LogFormat,
    pub file: Option<std::path::PathBuf>,
    pub color: bool,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            file: None,
            color: false,
        }
    }
}

/// Start the global logger. Only the first successful call installs a logger.
pub fn init_logging(options: &LoggingOptions) -> Result<(), LoggingError> {
    use flexi_logger::{FileSpec, Logger};

    let mut logger =
        Logger::try_with_str(&options.level).map_err(|source| LoggingError::InvalidSpec {
            spec: options.level.clone(),
            source,
        })?;

    logger = match (options.format, options.color) {
        (LogFormat::Json, _) => logger.format(json_format),
        (LogFormat::Extended, true) => logger.format(extended_color_format),
        (LogFormat::Extended, false) => logger.format(extended_format),
        (LogFormat::Text, true) => logger.format(simple_color_format),
        (LogFormat::Text, false) => logger.format(simple_format),
    };

    if let Some(path) = &options.file {
        let file_spec = FileSpec::try_from(path.as_path())
            .map_err(|source| LoggingError::StartFailed { source })?;
        logger = logger.log_to_file(file_spec);
    }

    let handle = logger
        .start()
        .map_err(|source| LoggingError::StartFailed { source })?;
    let _ = LOGGER_HANDLE.set(Mutex::new(handle));
    Ok(())
}

/// Change the active log level at runtime. Format and file output are fixed at
/// initialisation by flexi_logger.
pub fn reconfigure_level(level: &str) -> Result<(), LoggingError> {
    let handle_mutex = LOGGER_HANDLE.get().ok_or(LoggingError::NotInitialised)?;
    let mut handle = handle_mutex
        .lock()
        .map_err(|_| LoggingError::HandlePoisoned)?;
    handle
        .parse_and_push_temp_spec(level)
        .map_err(|source| LoggingError::InvalidSpec {
            spec: level.to_string(),
            source,
        })
}

/// Log a fault that leaves the plugin loaded
pub fn log_severe(plugin: &str, stage: impl fmt::Display, cause: impl fmt::Display) {
    log::error!("{} [{}] {}: {}", SEVERE_MARKER, plugin, stage, cause);
}

/// Log a fault that unloads the plugin
pub fn log_fatal(plugin: &str, stage: impl fmt::Display, cause: impl fmt::Display) {
    log::error!("{} [{}] {}: {}", FATAL_MARKER, plugin, stage, cause);
}

/// Warn that a fault had no classification and the Severe default was applied
pub fn log_unclassified(plugin: &str, stage: impl fmt::Display, cause: impl fmt::Display) {
    log::warn!(
        "{} [{}] {}: unclassified fault treated as {}: {}",
        UNCLASSIFIED_MARKER,
        plugin,
        stage,
        SEVERE_MARKER,
        cause
    );
}

fn level_abbr(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "ERR",
        log::Level::Warn => "WRN",
        log::Level::Info => "INF",
        log::Level::Debug => "DBG",
        log::Level::Trace => "TRC",
    }
}

/// Split a leading fault marker off a message, if present
fn split_marker(message: &str) -> (Option<&'static str>, &str) {
    for marker in [SEVERE_MARKER, FATAL_MARKER, UNCLASSIFIED_MARKER] {
        if let Some(rest) = message.strip_prefix(marker) {
            if let Some(rest) = rest.strip_prefix(' ') {
                return (Some(marker), rest);
            }
        }
    }
    (None, message)
}

fn simple_format(
    w: &mut dyn std::io::Write,
    now: &mut flexi_logger::DeferredNow,
    record: &log::Record,
) -> Result<(), std::io::Error> {
    write!(
        w,
        "{} {} {}",
        now.format("%Y-%m-%d %H:%M:%S%.3f"),
        level_abbr(record.level()),
        record.args()
    )
}

fn simple_color_format(
    w: &mut dyn std::io::Write,
    now: &mut flexi_logger::DeferredNow,
    record: &log::Record,
) -> Result<(), std::io::Error> {
    use colored::Colorize;

    write!(
        w,
        "{} {} {}",
        now.format("%Y-%m-%d %H:%M:%S%.3f").to_string().dimmed(),
        colored_level(record.level()),
        colored_message(&record.args().to_string())
    )
}

fn extended_format(
    w: &mut dyn std::io::Write,
    now: &mut flexi_logger::DeferredNow,
    record: &log::Record,
) -> Result<(), std::io::Error> {
    write!(
        w,
        "{} {} {} ({})",
        now.format("%Y-%m-%d %H:%M:%S%.3f"),
        level_abbr(record.level()),
        record.args(),
        format_target_as_path(record.target(), record.line())
    )
}

fn extended_color_format(
    w: &mut dyn std::io::Write,
    now: &mut flexi_logger::DeferredNow,
    record: &log::Record,
) -> Result<(), std::io::Error> {
    use colored::Colorize;

    write!(
        w,
        "{} {} {} ({})",
        now.format("%Y-%m-%d %H:%M:%S%.3f").to_string().dimmed(),
        colored_level(record.level()),
        colored_message(&record.args().to_string()),
        format_target_as_path(record.target(), record.line()).dimmed()
    )
}

fn json_format(
    w: &mut dyn std::io::Write,
    now: &mut flexi_logger::DeferredNow,
    record: &log::Record,
) -> Result<(), std::io::Error> {
    use serde_json::json;

    let message = record.args().to_string();
    let (marker, text) = split_marker(&message);

    let mut json_obj = json!({
        "timestamp": now.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        "level": level_abbr(record.level()),
        "message": text,
        "target": format_target_as_path(record.target(), record.line()),
    });
    if let Some(marker) = marker {
        json_obj["marker"] = json!(marker);
    }

    match serde_json::to_string(&json_obj) {
        Ok(line) => w.write_all(line.as_bytes()),
        Err(_) => w.write_all(b"{\"error\":\"Failed to serialize log message\"}"),
    }
}

fn colored_level(level: log::Level) -> colored::ColoredString {
    use colored::Colorize;
    match level {
        log::Level::Error => "ERR".red().bold(),
        log::Level::Warn => "WRN".yellow(),
        log::Level::Info => "INF".green(),
        log::Level::Debug => "DBG".blue(),
        log::Level::Trace => "TRC".magenta(),
    }
}

fn colored_message(message: &str) -> String {
    use colored::Colorize;
    match split_marker(message) {
        (Some(marker), rest) if marker == FATAL_MARKER => {
            format!("{} {}", marker.on_red().white().bold(), rest)
        }
        (Some(marker), rest) => format!("{} {}", marker.red().bold(), rest),
        (None, _) => message.to_string(),
    }
}

// plughost::host::stage -> host/stage.rs:42
fn format_target_as_path(target: &str, line: Option<u32>) -> String {
    let path_like = match target.strip_prefix("plughost::") {
        Some(module) => module.replace("::", "/") + ".rs",
        None => target.replace("::", "/"),
    };

    match line {
        Some(line_num) => format!("{}:{}", path_like, line_num),
        None => path_like,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flexi_logger::DeferredNow;
    use serial_test::serial;

    fn render(
        formatter: fn(
            &mut dyn std::io::Write,
            &mut DeferredNow,
            &log::Record,
        ) -> Result<(), std::io::Error>,
        target: &str,
        message: &str,
    ) -> String {
        let mut buffer = Vec::new();
        let mut now = DeferredNow::new();
        formatter(
            &mut buffer,
            &mut now,
            &log::Record::builder()
                .level(log::Level::Error)
                .target(target)
                .line(Some(12))
                .args(format_args!("{}", message))
                .build(),
        )
        .unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("EXT"), Some(LogFormat::Extended));
        assert_eq!(LogFormat::parse("text"), Some(LogFormat::Text));
        assert_eq!(LogFormat::parse("yaml"), None);
    }

    #[test]
    fn test_split_marker() {
        assert_eq!(
            split_marker("FATAL [ping] init: boom"),
            (Some(FATAL_MARKER), "[ping] init: boom")
        );
        assert_eq!(split_marker("SEVEREST"), (None, "SEVEREST"));
        assert_eq!(split_marker("plain"), (None, "plain"));
    }

    #[test]
    fn test_extended_format_includes_path() {
        let output = render(extended_format, "plughost::host::stage", "hello");
        assert!(output.contains("ERR hello"), "got: {}", output);
        assert!(output.ends_with("(host/stage.rs:12)"), "got: {}", output);
    }

    #[test]
    fn test_json_format_exposes_marker() {
        let output = render(json_format, "plughost::host", "SEVERE [greeter] pre-init: slow");
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["marker"], "SEVERE");
        assert_eq!(value["message"], "[greeter] pre-init: slow");
        assert_eq!(value["level"], "ERR");
    }

    #[test]
    fn test_json_format_without_marker() {
        let output = render(json_format, "other::crate", "just text");
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert!(value.get("marker").is_none());
        assert_eq!(value["target"], "other/crate:12");
    }

    #[test]
    #[serial]
    fn test_reconfigure_before_init_fails_or_succeeds_consistently() {
        // Another test binary may already have installed the logger
        match reconfigure_level("debug") {
            Ok(()) | Err(LoggingError::NotInitialised) => {}
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    #[serial]
    fn test_init_then_reconfigure_level() {
        let options = LoggingOptions {
            level: "warn".to_string(),
            ..LoggingOptions::default()
        };
        // Only one logger per process; a second start reports StartFailed
        match init_logging(&options) {
            Ok(()) | Err(LoggingError::StartFailed { .. }) => {}
            Err(other) => panic!("unexpected error: {}", other),
        }

        if LOGGER_HANDLE.get().is_some() {
            reconfigure_level("debug").unwrap();
            reconfigure_level("warn").unwrap();
        }
    }
}
