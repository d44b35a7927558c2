//! Command line arguments
//!
//! Flags override values from the configuration file; anything left unset falls
//! back to the file, then to built-in defaults.

use crate::core::logging::{LogFormat, LoggingOptions};
use crate::core::styles::help_styles;
use crate::host::api::{CommandConflict, ConfigError, ConfigResult, HostConfig, LoggingConfig};
use clap::{ArgAction, Parser};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "plughost")]
#[command(about = "Extension host for chat-platform plugins")]
#[command(version)]
#[command(after_help = " * can be specified multiple times or as a comma-separated list")]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long = "config-file", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Log level
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", value_parser = ["trace", "debug", "info", "warn", "error", "off"])]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(short = 'o', long = "log-format", value_name = "FORMAT", value_parser = ["text", "ext", "json"])]
    pub log_format: Option<String>,

    #[arg(
        short = 'f',
        long = "log-file",
        value_name = "FILE",
        help = "Log file path (use 'none' to disable file logging)"
    )]
    pub log_file: Option<PathBuf>,

    /// Force coloured output
    #[arg(long = "color")]
    pub color: bool,

    /// Disable coloured output
    #[arg(long = "no-color", conflicts_with = "color")]
    pub no_color: bool,

    /// Upper bound on concurrently running plugin tasks
    #[arg(short = 'j', long = "max-parallelism", value_name = "N", value_parser = parse_parallelism)]
    pub max_parallelism: Option<usize>,

    /// How to resolve duplicate command names
    #[arg(long = "command-conflict", value_name = "POLICY")]
    pub command_conflict: Option<CommandConflict>,

    /// Plugins to exclude from discovery*
    #[arg(long = "exclude-plugin", value_name = "NAMES", action = ArgAction::Append, value_delimiter = ',')]
    pub exclude_plugins: Vec<String>,

    /// List discovered plugins and exit
    #[arg(long = "list-plugins")]
    pub list_plugins: bool,
}

impl Args {
    /// Parse the process arguments, colouring help output when appropriate
    pub fn parse_from_env() -> Self {
        use clap::{CommandFactory, FromArgMatches};

        let color = !no_color_requested() && std::io::stdout().is_terminal();
        let matches = Self::command().styles(help_styles(color)).get_matches();
        match Self::from_arg_matches(&matches) {
            Ok(args) => args,
            Err(error) => error.exit(),
        }
    }

    /// `--color` wins, then `--no-color` / `NO_COLOR`, then TTY detection
    pub fn use_color(&self) -> bool {
        if self.color {
            true
        } else if self.no_color || no_color_requested() {
            false
        } else {
            std::io::stdout().is_terminal()
        }
    }

    /// Overlay the flags that were given on top of `config`
    pub fn apply_to(&self, config: &mut HostConfig) {
        if let Some(max_parallelism) = self.max_parallelism {
            config.max_parallelism = max_parallelism;
        }
        if let Some(policy) = self.command_conflict {
            config.command_conflict = policy;
        }
        for name in &self.exclude_plugins {
            let name = name.trim();
            if !name.is_empty() && !config.disabled.iter().any(|d| d == name) {
                config.disabled.push(name.to_string());
            }
        }
        if let Some(level) = &self.log_level {
            config.logging.level = Some(level.clone());
        }
        if let Some(format) = &self.log_format {
            config.logging.format = Some(format.clone());
        }
        if let Some(file) = &self.log_file {
            config.logging.file = if disables_file_logging(file) {
                None
            } else {
                Some(file.clone())
            };
        }
    }
}

/// Logger options from the merged logging settings
pub fn logging_options(config: &LoggingConfig, color: bool) -> ConfigResult<LoggingOptions> {
    let format = match config.format.as_deref() {
        None => LogFormat::default(),
        Some(value) => LogFormat::parse(value).ok_or_else(|| ConfigError::InvalidValue {
            key: "logging.format".to_string(),
            reason: format!("'{}' is not one of text, ext, json", value),
        })?,
    };
    Ok(LoggingOptions {
        level: config
            .level
            .clone()
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        format,
        file: config.file.clone(),
        color,
    })
}

fn parse_parallelism(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

fn disables_file_logging(file: &Path) -> bool {
    let text = file.to_string_lossy();
    text.eq_ignore_ascii_case("none") || text == "-"
}

fn no_color_requested() -> bool {
    std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("plughost").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert_eq!(args.config_file, None);
        assert_eq!(args.max_parallelism, None);
        assert!(args.exclude_plugins.is_empty());
        assert!(!args.list_plugins);
    }

    #[test]
    fn test_flags() {
        let args = parse(&[
            "--config-file",
            "/etc/plughost.toml",
            "-j",
            "3",
            "--log-level",
            "debug",
            "--log-format",
            "json",
            "--exclude-plugin",
            "greeter,audit-log",
            "--exclude-plugin",
            "ping",
            "--command-conflict",
            "namespace",
            "--list-plugins",
        ]);

        assert_eq!(args.config_file, Some(PathBuf::from("/etc/plughost.toml")));
        assert_eq!(args.max_parallelism, Some(3));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert_eq!(args.exclude_plugins, vec!["greeter", "audit-log", "ping"]);
        assert_eq!(args.command_conflict, Some(CommandConflict::Namespace));
        assert!(args.list_plugins);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let zero = ["plughost", "--max-parallelism", "0"];
        assert!(Args::try_parse_from(zero).is_err());

        let level = ["plughost", "--log-level", "loud"];
        assert!(Args::try_parse_from(level).is_err());

        let both = ["plughost", "--color", "--no-color"];
        assert!(Args::try_parse_from(both).is_err());

        let policy = ["plughost", "--command-conflict", "last-wins"];
        assert!(Args::try_parse_from(policy).is_err());
    }

    #[test]
    fn test_color_flags() {
        assert!(parse(&["--color"]).use_color());
        assert!(!parse(&["--no-color"]).use_color());
    }

    #[test]
    fn test_apply_overrides_file_values() {
        let mut config = HostConfig::from_toml_str(
            r#"
            [host]
            max_parallelism = 8
            disabled = ["greeter"]

            [logging]
            level = "warn"
            file = "/var/log/plughost.log"
            "#,
        )
        .unwrap();

        parse(&[
            "-j",
            "2",
            "--exclude-plugin",
            "greeter,ping",
            "--log-file",
            "none",
        ])
        .apply_to(&mut config);

        assert_eq!(config.max_parallelism, 2);
        assert_eq!(config.disabled, vec!["greeter", "ping"]);
        assert_eq!(config.logging.level.as_deref(), Some("warn"));
        assert_eq!(config.logging.file, None);
    }

    #[test]
    fn test_unset_flags_keep_file_values() {
        let mut config = HostConfig::from_toml_str("[host]\nmax_parallelism = 6\n").unwrap();
        parse(&[]).apply_to(&mut config);
        assert_eq!(config.max_parallelism, 6);
        assert_eq!(config.command_conflict, CommandConflict::FirstWins);
    }

    #[test]
    fn test_logging_options() {
        let options = logging_options(&LoggingConfig::default(), false).unwrap();
        assert_eq!(options.level, "info");
        assert_eq!(options.format, LogFormat::Text);

        let config = LoggingConfig {
            level: Some("debug".to_string()),
            format: Some("ext".to_string()),
            file: None,
        };
        let options = logging_options(&config, true).unwrap();
        assert_eq!(options.level, "debug");
        assert_eq!(options.format, LogFormat::Extended);
        assert!(options.color);

        let bad = LoggingConfig {
            format: Some("xml".to_string()),
            ..LoggingConfig::default()
        };
        assert!(matches!(
            logging_options(&bad, false),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "logging.format"
        ));
    }
}
