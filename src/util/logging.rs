//! Structured logging setup for the detector
//!
//! Logs go to stderr so that `--format json` output on stdout stays machine
//! readable. `RUST_LOG` takes precedence when set; otherwise a directive for
//! this crate at the configured level is installed.
//!
//! # Example
//!
//! ```no_run
//! use buildpack_detect::util::logging;
//!
//! logging::init_from_env();
//! tracing::info!(group = 0, "Evaluating group");
//! ```

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

const CRATE_TARGET: &str = "buildpack_detect";

/// Configuration for logging initialization
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level for this crate's events
    pub level: Level,

    /// Emit one JSON object per line
    pub use_json: bool,

    /// Include the module target (e.g., buildpack_detect::detect) in logs
    pub include_target: bool,

    /// Include file and line number information
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: true,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// JSON output with source locations, for log collectors.
    pub fn structured() -> Self {
        Self {
            level: Level::INFO,
            use_json: true,
            include_target: true,
            include_location: true,
        }
    }

    fn directive(&self) -> Option<Directive> {
        format!("{}={}", CRATE_TARGET, self.level).parse().ok()
    }
}

/// Parses a log level from a string
///
/// Unknown values fall back to `Level::INFO`.
///
/// ```
/// use buildpack_detect::util::logging::parse_level;
/// use tracing::Level;
///
/// assert_eq!(parse_level("debug"), Level::DEBUG);
/// assert_eq!(parse_level("WARN"), Level::WARN);
/// assert_eq!(parse_level("loud"), Level::INFO);
/// ```
pub fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

/// Builds the event filter for `config`.
///
/// With `RUST_LOG` set, its directives are used as given.
pub fn build_filter(config: &LoggingConfig) -> EnvFilter {
    if env::var("RUST_LOG").is_ok() {
        return EnvFilter::from_default_env();
    }

    let filter = EnvFilter::new("warn");
    match config.directive() {
        Some(directive) => filter.add_directive(directive),
        None => filter,
    }
}

/// Installs the global subscriber. Only the first call has an effect.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = build_filter(&config);

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location),
                )
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location),
                )
                .init();
        }
    });
}

/// Reads `DETECTOR_LOG_LEVEL` and `DETECTOR_LOG_JSON`.
pub fn config_from_env() -> LoggingConfig {
    let level = parse_level(&env::var("DETECTOR_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()));

    let use_json = env::var("DETECTOR_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);

    LoggingConfig {
        level,
        use_json,
        ..Default::default()
    }
}

pub fn init_from_env() {
    init_logging(config_from_env());
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("trace"), Level::TRACE);
        assert_eq!(parse_level("Debug"), Level::DEBUG);
        assert_eq!(parse_level("INFO"), Level::INFO);
        assert_eq!(parse_level("warn"), Level::WARN);
        assert_eq!(parse_level("error"), Level::ERROR);
        assert_eq!(parse_level(""), Level::INFO);
    }

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(!config.use_json);
        assert!(config.include_target);
        assert!(!config.include_location);
    }

    #[test]
    fn test_structured_config() {
        let config = LoggingConfig::structured();
        assert!(config.use_json);
        assert!(config.include_location);
    }

    #[test]
    fn test_directive_names_the_crate() {
        let directive = LoggingConfig::with_level(Level::DEBUG).directive().unwrap();
        assert_eq!(directive.to_string().to_lowercase(), "buildpack_detect=debug");
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        let old_level = env::var("DETECTOR_LOG_LEVEL").ok();
        let old_json = env::var("DETECTOR_LOG_JSON").ok();
        env::set_var("DETECTOR_LOG_LEVEL", "trace");
        env::set_var("DETECTOR_LOG_JSON", "true");

        let config = config_from_env();

        match old_level {
            Some(v) => env::set_var("DETECTOR_LOG_LEVEL", v),
            None => env::remove_var("DETECTOR_LOG_LEVEL"),
        }
        match old_json {
            Some(v) => env::set_var("DETECTOR_LOG_JSON", v),
            None => env::remove_var("DETECTOR_LOG_JSON"),
        }

        assert_eq!(config.level, Level::TRACE);
        assert!(config.use_json);
    }
}
