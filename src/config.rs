//! Configuration for the detector
//!
//! Settings are loaded from environment variables with platform defaults and
//! can be overridden by command line flags.
//!
//! # Environment Variables
//!
//! ## Platform paths
//! - `CNB_APP_DIR`: application source - default: "/workspace"
//! - `CNB_PLATFORM_DIR`: platform directory - default: "/platform"
//! - `CNB_BUILDPACKS_DIR`: buildpack store - default: "/cnb/buildpacks"
//! - `CNB_EXTENSIONS_DIR`: extension store - default: "/cnb/extensions"
//! - `CNB_ORDER_PATH`: order file - default: "/cnb/order.toml"
//! - `CNB_GROUP_PATH`: resolved group output - default: "/layers/group.toml"
//! - `CNB_PLAN_PATH`: build plan output - default: "/layers/plan.toml"
//! - `CNB_DEPRECATION_MODE`: quiet|warn|error - default: "warn"
//!
//! ## Detector
//! - `DETECTOR_PROBE_TIMEOUT`: per-probe timeout in seconds - default: "60"
//! - `DETECTOR_MAX_CONCURRENT_PROBES`: probes running at once - default: number of CPUs
//! - `DETECTOR_FATAL_POLICY`: next|abort - default: "next"
//! - `DETECTOR_LOG_LEVEL`: logging level - default: "info"
//!
//! # Example
//!
//! ```no_run
//! use buildpack_detect::DetectorConfig;
//!
//! let config = DetectorConfig::default();
//! config.validate().expect("Invalid configuration");
//! println!("{}", config);
//! ```

use crate::api::DeprecationMode;
use crate::detect::{default_max_concurrent_probes, FatalPolicy};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_APP_DIR: &str = "/workspace";
const DEFAULT_PLATFORM_DIR: &str = "/platform";
const DEFAULT_BUILDPACKS_DIR: &str = "/cnb/buildpacks";
const DEFAULT_EXTENSIONS_DIR: &str = "/cnb/extensions";
const DEFAULT_ORDER_PATH: &str = "/cnb/order.toml";
const DEFAULT_GROUP_PATH: &str = "/layers/group.toml";
const DEFAULT_PLAN_PATH: &str = "/layers/plan.toml";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 60;
const MAX_PROBE_TIMEOUT_SECS: u64 = 3600;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// Failed to parse configuration value
    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub app_dir: PathBuf,
    pub platform_dir: PathBuf,
    pub buildpacks_dir: PathBuf,
    pub extensions_dir: PathBuf,
    pub order_path: PathBuf,
    pub group_path: PathBuf,
    pub plan_path: PathBuf,
    pub deprecation_mode: DeprecationMode,
    pub probe_timeout_secs: u64,
    pub max_concurrent_probes: usize,
    pub fatal_policy: FatalPolicy,
    pub log_level: String,
}

fn path_var(key: &str, default: &str) -> PathBuf {
    env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

impl Default for DetectorConfig {
    /// Loads the configuration from the environment, falling back to defaults
    /// for missing or unparsable values. Use [`DetectorConfig::from_env`] to
    /// surface parse errors instead.
    fn default() -> Self {
        Self::from_env_lossy()
    }
}

impl DetectorConfig {
    fn from_env_lossy() -> Self {
        Self {
            app_dir: path_var("CNB_APP_DIR", DEFAULT_APP_DIR),
            platform_dir: path_var("CNB_PLATFORM_DIR", DEFAULT_PLATFORM_DIR),
            buildpacks_dir: path_var("CNB_BUILDPACKS_DIR", DEFAULT_BUILDPACKS_DIR),
            extensions_dir: path_var("CNB_EXTENSIONS_DIR", DEFAULT_EXTENSIONS_DIR),
            order_path: path_var("CNB_ORDER_PATH", DEFAULT_ORDER_PATH),
            group_path: path_var("CNB_GROUP_PATH", DEFAULT_GROUP_PATH),
            plan_path: path_var("CNB_PLAN_PATH", DEFAULT_PLAN_PATH),
            deprecation_mode: env::var("CNB_DEPRECATION_MODE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            probe_timeout_secs: env::var("DETECTOR_PROBE_TIMEOUT")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(DEFAULT_PROBE_TIMEOUT_SECS),
            max_concurrent_probes: env::var("DETECTOR_MAX_CONCURRENT_PROBES")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or_else(default_max_concurrent_probes),
            fatal_policy: env::var("DETECTOR_FATAL_POLICY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            log_level: env::var("DETECTOR_LOG_LEVEL")
                .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
                .to_lowercase(),
        }
    }

    /// Like `default()`, but a variable that is set and cannot be parsed is an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self::from_env_lossy();

        fn check<T, E: fmt::Display>(field: &str, parse: impl FnOnce(&str) -> Result<T, E>) -> Result<(), ConfigError> {
            match env::var(field) {
                Ok(value) => parse(&value).map(|_| ()).map_err(|e| ConfigError::ParseError {
                    field: field.to_string(),
                    error: e.to_string(),
                }),
                Err(_) => Ok(()),
            }
        }

        check("CNB_DEPRECATION_MODE", |v| v.parse::<DeprecationMode>())?;
        check("DETECTOR_PROBE_TIMEOUT", |v| v.parse::<u64>())?;
        check("DETECTOR_MAX_CONCURRENT_PROBES", |v| v.parse::<usize>())?;
        check("DETECTOR_FATAL_POLICY", |v| v.parse::<FatalPolicy>())?;

        Ok(config)
    }

    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the timeout or concurrency bound is out of range
    /// or the log level is unknown
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.probe_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Probe timeout must be at least 1 second".to_string(),
            ));
        }
        if self.probe_timeout_secs > MAX_PROBE_TIMEOUT_SECS {
            return Err(ConfigError::ValidationFailed(
                "Probe timeout cannot exceed 1 hour".to_string(),
            ));
        }

        if self.max_concurrent_probes == 0 {
            return Err(ConfigError::ValidationFailed(
                "At least one probe must be allowed to run".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

impl fmt::Display for DetectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Detector Configuration:")?;
        writeln!(f, "  App Dir: {}", self.app_dir.display())?;
        writeln!(f, "  Platform Dir: {}", self.platform_dir.display())?;
        writeln!(f, "  Buildpacks Dir: {}", self.buildpacks_dir.display())?;
        writeln!(f, "  Extensions Dir: {}", self.extensions_dir.display())?;
        writeln!(f, "  Order: {}", self.order_path.display())?;
        writeln!(f, "  Group Output: {}", self.group_path.display())?;
        writeln!(f, "  Plan Output: {}", self.plan_path.display())?;
        writeln!(f, "  Deprecation Mode: {}", self.deprecation_mode)?;
        writeln!(f, "  Probe Timeout: {}s", self.probe_timeout_secs)?;
        writeln!(f, "  Max Concurrent Probes: {}", self.max_concurrent_probes)?;
        writeln!(f, "  Fatal Policy: {}", self.fatal_policy)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}
