use super::commands::DetectArgs;
use super::output::{OutputFormat, OutputFormatter};
use crate::api::ApiSet;
use crate::config::DetectorConfig;
use crate::detect::{DetectError, GroupEvaluator, OrderResolver};
use crate::env::BuildEnv;
use crate::order::OrderDocument;
use crate::output::write_result;
use crate::probe::{ProbeInputs, ProcessProbeRunner};
use crate::progress::LoggingHandler;
use crate::store::DirStore;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_GENERIC: i32 = 1;
pub const EXIT_INCOMPATIBLE_API: i32 = 12;
pub const EXIT_FAILED_DETECT: i32 = 20;
pub const EXIT_FAILED_DETECT_WITH_ERRORS: i32 = 21;
pub const EXIT_DETECT_ERROR: i32 = 22;
pub const EXIT_INTERRUPTED: i32 = 130;

/// Applies command line overrides on top of the environment configuration.
pub fn build_config(args: &DetectArgs) -> Result<DetectorConfig, crate::config::ConfigError> {
    let base = DetectorConfig::from_env()?;
    let config = DetectorConfig {
        app_dir: args.app_dir.clone().unwrap_or(base.app_dir),
        platform_dir: args.platform_dir.clone().unwrap_or(base.platform_dir),
        buildpacks_dir: args.buildpacks_dir.clone().unwrap_or(base.buildpacks_dir),
        extensions_dir: args.extensions_dir.clone().unwrap_or(base.extensions_dir),
        order_path: args.order_path.clone().unwrap_or(base.order_path),
        group_path: args.group_path.clone().unwrap_or(base.group_path),
        plan_path: args.plan_path.clone().unwrap_or(base.plan_path),
        deprecation_mode: args.deprecation_mode.map(Into::into).unwrap_or(base.deprecation_mode),
        probe_timeout_secs: args.probe_timeout.unwrap_or(base.probe_timeout_secs),
        max_concurrent_probes: args.max_concurrent_probes.unwrap_or(base.max_concurrent_probes),
        fatal_policy: args.fatal_policy.map(Into::into).unwrap_or(base.fatal_policy),
        log_level: base.log_level,
    };
    config.validate()?;
    Ok(config)
}

/// Maps a resolve error to the platform exit code.
pub fn exit_code(err: &DetectError) -> i32 {
    match err {
        DetectError::NoGroupDetected(report) if report.has_errors() => EXIT_FAILED_DETECT_WITH_ERRORS,
        DetectError::NoGroupDetected(_) => EXIT_FAILED_DETECT,
        DetectError::Fatal { .. } => EXIT_DETECT_ERROR,
        DetectError::Cancelled => EXIT_INTERRUPTED,
        e if e.is_incompatible_api() => EXIT_INCOMPATIBLE_API,
        _ => EXIT_DETECT_ERROR,
    }
}

pub async fn handle_detect(args: &DetectArgs, quiet: bool, verbose: bool, cancel: CancellationToken) -> i32 {
    info!("Starting buildpack detection");

    let config = match build_config(args) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            eprintln!("\nPlease check your environment variables and command-line arguments.");
            return EXIT_GENERIC;
        }
    };
    let formatter = OutputFormatter::new(OutputFormat::from(args.format));
    if verbose {
        debug!("{}", formatter.format_config(&config));
    }

    if !config.app_dir.is_dir() {
        error!("Application directory does not exist: {}", config.app_dir.display());
        return EXIT_GENERIC;
    }

    let document = match OrderDocument::read(&config.order_path) {
        Ok(document) => document,
        Err(e) => {
            error!("Failed to read order: {}", e);
            return EXIT_DETECT_ERROR;
        }
    };

    let store = DirStore::new(&config.buildpacks_dir).with_extensions(&config.extensions_dir);
    let inputs = ProbeInputs::new(&config.app_dir, &config.platform_dir, BuildEnv::from_process());
    let evaluator = GroupEvaluator::new(
        Arc::new(store),
        Arc::new(ProcessProbeRunner::new(config.probe_timeout())),
        inputs,
    )
    .with_apis(ApiSet::buildpack())
    .with_deprecation_mode(config.deprecation_mode)
    .with_max_concurrent(config.max_concurrent_probes)
    .with_progress(Arc::new(LoggingHandler));
    let resolver = OrderResolver::new(evaluator).with_policy(config.fatal_policy);

    let result = match resolver.resolve_document(&cancel, &document).await {
        Ok(result) => result,
        Err(DetectError::NoGroupDetected(report)) => {
            let code = if report.has_errors() {
                EXIT_FAILED_DETECT_WITH_ERRORS
            } else {
                EXIT_FAILED_DETECT
            };
            if !quiet {
                match formatter.format_failure(&report) {
                    Ok(output) => println!("{}", output),
                    Err(e) => error!("Failed to format failure report: {}", e),
                }
            }
            error!("No buildpack groups passed detection");
            return code;
        }
        Err(e) => {
            error!("Detection failed: {}", e);
            return exit_code(&e);
        }
    };

    if let Err(e) = write_result(&result, &config.group_path, &config.plan_path) {
        error!("Failed to write detection output: {}", e);
        return EXIT_GENERIC;
    }
    info!(
        group = %config.group_path.display(),
        plan = %config.plan_path.display(),
        "Wrote detection output"
    );

    if !quiet {
        match formatter.format(&result) {
            Ok(output) => println!("{}", output),
            Err(e) => {
                error!("Failed to format output: {}", e);
                return EXIT_GENERIC;
            }
        }
    }

    EXIT_SUCCESS
}
