use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Buildpack detection for Cloud Native Buildpacks platforms
#[derive(Parser, Debug)]
#[command(
    name = "detector",
    about = "Select the buildpack group that applies to an application",
    version,
    author,
    long_about = "detector runs each buildpack's detect probe against an application \
                  and resolves the order into the first group whose requirements are \
                  satisfied. The resolved group and build plan are written as TOML for \
                  the build phase."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Resolve an order against an application",
        long_about = "Evaluates the groups of an order in sequence and writes the first \
                      group that passes detection together with its build plan.\n\n\
                      Examples:\n  \
                      detector detect\n  \
                      detector detect --app ./my-app --order ./order.toml\n  \
                      detector detect --format json --fatal-policy abort"
    )]
    Detect(DetectArgs),
}

/// Every flag overrides the corresponding environment variable.
#[derive(Parser, Debug, Clone, Default)]
pub struct DetectArgs {
    #[arg(long = "app", value_name = "DIR", help = "Application directory [env: CNB_APP_DIR]")]
    pub app_dir: Option<PathBuf>,

    #[arg(long = "platform", value_name = "DIR", help = "Platform directory [env: CNB_PLATFORM_DIR]")]
    pub platform_dir: Option<PathBuf>,

    #[arg(long = "buildpacks", value_name = "DIR", help = "Buildpack store [env: CNB_BUILDPACKS_DIR]")]
    pub buildpacks_dir: Option<PathBuf>,

    #[arg(long = "extensions", value_name = "DIR", help = "Extension store [env: CNB_EXTENSIONS_DIR]")]
    pub extensions_dir: Option<PathBuf>,

    #[arg(long = "order", value_name = "FILE", help = "Order file [env: CNB_ORDER_PATH]")]
    pub order_path: Option<PathBuf>,

    #[arg(long = "group", value_name = "FILE", help = "Where to write group.toml [env: CNB_GROUP_PATH]")]
    pub group_path: Option<PathBuf>,

    #[arg(long = "plan", value_name = "FILE", help = "Where to write plan.toml [env: CNB_PLAN_PATH]")]
    pub plan_path: Option<PathBuf>,

    #[arg(long, value_name = "SECONDS", help = "Per-probe timeout [env: DETECTOR_PROBE_TIMEOUT]")]
    pub probe_timeout: Option<u64>,

    #[arg(long, value_name = "N", help = "Probes running at once [env: DETECTOR_MAX_CONCURRENT_PROBES]")]
    pub max_concurrent_probes: Option<usize>,

    #[arg(long, value_enum, help = "What a fatal probe error does [env: DETECTOR_FATAL_POLICY]")]
    pub fatal_policy: Option<FatalPolicyArg>,

    #[arg(long, value_enum, help = "Handling of deprecated APIs [env: CNB_DEPRECATION_MODE]")]
    pub deprecation_mode: Option<DeprecationModeArg>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormatArg {
    Json,
    Toml,
    #[default]
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Toml => super::output::OutputFormat::Toml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalPolicyArg {
    /// Record the error and try the next group
    Next,
    /// Stop resolving at the first fatal error
    Abort,
}

impl From<FatalPolicyArg> for crate::detect::FatalPolicy {
    fn from(arg: FatalPolicyArg) -> Self {
        match arg {
            FatalPolicyArg::Next => crate::detect::FatalPolicy::TryNextGroup,
            FatalPolicyArg::Abort => crate::detect::FatalPolicy::Abort,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeprecationModeArg {
    Quiet,
    Warn,
    Error,
}

impl From<DeprecationModeArg> for crate::api::DeprecationMode {
    fn from(arg: DeprecationModeArg) -> Self {
        match arg {
            DeprecationModeArg::Quiet => crate::api::DeprecationMode::Quiet,
            DeprecationModeArg::Warn => crate::api::DeprecationMode::Warn,
            DeprecationModeArg::Error => crate::api::DeprecationMode::Error,
        }
    }
}
