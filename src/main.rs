use buildpack_detect::cli::commands::{CliArgs, Commands};
use buildpack_detect::cli::handlers::handle_detect;
use buildpack_detect::util::logging::{config_from_env, init_logging, parse_level, LoggingConfig};
use buildpack_detect::VERSION;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("detector v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping running probes");
            on_signal.cancel();
        }
    });

    let exit_code = match &args.command {
        Commands::Detect(detect_args) => handle_detect(detect_args, args.quiet, args.verbose, cancel).await,
    };

    std::process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    let from_env = config_from_env();
    let level = if let Some(level_str) = &args.log_level {
        parse_level(level_str)
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        from_env.level
    };

    init_logging(LoggingConfig { level, ..from_env });
}
