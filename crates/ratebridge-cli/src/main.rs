//! RateBridge CLI - run configuration-driven mapping pipelines
//!
//! This is the main entry point for the `ratebridge` binary, providing
//! commands to run pipelines, inspect routing, apply single mappings and
//! check configuration bundles.

mod cli;
mod config;
mod error;
mod handlers;
mod logging;
mod output;

use cli::{Cli, Commands};
use colored::control;
use config::Config;
use error::Result;
use logging::{timing::Timer, LoggingConfig};
use output::OutputWriter;
use std::process;
use tracing::instrument;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    control::set_override(cli.use_color());

    // Settings feed the logging setup, so they load first; a settings error
    // is reported after logging is up.
    let config = Config::load_with_file(cli.config.as_deref());

    let logging_settings = config.as_ref().map(|c| c.logging.clone()).unwrap_or_default();
    if let Err(e) = init_logging(&cli, &logging_settings) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("{}", error::format_error(&e, control::SHOULD_COLORIZE.should_colorize()));

            if e.should_show_help() {
                eprintln!("\nFor more information, try '--help'");
            }

            process::exit(e.exit_code());
        }
    }
}

/// Main application logic
#[instrument(skip(cli, config), fields(command = ?cli.command))]
async fn run(cli: Cli, mut config: Config) -> Result<()> {
    let _timer = Timer::new("cli_execution");
    config.override_bundle(cli.bundle.as_deref());

    let mut output = OutputWriter::new(
        cli.output,
        cli.use_color(),
        cli.quiet,
        cli.verbosity_level(),
        !cli.show_secrets,
    );

    tracing::info!(
        request_id = logging::current_request_id().unwrap_or("unknown"),
        verbosity = cli.verbosity_level(),
        "Executing command"
    );

    match cli.command {
        Commands::Run(args) => handlers::handle_run(args, &config, &mut output).await,
        Commands::Route(args) => handlers::handle_route(args, &config, &mut output).await,
        Commands::Transform(args) => handlers::handle_transform(args, &config, &mut output).await,
        Commands::Validate(args) => handlers::handle_validate(args, &config, &mut output).await,
        Commands::Completions(args) => handlers::handle_completions(args),
    }
}

/// Initialize the logging system
fn init_logging(cli: &Cli, settings: &config::LoggingSettings) -> Result<()> {
    let verbosity = cli.verbosity_level();
    let mut logging_config = LoggingConfig::from_verbosity(verbosity);
    logging_config.merge_settings(settings, verbosity);
    logging_config.merge_with_env();

    if cli.quiet {
        logging_config.level = "error".to_string();
        logging_config.console = false;
    }

    logging::init_logging(logging_config)
}
