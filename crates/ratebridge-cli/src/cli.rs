//! Command-line interface argument parsing and definitions
//!
//! This module defines the CLI structure using clap's derive API.

use clap::{Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

/// RateBridge CLI - run configuration-driven insurance mapping pipelines
///
/// Loads a configuration bundle (pipelines, external systems, lookup tables)
/// and runs pipelines, routing decisions or single mappings against input
/// documents.
#[derive(Parser, Debug)]
#[command(
    name = "ratebridge",
    version,
    author,
    about,
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Enable verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to the settings file
    #[arg(short, long, global = true, env = "RATEBRIDGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the configuration bundle (JSON or YAML)
    #[arg(short, long, global = true)]
    pub bundle: Option<PathBuf>,

    /// Output format for results
    #[arg(short, long, value_enum, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Print sensitive values (keys, tokens, passwords) instead of masking them
    #[arg(long, global = true)]
    pub show_secrets: bool,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a pipeline against an input document
    Run(RunArgs),

    /// Show which pipeline a request would be routed to
    Route(RouteArgs),

    /// Apply a single mapping to an input document
    Transform(TransformArgs),

    /// Load a bundle and report what it contains
    Validate(ValidateArgs),

    /// Generate shell completions for the specified shell
    Completions(CompletionsArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Input document (JSON or YAML)
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Pipeline to execute
    #[arg(short, long, conflicts_with = "product_line")]
    pub pipeline: Option<String>,

    /// Product line to route on (e.g. GL, WC)
    #[arg(long, required_unless_present = "pipeline", requires = "source_system")]
    pub product_line: Option<String>,

    /// Source system to route on
    #[arg(long)]
    pub source_system: Option<String>,

    /// Transaction type to route on (e.g. new_business)
    #[arg(long)]
    pub transaction_type: Option<String>,

    /// Print the per-step trace
    #[arg(long)]
    pub steps: bool,

    /// Write the final context to this file instead of printing it
    #[arg(long = "save-to")]
    pub save_to: Option<PathBuf>,
}

/// Arguments for the route command
#[derive(Parser, Debug)]
pub struct RouteArgs {
    /// Product line (e.g. GL, WC)
    #[arg(long)]
    pub product_line: String,

    /// Source system the request came from
    #[arg(long)]
    pub source_system: String,

    /// Transaction type (e.g. new_business, renewal)
    #[arg(long)]
    pub transaction_type: Option<String>,

    /// Show the score of every candidate route
    #[arg(long)]
    pub all: bool,
}

/// Arguments for the transform command
#[derive(Parser, Debug)]
pub struct TransformArgs {
    /// Mapping id from the bundle
    #[arg(short, long)]
    pub mapping: String,

    /// Input document (JSON or YAML)
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Record missing required fields as errors instead of aborting
    #[arg(long)]
    pub continue_on_missing: bool,

    /// Print the per-field audit records
    #[arg(long)]
    pub fields: bool,

    /// Write the mapped output to this file instead of printing it
    #[arg(long = "save-to")]
    pub save_to: Option<PathBuf>,
}

/// Arguments for the validate command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Treat bundle diagnostics as errors
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for the completions command
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Output format options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output with colors and formatting
    Human,
    /// Compact JSON output
    Json,
    /// YAML output
    Yaml,
    /// Pretty-printed JSON output
    JsonPretty,
}

/// Supported shells for completion generation
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective verbosity level (considering quiet flag)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    /// Check if colored output should be used
    pub fn use_color(&self) -> bool {
        !self.no_color && std::io::stdout().is_terminal()
    }
}

impl Shell {
    /// Convert to clap_complete shell type
    pub fn to_clap_shell(self) -> clap_complete::Shell {
        match self {
            Shell::Bash => clap_complete::Shell::Bash,
            Shell::Zsh => clap_complete::Shell::Zsh,
            Shell::Fish => clap_complete::Shell::Fish,
            Shell::PowerShell => clap_complete::Shell::PowerShell,
            Shell::Elvish => clap_complete::Shell::Elvish,
        }
    }
}
