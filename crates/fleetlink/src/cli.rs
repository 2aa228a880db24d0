//! Clap derive structures for the `fleetlink` CLI.
//!
//! Defines the command tree, global flags, and shared value enums. This
//! file is also compiled by `build.rs`, so it must only depend on clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// fleetlink -- reconcile machine network models with provider data
#[derive(Debug, Parser)]
#[command(
    name = "fleetlink",
    version,
    about = "Reconcile machine link-layer models with provider network data",
    long_about = "Merges the network interfaces a cloud provider reports for a machine\n\
        into the machine's persisted link-layer model, linking devices and\n\
        addresses to provider identifiers and handing authority back to the\n\
        machine agent where the provider no longer reports them.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to FLEETLINK_CONFIG, then the platform config dir)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', env = "FLEETLINK_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output [default: from config, else auto]
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MixedNaming {
    /// The first interface decides whether nameless ones are named
    FirstDevice,
    /// Never name interfaces of a mixed snapshot
    Skip,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Merge a provider snapshot into one machine's model
    #[command(alias = "m")]
    Merge(MergeArgs),

    /// List machines in a model file
    Machines(MachinesArgs),

    /// List a machine's devices and addresses
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Inspect or initialize CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Merge ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct MergeArgs {
    /// Model file (JSON or YAML, by extension)
    #[arg(long, short = 's', value_name = "FILE")]
    pub state: PathBuf,

    /// Provider snapshot for the machine (JSON or YAML, by extension)
    #[arg(long, short = 'i', value_name = "FILE")]
    pub incoming: PathBuf,

    /// Machine to reconcile
    #[arg(long, short = 'm', value_name = "ID")]
    pub machine: String,

    /// Write the reconciled model back to the state file
    #[arg(long)]
    pub apply: bool,

    /// Override merge.mixed_naming
    #[arg(long, value_enum)]
    pub mixed_naming: Option<MixedNaming>,

    /// Override merge.max_attempts
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_attempts: Option<u32>,
}

// ── Listing ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct MachinesArgs {
    /// Model file (JSON or YAML, by extension)
    #[arg(long, short = 's', value_name = "FILE")]
    pub state: PathBuf,
}

#[derive(Debug, Args)]
pub struct DevicesArgs {
    /// Model file (JSON or YAML, by extension)
    #[arg(long, short = 's', value_name = "FILE")]
    pub state: PathBuf,

    /// Machine whose devices to list
    #[arg(long, short = 'm', value_name = "ID")]
    pub machine: String,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Print the config file path
    Path,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
