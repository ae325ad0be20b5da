use clap::{Args, Parser, Subcommand};
use crate::error::{CliError, Result};
use pbcwrap::engine::config::{Compound, ReferenceAtoms};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan, Ted Yu",
    version,
    about = "pbcwrap - Wrap molecules into the primary periodic cell, or unwrap them into continuous trajectories.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads used for parallel wrapping.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Shift every block of the selection into the primary cell, frame by frame.
    Wrap(WrapArgs),
    /// Remove periodic image jumps so every block moves continuously over time.
    Unwrap(UnwrapArgs),
}

/// Options shared by `wrap` and `unwrap`.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    // --- Core Arguments ---
    /// Path to the input trajectory (multi-model PDB).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the output trajectory. Only written if every frame succeeds.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Optional configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Overrides ---
    /// First frame to process (0-based).
    #[arg(long, value_name = "INT")]
    pub first: Option<usize>,

    /// Last frame to process, inclusive. -1 means the last frame.
    #[arg(long, value_name = "INT", allow_negative_numbers = true)]
    pub last: Option<i64>,

    /// Grouping of selected atoms into rigid blocks: none, res, beta or fragment.
    #[arg(long, value_name = "MODE")]
    pub compound: Option<Compound>,

    /// Reference atoms of each block: none (all atoms) or occ (non-zero occupancy).
    #[arg(long, value_name = "MODE")]
    pub refatoms: Option<ReferenceAtoms>,

    /// Atom selection to process.
    #[arg(long = "sel", value_name = "SELECTION")]
    pub selection: Option<String>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S wrap.compound=fragment
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `wrap` subcommand.
#[derive(Args, Debug)]
pub struct WrapArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Atom selection whose center is moved to the origin before wrapping.
    #[arg(long, value_name = "SELECTION")]
    pub center: Option<String>,

    /// Process frames one after another instead of across the thread pool.
    #[arg(long)]
    pub sequential: bool,
}

/// Arguments for the `unwrap` subcommand.
#[derive(Args, Debug)]
pub struct UnwrapArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

/// Converts the `--last` convention (`-1` for "until the end") into a frame bound.
pub fn last_frame_bound(last: i64) -> Result<Option<usize>> {
    match last {
        -1 => Ok(None),
        _ => usize::try_from(last).map(Some).map_err(|_| {
            CliError::Config(format!(
                "Invalid last frame {}: expected a frame index or -1 for the last frame",
                last
            ))
        }),
    }
}
