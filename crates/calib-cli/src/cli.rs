//! CLI argument definitions for the `calib` tool.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use calib_cli::types::StateSelector;
use calib_model::{ArtifactKind, Version};

#[derive(Parser)]
#[command(
    name = "calib",
    version,
    about = "Inspect and extend a versioned calibration artifact store",
    long_about = "Inspect and extend a versioned calibration artifact store.\n\n\
                  Artifacts are filed per instrument state, resolution mode and kind;\n\
                  each export gets the next version and an appliesTo run range."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// TOML store configuration.
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Data root (overrides the config file and CALIB_DATA_ROOT).
    #[arg(long = "data-root", value_name = "DIR", global = true)]
    pub data_root: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Compute the state identifier for a set of detector readings.
    StateId(StateIdArgs),

    /// List states present under the data root.
    States,

    /// List the index entries of one state, mode and kind.
    Index(IndexArgs),

    /// Resolve a requested version for a run and print the record.
    Resolve(ResolveArgs),

    /// Validate a state's grouping map and list usable schemas.
    Groups(GroupsArgs),

    /// Store a new record from a JSON payload file.
    Export(ExportArgs),
}

/// How a command identifies the state it works on.
#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct StateArgs {
    /// State identifier (hex digest).
    #[arg(long = "state", value_name = "STATE_ID")]
    pub state_id: Option<String>,

    /// JSON file with raw detector readings (arc, lin, wav, freq, guideStat).
    #[arg(long = "detector", value_name = "PATH")]
    pub detector: Option<PathBuf>,
}

impl StateArgs {
    pub fn selector(&self) -> Option<StateSelector> {
        match (&self.state_id, &self.detector) {
            (Some(id), _) => Some(StateSelector::Id(id.clone())),
            (None, Some(path)) => Some(StateSelector::Detector(path.clone())),
            (None, None) => None,
        }
    }
}

#[derive(Args)]
pub struct StateIdArgs {
    /// JSON file with raw detector readings.
    #[arg(long = "detector", value_name = "PATH", conflicts_with = "arc1")]
    pub detector: Option<PathBuf>,

    /// First detector arc angle.
    #[arg(long, allow_negative_numbers = true, requires_all = ["arc2", "wavelength", "frequency", "position"])]
    pub arc1: Option<f64>,

    /// Second detector arc angle.
    #[arg(long, allow_negative_numbers = true)]
    pub arc2: Option<f64>,

    /// Requested wavelength.
    #[arg(long)]
    pub wavelength: Option<f64>,

    /// Chopper frequency.
    #[arg(long)]
    pub frequency: Option<f64>,

    /// Guide position.
    #[arg(long)]
    pub position: Option<i64>,

    /// Create the state directory and its config if missing.
    #[arg(long)]
    pub init: bool,
}

impl StateIdArgs {
    pub fn selector(&self) -> Option<StateSelector> {
        if let Some(path) = &self.detector {
            return Some(StateSelector::Detector(path.clone()));
        }
        Some(StateSelector::Readings {
            arc1: self.arc1?,
            arc2: self.arc2?,
            wavelength: self.wavelength?,
            frequency: self.frequency?,
            position: self.position?,
        })
    }
}

#[derive(Args)]
pub struct IndexArgs {
    #[command(flatten)]
    pub state: StateArgs,

    #[arg(long, value_enum, default_value = "calibration")]
    pub kind: KindArg,

    /// Use the lite resolution index.
    #[arg(long)]
    pub lite: bool,
}

#[derive(Args)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub state: StateArgs,

    #[arg(long, value_enum, default_value = "calibration")]
    pub kind: KindArg,

    #[arg(long)]
    pub lite: bool,

    /// Run number the artifact must apply to.
    #[arg(long = "run", value_name = "RUN")]
    pub run_number: u64,

    /// Version to resolve: an integer, latest, default or next.
    #[arg(long, value_name = "VERSION", default_value = "latest")]
    pub version: Version,
}

#[derive(Args)]
pub struct GroupsArgs {
    #[command(flatten)]
    pub state: StateArgs,
}

#[derive(Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub state: StateArgs,

    #[arg(long, value_enum, default_value = "calibration")]
    pub kind: KindArg,

    #[arg(long)]
    pub lite: bool,

    /// Run the artifact was derived from.
    #[arg(long = "run", value_name = "RUN")]
    pub run_number: u64,

    /// JSON file holding the calculation parameters.
    #[arg(long, value_name = "PATH")]
    pub payload: PathBuf,

    /// Runs the artifact applies to, e.g. ">=57000,<58000".
    #[arg(long = "applies-to", value_name = "EXPR", allow_hyphen_values = true)]
    pub applies_to: Option<String>,

    #[arg(long, default_value = "")]
    pub comments: String,

    #[arg(long, default_value = "")]
    pub author: String,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum KindArg {
    Calibration,
    Normalization,
    Reduction,
}

impl From<KindArg> for ArtifactKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Calibration => ArtifactKind::Calibration,
            KindArg::Normalization => ArtifactKind::Normalization,
            KindArg::Reduction => ArtifactKind::Reduction,
        }
    }
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
