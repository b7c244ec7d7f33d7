//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use scrollprobe::{Checkpoint, VisibilityPolicy};
use std::path::PathBuf;

/// Scrollprobe: verify scroll-triggered animation across web pages
#[derive(Parser, Debug)]
#[command(name = "scrollprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the harness against every target and report verdicts
    Run(RunArgs),

    /// Resolve targets and settings without launching a browser
    Validate(ValidateArgs),
}

/// Target selection and sampling settings shared by `run` and `validate`
#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    /// Targets file (YAML/JSON) or comma separated list of URLs
    #[arg(short, long)]
    pub targets: String,

    /// Number of checkpoints: top, n-2 steps down, back to top
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    pub checkpoints: Option<u16>,

    /// Explicit checkpoint sequence (top, y<px>, down<px>, up<px>)
    #[arg(long, value_delimiter = ',', conflicts_with = "checkpoints")]
    pub sequence: Vec<Checkpoint>,

    /// Distance of each generated down step in pixels
    #[arg(long, default_value = "500")]
    pub scroll_step: f64,

    /// Settle delay after each scroll in milliseconds
    #[arg(long, default_value = "750")]
    pub settle_ms: u64,

    /// Margin around the viewport in pixels
    #[arg(long, default_value = "0")]
    pub margin_px: f64,

    /// Visibility test (anchor, intersection)
    #[arg(long, default_value = "anchor")]
    pub visibility: VisibilityPolicy,

    /// Actor selector for targets that do not list their own (repeatable)
    #[arg(short, long = "actor")]
    pub actors: Vec<String>,

    /// Essential marker selector for targets that do not set one
    #[arg(long)]
    pub marker: Option<String>,

    /// Expected element selector, reported when missing (repeatable)
    #[arg(long = "expect")]
    pub expected: Vec<String>,

    /// Overall run deadline in milliseconds
    #[arg(long)]
    pub deadline_ms: Option<u64>,

    /// Time to wait for the marker after load, in milliseconds
    #[arg(long, default_value = "5000")]
    pub load_timeout_ms: u64,

    /// Viewport width handed to the browser
    #[arg(long, default_value = "1280")]
    pub width: u32,

    /// Viewport height handed to the browser
    #[arg(long, default_value = "720")]
    pub height: u32,
}

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Targets and sampling settings
    #[command(flatten)]
    pub plan: PlanArgs,

    /// Report format
    #[arg(short, long, default_value = "text")]
    pub format: FormatArg,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Path to the chromium binary
    #[arg(long)]
    pub chromium_path: Option<String>,

    /// Disable the chromium sandbox (containers, CI)
    #[arg(long)]
    pub no_sandbox: bool,

    /// Hold each page open this long after its last checkpoint
    #[arg(long)]
    pub inspect_ms: Option<u64>,
}

/// Arguments for the validate command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Targets and sampling settings
    #[command(flatten)]
    pub plan: PlanArgs,

    /// Output format for the resolved plan
    #[arg(short, long, default_value = "text")]
    pub format: FormatArg,
}

/// Report format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormatArg {
    /// Human-readable text
    #[default]
    Text,
    /// JSON lines
    Json,
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

impl From<FormatArg> for crate::output::OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
        }
    }
}
