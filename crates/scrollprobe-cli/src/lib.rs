//! Scrollprobe CLI library
//!
//! Argument parsing, progress output and command handlers for the
//! `scrollprobe` binary.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod handlers;
mod output;

pub use commands::{Cli, ColorArg, Commands, FormatArg, PlanArgs, RunArgs, ValidateArgs};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult, EXIT_FAIL, EXIT_FATAL, EXIT_PASS};
pub use output::{OutputFormat, ProgressReporter};
