//! Scrollprobe CLI: verify scroll-triggered animation across web pages
//!
//! ## Usage
//!
//! ```bash
//! scrollprobe run --targets https://a.test,https://b.test --actor .bird
//! scrollprobe run --targets targets.yaml --checkpoints 6 --format json
//! scrollprobe validate --targets targets.yaml
//! ```

use clap::Parser;
use scrollprobe_cli::{
    handlers::{execute_run, execute_validate},
    Cli, CliConfig, CliResult, ColorChoice, Commands, Verbosity,
};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = build_config(&cli);
    init_tracing(&config);

    match run(&config, &cli.command) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(config: &CliConfig, command: &Commands) -> CliResult<u8> {
    match command {
        Commands::Run(args) => execute_run(config, args),
        Commands::Validate(args) => execute_validate(args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = if cli.quiet {
        Verbosity::Quiet
    } else {
        match cli.verbose {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::Debug,
        }
    };

    let color: ColorChoice = cli.color.into();

    CliConfig::new().with_verbosity(verbosity).with_color(color)
}

/// Logs go to stderr; `RUST_LOG` overrides the verbosity flags
fn init_tracing(config: &CliConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.verbosity.log_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(config.color.should_color())
        .with_writer(std::io::stderr)
        .init();
}
