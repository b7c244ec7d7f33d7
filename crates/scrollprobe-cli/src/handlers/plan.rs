//! Turns command-line settings into a harness configuration and target list

use crate::commands::PlanArgs;
use crate::error::{CliError, CliResult};
use scrollprobe::{resolve_targets, Checkpoint, HarnessConfig, PageTarget, TargetDefaults};
use serde::Serialize;
use std::fmt::Write as _;

/// Everything a run needs before a driver exists
#[derive(Debug, Clone, Serialize)]
pub struct RunPlan {
    /// Harness settings
    pub config: HarnessConfig,
    /// Targets in run order
    pub targets: Vec<PageTarget>,
}

impl RunPlan {
    /// Human-readable description of the plan
    #[must_use]
    pub fn describe(&self) -> String {
        let checkpoints: Vec<String> = self
            .config
            .checkpoints
            .iter()
            .map(ToString::to_string)
            .collect();
        let mut out = String::new();
        let _ = writeln!(out, "checkpoints: {}", checkpoints.join(", "));
        let _ = writeln!(
            out,
            "settle: {}ms  margin: {}px  visibility: {}",
            self.config.settle_ms, self.config.margin_px, self.config.visibility
        );
        if let Some(ms) = self.config.run_deadline_ms {
            let _ = writeln!(out, "deadline: {ms}ms");
        }
        let _ = writeln!(out, "targets: {}", self.targets.len());
        for target in &self.targets {
            let _ = writeln!(out, "  {} -> {}", target.id, target.url);
            let _ = writeln!(out, "    marker: {}", target.marker);
            if target.actors.is_empty() {
                let _ = writeln!(out, "    actors: (none)");
            } else {
                let _ = writeln!(out, "    actors: {}", target.actors.join(", "));
            }
            if !target.expected.is_empty() {
                let _ = writeln!(out, "    expected: {}", target.expected.join(", "));
            }
        }
        out
    }
}

/// Checkpoint sequence from `--sequence` or `--checkpoints`
#[must_use]
pub fn checkpoints_from(args: &PlanArgs) -> Vec<Checkpoint> {
    if !args.sequence.is_empty() {
        return args.sequence.clone();
    }
    args.checkpoints.map_or_else(Checkpoint::default_sequence, |n| {
        Checkpoint::sequence(usize::from(n), args.scroll_step)
    })
}

/// Resolve targets and validate the harness configuration
pub fn build_plan(args: &PlanArgs) -> CliResult<RunPlan> {
    if !args.scroll_step.is_finite() || args.scroll_step < 0.0 {
        return Err(CliError::invalid_argument(format!(
            "--scroll-step must be >= 0, got {}",
            args.scroll_step
        )));
    }

    let config = HarnessConfig::new()
        .with_checkpoints(checkpoints_from(args))
        .with_settle_ms(args.settle_ms)
        .with_margin_px(args.margin_px)
        .with_visibility(args.visibility)
        .with_run_deadline_ms(args.deadline_ms)
        .with_load_timeout_ms(args.load_timeout_ms)
        .with_viewport(args.width, args.height);
    config.validate()?;

    let fallback = TargetDefaults {
        marker: args.marker.clone(),
        actors: args.actors.clone(),
        expected: args.expected.clone(),
    };
    let targets = resolve_targets(&args.targets, &fallback)?;

    Ok(RunPlan { config, targets })
}
