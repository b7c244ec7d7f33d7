//! Validate command handler

use crate::commands::{FormatArg, ValidateArgs};
use crate::error::{CliError, CliResult, EXIT_PASS};
use crate::handlers::plan::{build_plan, RunPlan};
use std::io::Write;

/// Render a resolved plan
pub fn render_plan(plan: &RunPlan, format: FormatArg) -> CliResult<String> {
    match format {
        FormatArg::Text => Ok(plan.describe()),
        FormatArg::Json => serde_json::to_string_pretty(plan)
            .map(|mut s| {
                s.push('\n');
                s
            })
            .map_err(|e| CliError::report_generation(e.to_string())),
    }
}

/// Execute the validate command
pub fn execute_validate(args: &ValidateArgs) -> CliResult<u8> {
    let plan = build_plan(&args.plan)?;
    tracing::debug!(targets = plan.targets.len(), "plan resolved");

    let rendered = render_plan(&plan, args.format)?;
    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    lock.write_all(rendered.as_bytes())?;
    lock.flush()?;
    Ok(EXIT_PASS)
}
