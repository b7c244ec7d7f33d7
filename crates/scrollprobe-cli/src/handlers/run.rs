//! Run command handler

use crate::commands::RunArgs;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult, EXIT_FAIL, EXIT_PASS};
use crate::handlers::plan::{build_plan, RunPlan};
use crate::output::{OutputFormat, ProgressReporter};
use scrollprobe::{BrowserConfig, MultiPageRunner, PageDriver, RunReport};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Browser settings from the run arguments
#[must_use]
pub fn browser_config(args: &RunArgs, plan: &RunPlan) -> BrowserConfig {
    let mut config = BrowserConfig::default()
        .with_viewport(plan.config.viewport_width, plan.config.viewport_height)
        .with_headless(!args.headed);
    if let Some(ref path) = args.chromium_path {
        config = config.with_chromium_path(path);
    }
    if args.no_sandbox {
        config = config.with_no_sandbox();
    }
    config
}

/// Execute the run command; returns the process exit code
pub fn execute_run(config: &CliConfig, args: &RunArgs) -> CliResult<u8> {
    let mut plan = build_plan(&args.plan)?;
    plan.config.inspect_ms = args.inspect_ms;
    let browser = browser_config(args, &plan);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::config(format!("failed to start async runtime: {e}")))?;

    let report = rt.block_on(async {
        let driver = launch_driver(browser).await?;
        let (report, driver) = run_plan(config, plan, driver).await;
        shutdown_driver(driver).await;
        Ok::<_, CliError>(report)
    })?;

    write_report(&report, args.format.into(), args.output.as_deref())?;
    Ok(exit_code_for(&report))
}

/// `EXIT_PASS` when every page passed, `EXIT_FAIL` otherwise
#[must_use]
pub const fn exit_code_for(report: &RunReport) -> u8 {
    if report.is_success() {
        EXIT_PASS
    } else {
        EXIT_FAIL
    }
}

/// Run a plan with any driver and hand the driver back
pub async fn run_plan<D: PageDriver>(
    config: &CliConfig,
    plan: RunPlan,
    driver: D,
) -> (RunReport, D) {
    let mut reporter =
        ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet())
            .with_verbose(config.verbosity.is_verbose());
    reporter.header("Scrollprobe");
    reporter.start_progress(plan.targets.len() as u64, "pages");

    let mut runner = MultiPageRunner::new(driver, plan.config);
    let report = runner.run_with_observer(&plan.targets, &mut reporter).await;

    reporter.finish();
    reporter.report_summary(&report);
    info!(
        run_id = %report.run_id,
        pass = report.summary.pass,
        fail = report.summary.fail,
        "run complete"
    );
    (report, runner.into_driver())
}

/// Write the report to `output`, or stdout
pub fn write_report(
    report: &RunReport,
    format: OutputFormat,
    output: Option<&Path>,
) -> CliResult<()> {
    let rendered = match format {
        OutputFormat::Json => report.to_json_lines()?,
        OutputFormat::Text => report.render_text(),
    };

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, rendered).map_err(|e| {
                CliError::report_generation(format!("cannot write {}: {e}", path.display()))
            })?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            lock.write_all(rendered.as_bytes())?;
            lock.flush()?;
        }
    }
    Ok(())
}

#[cfg(feature = "browser")]
async fn launch_driver(browser: BrowserConfig) -> CliResult<scrollprobe::CdpDriver> {
    Ok(scrollprobe::CdpDriver::launch(browser).await?)
}

#[cfg(not(feature = "browser"))]
#[allow(clippy::unused_async)]
async fn launch_driver(_browser: BrowserConfig) -> CliResult<scrollprobe::MockDriver> {
    Err(scrollprobe::ProbeError::driver_unavailable(
        "built without the `browser` feature; rebuild with --features browser",
    )
    .into())
}

#[cfg(feature = "browser")]
async fn shutdown_driver(driver: scrollprobe::CdpDriver) {
    if let Err(e) = driver.shutdown().await {
        tracing::warn!(error = %e, "browser shutdown failed");
    }
}

#[cfg(not(feature = "browser"))]
#[allow(clippy::unused_async)]
async fn shutdown_driver(_driver: scrollprobe::MockDriver) {}
