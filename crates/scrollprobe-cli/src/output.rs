//! Output formatting and progress reporting

use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use scrollprobe::{PageTarget, RunReport, Sample, SampleObserver, Verdict};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Output format for run reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON lines
    Json,
}

/// Progress reporter for a harness run.
///
/// Writes to stderr so stdout stays reserved for the report.
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
    /// Print every sample
    pub verbose: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            progress_bar: None,
            use_color,
            quiet,
            verbose: false,
        }
    }

    /// Print one line per sample
    #[must_use]
    pub const fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Start a progress bar over the targets
    pub fn start_progress(&mut self, total: u64, message: &str) {
        if self.quiet || !self.term.is_term() {
            return;
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(message.to_string());
        self.progress_bar = Some(pb);
    }

    /// Finish progress bar
    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_and_clear();
        }
    }

    fn line(&self, text: &str) {
        match self.progress_bar {
            Some(ref pb) => pb.println(text),
            None => {
                let _ = self.term.write_line(text);
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "PASS".to_string()
        };

        self.line(&format!("{prefix} {message}"));
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Always print failures, even in quiet mode
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };

        self.line(&format!("{prefix} {message}"));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };

        self.line(&format!("{prefix} {message}"));
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }

        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };

        self.line("");
        self.line(&styled);
    }

    /// Print run summary
    pub fn summary(&self, passed: usize, failed: usize, duration: Duration) {
        if self.quiet && failed == 0 {
            return;
        }

        let total = passed + failed;
        let duration_secs = duration.as_secs_f64();

        if self.use_color {
            let passed_style = Style::new().green().bold();
            let failed_style = Style::new().red().bold();

            let status = if failed > 0 {
                failed_style.apply_to("FAILED")
            } else {
                passed_style.apply_to("PASSED")
            };

            self.line(&format!(
                "{} {} pages in {:.2}s ({} passed, {} failed)",
                status,
                total,
                duration_secs,
                passed_style.apply_to(passed),
                if failed > 0 {
                    failed_style.apply_to(failed).to_string()
                } else {
                    failed.to_string()
                },
            ));
        } else {
            let status = if failed > 0 { "FAILED" } else { "PASSED" };
            self.line(&format!(
                "{status} {total} pages in {duration_secs:.2}s ({passed} passed, {failed} failed)"
            ));
        }
    }

    /// Print the summary line for a finished report
    pub fn report_summary(&self, report: &RunReport) {
        self.summary(
            report.summary.pass,
            report.summary.fail,
            Duration::from_millis(report.duration_ms),
        );
    }
}

impl SampleObserver for ProgressReporter {
    fn on_page_start(&mut self, target: &PageTarget, index: usize, total: usize) {
        if let Some(ref pb) = self.progress_bar {
            pb.set_message(target.id.clone());
        } else if self.verbose {
            self.info(&format!("[{}/{total}] {}", index + 1, target.url));
        }
    }

    fn on_sample(&mut self, page_id: &str, sample: &Sample) {
        if !self.verbose || self.quiet {
            return;
        }
        let states: Vec<String> = sample
            .actors
            .iter()
            .map(|a| format!("{}={}", a.selector(), a.actor.animation_state))
            .collect();
        self.line(&format!(
            "    {page_id} @ {} (y={}) visible={} {}",
            sample.checkpoint,
            sample.viewport.scroll_y,
            sample.visible_count(),
            states.join(" ")
        ));
    }

    fn on_verdict(&mut self, verdict: &Verdict) {
        if verdict.is_passing() {
            self.success(&verdict.page_id);
        } else {
            self.failure(&format!("{}: {}", verdict.page_id, verdict.anomalies.join("; ")));
        }
        if let Some(ref pb) = self.progress_bar {
            pb.inc(1);
        }
    }
}
