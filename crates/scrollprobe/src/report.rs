//! Run report: verdicts in target order plus a pass/fail summary.
//!
//! Two renderings are supported:
//!
//! - JSON lines: one `page` record per verdict, then one `summary` record
//! - Plain text: one block per page, for terminals

use crate::result::ProbeResult;
use crate::verdict::Verdict;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::io::Write;
use std::time::Duration;
use uuid::Uuid;

/// Pass/fail counts for a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Number of verdicts
    pub total: usize,
    /// Passing verdicts
    pub pass: usize,
    /// `total - pass`
    pub fail: usize,
}

impl RunSummary {
    /// Count passing verdicts
    #[must_use]
    pub fn from_verdicts(verdicts: &[Verdict]) -> Self {
        let total = verdicts.len();
        let pass = verdicts.iter().filter(|v| v.is_passing()).count();
        Self {
            total,
            pass,
            fail: total - pass,
        }
    }

    /// Pass rate in `[0, 1]`; an empty run counts as fully passing
    #[must_use]
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.pass as f64 / self.total as f64
        }
    }
}

/// Result of one runner invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Unique run identifier
    pub run_id: Uuid,
    /// Wall-clock start of the run
    pub started_at: DateTime<Utc>,
    /// Run duration in milliseconds
    pub duration_ms: u64,
    /// One verdict per target, in target order
    pub verdicts: Vec<Verdict>,
    /// Pass/fail counts
    pub summary: RunSummary,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PageRecord<'a> {
    #[serde(rename = "type")]
    record_type: &'static str,
    page_id: &'a str,
    pass: bool,
    visible_at_checkpoint: &'a [usize],
    transitioned_to_flying: usize,
    anomalies: &'a [String],
    checkpoints: &'a [String],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryRecord<'a> {
    #[serde(rename = "type")]
    record_type: &'static str,
    run_id: &'a Uuid,
    total: usize,
    pass: usize,
    fail: usize,
    started_at: &'a DateTime<Utc>,
    duration_ms: u64,
}

impl RunReport {
    /// Build a report and its summary
    #[must_use]
    pub fn new(verdicts: Vec<Verdict>, started_at: DateTime<Utc>, duration: Duration) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at,
            duration_ms: duration.as_millis() as u64,
            summary: RunSummary::from_verdicts(&verdicts),
            verdicts,
        }
    }

    /// True iff no verdict failed
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.summary.fail == 0
    }

    /// Failing verdicts, in target order
    pub fn failures(&self) -> impl Iterator<Item = &Verdict> {
        self.verdicts.iter().filter(|v| !v.is_passing())
    }

    /// Write the report as JSON lines
    ///
    /// # Errors
    ///
    /// Returns error if serialization or the writer fails
    pub fn write_json_lines<W: Write>(&self, mut out: W) -> ProbeResult<()> {
        for verdict in &self.verdicts {
            let record = PageRecord {
                record_type: "page",
                page_id: &verdict.page_id,
                pass: verdict.is_passing(),
                visible_at_checkpoint: &verdict.visible_at_checkpoint,
                transitioned_to_flying: verdict.transitioned_to_flying,
                anomalies: &verdict.anomalies,
                checkpoints: &verdict.checkpoints,
            };
            serde_json::to_writer(&mut out, &record)?;
            out.write_all(b"\n")?;
        }

        let summary = SummaryRecord {
            record_type: "summary",
            run_id: &self.run_id,
            total: self.summary.total,
            pass: self.summary.pass,
            fail: self.summary.fail,
            started_at: &self.started_at,
            duration_ms: self.duration_ms,
        };
        serde_json::to_writer(&mut out, &summary)?;
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(())
    }

    /// Render the report as JSON lines
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn to_json_lines(&self) -> ProbeResult<String> {
        let mut buf = Vec::new();
        self.write_json_lines(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Render a plain-text report
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for verdict in &self.verdicts {
            let status = if verdict.is_passing() { "PASS" } else { "FAIL" };
            let _ = writeln!(out, "{status}  {}", verdict.page_id);

            if !verdict.checkpoints.is_empty() {
                let visible: Vec<String> = verdict
                    .checkpoints
                    .iter()
                    .zip(&verdict.visible_at_checkpoint)
                    .map(|(cp, n)| format!("{cp}={n}"))
                    .collect();
                let _ = writeln!(
                    out,
                    "      visible: {}  actors: {}  idle->flying: {}",
                    visible.join(" "),
                    verdict.total_actors,
                    verdict.transitioned_to_flying
                );
            }
            for anomaly in &verdict.anomalies {
                let _ = writeln!(out, "      - {anomaly}");
            }
        }
        let _ = writeln!(
            out,
            "\n{} pages: {} passed, {} failed ({}ms, run {})",
            self.summary.total, self.summary.pass, self.summary.fail, self.duration_ms, self.run_id
        );
        out
    }
}
