//! MultiPageRunner: one page session per target, strictly sequential.
//!
//! Session-scoped failures never escape: each one becomes a failed verdict
//! and the runner moves on, so a report always has one verdict per target.

use crate::config::{HarnessConfig, PageTarget};
use crate::driver::PageDriver;
use crate::report::RunReport;
use crate::result::ProbeError;
use crate::session::{NoopObserver, PageSession, SampleObserver};
use crate::verdict::Verdict;
use chrono::Utc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{info, warn};

/// Runs page sessions over a list of targets with one driver
#[derive(Debug)]
pub struct MultiPageRunner<D: PageDriver> {
    driver: D,
    config: HarnessConfig,
}

impl<D: PageDriver> MultiPageRunner<D> {
    /// Create a runner owning `driver`
    #[must_use]
    pub const fn new(driver: D, config: HarnessConfig) -> Self {
        Self { driver, config }
    }

    /// Harness configuration
    #[must_use]
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Borrow the driver
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Give the driver back, e.g. to shut a browser down
    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Verify every target in order
    pub async fn run(&mut self, targets: &[PageTarget]) -> RunReport {
        self.run_with_observer(targets, &mut NoopObserver).await
    }

    /// Verify every target in order, reporting progress to `observer`
    pub async fn run_with_observer(
        &mut self,
        targets: &[PageTarget],
        observer: &mut dyn SampleObserver,
    ) -> RunReport {
        let started_at = Utc::now();
        let clock = Instant::now();
        let deadline = self
            .config
            .run_deadline_ms
            .map(|ms| (clock + Duration::from_millis(ms), ms));

        info!(targets = targets.len(), "run started");
        let mut verdicts = Vec::with_capacity(targets.len());

        for (index, target) in targets.iter().enumerate() {
            observer.on_page_start(target, index, targets.len());

            let verdict = match deadline {
                Some((at, ms)) if Instant::now() >= at => {
                    warn!(page_id = %target.id, "run deadline passed, page skipped");
                    let err = ProbeError::Cancelled { ms };
                    Verdict::session_error(&target.id, target.actors.len(), &err)
                }
                _ => self.verify(target, deadline, observer).await,
            };

            observer.on_verdict(&verdict);
            verdicts.push(verdict);
        }

        let report = RunReport::new(verdicts, started_at, clock.elapsed());
        info!(
            pass = report.summary.pass,
            fail = report.summary.fail,
            "run finished"
        );
        report
    }

    async fn verify(
        &mut self,
        target: &PageTarget,
        deadline: Option<(Instant, u64)>,
        observer: &mut dyn SampleObserver,
    ) -> Verdict {
        let mut session = PageSession::new(&mut self.driver, target, &self.config);

        let outcome = match deadline {
            Some((at, ms)) => timeout_at(at, session.run(observer))
                .await
                .unwrap_or(Err(ProbeError::Cancelled { ms })),
            None => session.run(observer).await,
        };

        match outcome {
            Ok(verdict) => verdict,
            Err(err) => {
                session.abort().await;
                warn!(page_id = %target.id, kind = err.kind(), error = %err, "page session failed");
                Verdict::session_error(&target.id, target.actors.len(), &err)
            }
        }
    }
}
