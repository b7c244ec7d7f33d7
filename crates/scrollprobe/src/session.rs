//! PageSession: drives one page through its checkpoint sequence.
//!
//! ```text
//! Created ──load──► Loaded ──► { Sampling ⇄ Scrolling } ──► Finalized
//!    │                 │                  │
//!    └─────────────────┴──────────────────┴──────────────► Aborted
//! ```
//!
//! A session holds the only `&mut` borrow of its driver for its whole life,
//! so driver operations are awaited strictly in issue order.

use crate::animation::AnimationState;
use crate::config::{HarnessConfig, PageTarget};
use crate::driver::{read_viewport, session_error, PageDriver, PageHandle};
use crate::geometry::Viewport;
use crate::result::{ProbeError, ProbeResult};
use crate::sample::{ActorSample, Sample, SampleRules, TrackedActor};
use crate::scroll::{Checkpoint, ScrollController};
use crate::verdict::{reduce_samples, Verdict};
use chrono::Utc;
use std::fmt;
use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

/// Lifecycle state of a page session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Not yet loaded
    Created,
    /// Essential marker present
    Loaded,
    /// Querying actors
    Sampling,
    /// Waiting for a scroll to settle
    Scrolling,
    /// Verdict produced, page closed
    Finalized,
    /// Failed, page closed
    Aborted,
}

impl SessionState {
    /// Check if the session can no longer make progress
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finalized | Self::Aborted)
    }
}

/// Receives samples and verdicts as a run produces them
pub trait SampleObserver: Send {
    /// A page is about to be loaded
    fn on_page_start(&mut self, _target: &PageTarget, _index: usize, _total: usize) {}

    /// A sample was appended to the session
    fn on_sample(&mut self, _page_id: &str, _sample: &Sample) {}

    /// A page finished, successfully or not
    fn on_verdict(&mut self, _verdict: &Verdict) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SampleObserver for NoopObserver {}

/// One loaded page and its sample sequence
pub struct PageSession<'a, D: PageDriver + ?Sized> {
    driver: &'a mut D,
    target: &'a PageTarget,
    config: &'a HarnessConfig,
    state: SessionState,
    handle: Option<PageHandle>,
    scroller: ScrollController,
    actors: Vec<TrackedActor>,
    samples: Vec<Sample>,
    missing: Vec<String>,
}

impl<D: PageDriver + ?Sized> fmt::Debug for PageSession<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageSession")
            .field("page_id", &self.target.id)
            .field("state", &self.state)
            .field("handle", &self.handle)
            .field("actors", &self.actors.len())
            .field("samples", &self.samples.len())
            .finish_non_exhaustive()
    }
}

impl<'a, D: PageDriver + ?Sized> PageSession<'a, D> {
    /// Create a session for `target`; nothing is loaded yet
    pub fn new(driver: &'a mut D, target: &'a PageTarget, config: &'a HarnessConfig) -> Self {
        Self {
            driver,
            target,
            config,
            state: SessionState::Created,
            handle: None,
            scroller: ScrollController::new(config.settle()),
            actors: Vec::new(),
            samples: Vec::with_capacity(config.checkpoints.len()),
            missing: Vec::new(),
        }
    }

    /// Current lifecycle state
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Samples collected so far, in chronological order
    #[must_use]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Expected selectors that were absent after load
    #[must_use]
    pub fn missing_elements(&self) -> &[String] {
        &self.missing
    }

    /// Actors resolved at load, one per matched element
    #[must_use]
    pub fn tracked_actors(&self) -> &[TrackedActor] {
        &self.actors
    }

    /// Target this session verifies
    #[must_use]
    pub const fn target(&self) -> &PageTarget {
        self.target
    }

    /// Open the page and wait for its essential marker.
    ///
    /// Fails with `NotLoaded` if the marker does not show up within the load
    /// timeout, and with `SessionLost` if the driver cannot open the page.
    pub async fn load(&mut self) -> ProbeResult<()> {
        if self.state != SessionState::Created {
            return Err(self.closed_error());
        }

        let handle = self
            .driver
            .load_page(self.target)
            .await
            .map_err(session_error)?;
        self.handle = Some(handle);
        debug!(%handle, url = %self.target.url, "page opened");

        self.wait_for_marker(handle).await?;

        for selector in &self.target.expected {
            let present = self
                .driver
                .query_bounding_box(handle, selector)
                .await
                .map_err(session_error)?
                .is_some();
            if !present {
                warn!(selector = %selector, "expected element missing");
                self.missing.push(selector.clone());
            }
        }

        for selector in &self.target.actors {
            let matches = self
                .driver
                .count_matches(handle, selector)
                .await
                .map_err(session_error)?;
            debug!(selector = %selector, matches, "actor selector resolved");
            self.actors.extend(TrackedActor::expand(selector, matches));
        }

        self.state = SessionState::Loaded;
        info!(marker = %self.target.marker, actors = self.actors.len(), "page loaded");
        Ok(())
    }

    async fn wait_for_marker(&mut self, handle: PageHandle) -> ProbeResult<()> {
        let deadline = Instant::now() + self.config.load_timeout();
        loop {
            let found = self
                .driver
                .query_bounding_box(handle, &self.target.marker)
                .await
                .map_err(session_error)?;
            if found.is_some() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ProbeError::NotLoaded {
                    page_id: self.target.id.clone(),
                    marker: self.target.marker.clone(),
                });
            }
            tokio::time::sleep(self.config.poll_interval()).await;
        }
    }

    /// Take one sample of every tracked actor at the current position
    pub async fn sample(&mut self, checkpoint: Checkpoint) -> ProbeResult<&Sample> {
        let handle = self.loaded_handle()?;
        self.state = SessionState::Sampling;

        let viewport = read_viewport(&mut *self.driver, handle).await?;
        let rules = SampleRules {
            markers: &self.config.markers,
            visibility: self.config.visibility,
            margin: self.config.margin_px,
        };

        let mut actors = Vec::with_capacity(self.actors.len());
        for tracked in &self.actors {
            let bbox = self
                .driver
                .query_nth_bounding_box(handle, &tracked.selector, tracked.nth)
                .await
                .map_err(session_error)?;
            let raw = self
                .driver
                .query_nth_computed_state(handle, &tracked.selector, tracked.nth)
                .await
                .map_err(session_error)?;
            let entry =
                ActorSample::observe(&tracked.key, bbox, raw.as_ref(), &viewport, &rules);
            if entry.actor.animation_state == AnimationState::Unknown {
                let gap = ProbeError::ClassificationGap {
                    selector: tracked.key.clone(),
                };
                warn!(%checkpoint, "{gap}");
            }
            debug!(
                %checkpoint,
                actor = %tracked.key,
                state = %entry.actor.animation_state,
                visible = entry.actor.visibility_flag,
                "actor sampled"
            );
            actors.push(entry);
        }

        let index = self.samples.len();
        self.samples.push(Sample {
            index,
            checkpoint,
            timestamp: Utc::now(),
            viewport,
            actors,
        });
        Ok(&self.samples[index])
    }

    /// Scroll to `checkpoint` and wait for the page to settle
    pub async fn scroll(&mut self, checkpoint: Checkpoint) -> ProbeResult<Viewport> {
        let handle = self.loaded_handle()?;
        self.state = SessionState::Scrolling;
        let viewport = self
            .scroller
            .scroll_to(&mut *self.driver, handle, checkpoint.instruction())
            .await?;
        debug!(%checkpoint, scroll_y = viewport.scroll_y, "checkpoint reached");
        Ok(viewport)
    }

    /// Load, sample every checkpoint, and reduce to a verdict.
    ///
    /// On failure the session is aborted before the error is returned.
    pub async fn run(&mut self, observer: &mut dyn SampleObserver) -> ProbeResult<Verdict> {
        let span = info_span!("page_session", page_id = %self.target.id);
        let outcome = self.drive(observer).instrument(span).await;
        if outcome.is_err() {
            self.abort().await;
        }
        outcome
    }

    async fn drive(&mut self, observer: &mut dyn SampleObserver) -> ProbeResult<Verdict> {
        self.load().await?;

        let (config, target) = (self.config, self.target);
        for (i, &checkpoint) in config.checkpoints.iter().enumerate() {
            if i > 0 {
                self.scroll(checkpoint).await?;
            }
            let sample = self.sample(checkpoint).await?;
            info!(
                %checkpoint,
                scroll_y = sample.viewport.scroll_y,
                visible = sample.visible_count(),
                "checkpoint sampled"
            );
            observer.on_sample(&target.id, sample);
        }

        if let Some(ms) = config.inspect_ms {
            info!(ms, "holding page open for inspection");
            tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
        }

        self.finalize().await
    }

    /// Close the page and reduce the collected samples
    pub async fn finalize(&mut self) -> ProbeResult<Verdict> {
        let handle = self.loaded_handle()?;
        if let Err(err) = self.driver.close(handle).await {
            warn!(%handle, error = %err, "close failed after sampling");
        }
        self.handle = None;
        self.state = SessionState::Finalized;

        let keys: Vec<String> = self.actors.iter().map(|a| a.key.clone()).collect();
        let verdict = reduce_samples(&self.target.id, &keys, &self.samples, &self.missing);
        info!(
            pass = verdict.is_passing(),
            anomalies = verdict.anomalies.len(),
            "session finalized"
        );
        Ok(verdict)
    }

    /// Close the page, if open, and mark the session aborted
    pub async fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(err) = self.driver.close(handle).await {
                debug!(%handle, error = %err, "close during abort failed");
            }
        }
        if self.state != SessionState::Finalized {
            self.state = SessionState::Aborted;
        }
    }

    fn loaded_handle(&self) -> ProbeResult<PageHandle> {
        if self.state.is_terminal() {
            return Err(self.closed_error());
        }
        match self.handle {
            Some(handle) if self.state != SessionState::Created => Ok(handle),
            _ => Err(ProbeError::NotLoaded {
                page_id: self.target.id.clone(),
                marker: self.target.marker.clone(),
            }),
        }
    }

    fn closed_error(&self) -> ProbeError {
        ProbeError::session_lost(format!("session for {} already closed", self.target.id))
    }
}
