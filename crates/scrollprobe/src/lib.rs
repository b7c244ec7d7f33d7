//! Scrollprobe: verification harness for scroll-triggered animation.
//!
//! Loads pages through a [`PageDriver`], scrolls each one through a fixed
//! checkpoint sequence, samples the geometry and animation state of every
//! tracked actor, and reduces the samples into per-page verdicts.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  MultiPageRunner ── one PageSession per target, sequential       │
//! │        │                                                         │
//! │        ▼                                                         │
//! │  PageSession ── Created → Loaded → {Sampling ⇄ Scrolling}        │
//! │        │            → Finalized | Aborted                        │
//! │        ├── ScrollController  (issue, settle, read viewport)      │
//! │        ├── geometry          (in-viewport, rendered)             │
//! │        └── animation         (Idle / Flying / Unknown)           │
//! │        ▼                                                         │
//! │  Verdict ──► RunReport (JSON lines / text)                       │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use scrollprobe::{HarnessConfig, MockActor, MockDriver, MockPage, MultiPageRunner, PageTarget};
//!
//! # tokio_test_block(async {
//! let page = MockPage::new(800.0, 600.0)
//!     .with_document_height(2000.0)
//!     .with_actor(".bird", MockActor::new(100.0, 100.0, 50.0, 50.0).flies_after(400));
//! let driver = MockDriver::new().with_page("mock://home", page);
//!
//! let config = HarnessConfig::default().with_settle_ms(0);
//! let mut runner = MultiPageRunner::new(driver, config);
//! let report = runner.run(&[PageTarget::new("mock://home").with_actor(".bird")]).await;
//! assert_eq!(report.summary.pass, 1);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(f)
//! # }
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod animation;
#[allow(clippy::missing_errors_doc)]
mod browser;
mod config;
#[allow(clippy::missing_errors_doc)]
mod driver;
mod geometry;
mod report;
mod result;
#[allow(clippy::missing_errors_doc)]
mod runner;
mod sample;
mod scroll;
#[allow(clippy::missing_errors_doc)]
mod session;
mod verdict;

pub use animation::{
    classify, has_idle_to_flying, AnimationState, ClassMarkers, ComputedState, NO_ANIMATION,
};
#[cfg(feature = "browser")]
pub use browser::CdpDriver;
pub use browser::BrowserConfig;
pub use config::{
    resolve_targets, HarnessConfig, PageTarget, TargetDefaults, TargetEntry, TargetFile,
    TargetSpec, DEFAULT_LOAD_TIMEOUT_MS, DEFAULT_MARKER, DEFAULT_POLL_INTERVAL_MS,
};
pub use driver::{MockActor, MockDriver, MockPage, PageDriver, PageHandle, StateScript};
pub use geometry::{
    intersects_viewport, is_in_viewport, is_rendered, BoundingBox, Viewport, VisibilityPolicy,
};
pub use report::{RunReport, RunSummary};
pub use result::{ProbeError, ProbeResult};
pub use runner::MultiPageRunner;
pub use sample::{Actor, ActorSample, Sample, SampleRules, TrackedActor};
pub use scroll::{
    Checkpoint, ScrollController, ScrollInstruction, DEFAULT_SCROLL_STEP_PX, DEFAULT_SETTLE_MS,
};
pub use session::{NoopObserver, PageSession, SampleObserver, SessionState};
pub use verdict::{reduce_samples, ActorTrace, Verdict, NO_ACTORS_TRACKED};
