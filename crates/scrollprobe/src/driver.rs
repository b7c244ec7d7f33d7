//! PageDriver - Abstract page automation trait
//!
//! The harness never talks to a browser directly. It needs seven capabilities
//! (load, match count, box query, state query, scroll, viewport, close) and
//! everything else (launch flags, headless mode, retries) stays inside the
//! driver. Element queries address the `nth` match of a selector, so one
//! selector can stand for a group of actors.
//!
//! # Implementations
//!
//! - `CdpDriver` - Chromium over CDP via chromiumoxide (feature `browser`)
//! - `MockDriver` - Scripted pages for unit and integration testing
//!
//! Every method takes `&mut self`: a session holds the only mutable borrow of
//! its driver, so no two operations on the same page can be outstanding.

use crate::animation::ComputedState;
use crate::config::PageTarget;
use crate::geometry::{BoundingBox, Viewport};
use crate::result::{ProbeError, ProbeResult};
use crate::scroll::ScrollInstruction;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;

/// Opaque handle to a page opened by a driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageHandle(pub u64);

impl std::fmt::Display for PageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "page#{}", self.0)
    }
}

/// Abstract driver trait for page automation
#[async_trait]
pub trait PageDriver: Send {
    /// Open the target and return a handle to it
    async fn load_page(&mut self, target: &PageTarget) -> ProbeResult<PageHandle>;

    /// Number of elements matching `selector`
    async fn count_matches(&mut self, handle: PageHandle, selector: &str) -> ProbeResult<usize>;

    /// Viewport-relative box of the `nth` element matching `selector`,
    /// or `None` if there is no such match
    async fn query_nth_bounding_box(
        &mut self,
        handle: PageHandle,
        selector: &str,
        nth: usize,
    ) -> ProbeResult<Option<BoundingBox>>;

    /// Class list and computed animation of the `nth` match, or `None`
    async fn query_nth_computed_state(
        &mut self,
        handle: PageHandle,
        selector: &str,
        nth: usize,
    ) -> ProbeResult<Option<ComputedState>>;

    /// Box of the first match
    async fn query_bounding_box(
        &mut self,
        handle: PageHandle,
        selector: &str,
    ) -> ProbeResult<Option<BoundingBox>> {
        self.query_nth_bounding_box(handle, selector, 0).await
    }

    /// State of the first match
    async fn query_computed_state(
        &mut self,
        handle: PageHandle,
        selector: &str,
    ) -> ProbeResult<Option<ComputedState>> {
        self.query_nth_computed_state(handle, selector, 0).await
    }

    /// Issue a scroll instruction
    async fn scroll(&mut self, handle: PageHandle, instruction: ScrollInstruction)
        -> ProbeResult<()>;

    /// Current viewport dimensions and scroll offset
    async fn current_viewport(&mut self, handle: PageHandle) -> ProbeResult<Viewport>;

    /// Close the page
    async fn close(&mut self, handle: PageHandle) -> ProbeResult<()>;
}

/// Map a driver failure inside a session onto the session taxonomy.
///
/// Anything that is not already session-scoped means the page can no longer
/// be observed, which is `SessionLost`.
pub(crate) fn session_error(err: ProbeError) -> ProbeError {
    if err.is_session_scoped() {
        err
    } else {
        ProbeError::session_lost(err.to_string())
    }
}

/// Read the current viewport and reject one with no visible area.
pub(crate) async fn read_viewport<D>(driver: &mut D, handle: PageHandle) -> ProbeResult<Viewport>
where
    D: PageDriver + ?Sized,
{
    let viewport = driver.current_viewport(handle).await.map_err(session_error)?;
    if viewport.is_valid() {
        Ok(viewport)
    } else {
        Err(ProbeError::session_lost(format!(
            "{handle} reported a degenerate viewport {}x{}",
            viewport.width, viewport.height
        )))
    }
}

// ============================================================================
// Mock driver
// ============================================================================

/// How a mock actor's computed state evolves
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateScript {
    /// Always the same state
    Fixed(ComputedState),
    /// One state per query, the last one repeating
    Sequence(Vec<ComputedState>),
    /// `idle` above `at` pixels of scroll, `flying` at or below it
    ScrollTriggered {
        /// Scroll offset at which flight starts
        at: u64,
        /// State before the trigger
        idle: ComputedState,
        /// State from the trigger on
        flying: ComputedState,
    },
}

/// A scripted actor in document coordinates
#[derive(Debug, Clone)]
pub struct MockActor {
    /// Top edge in document coordinates
    pub doc_top: f64,
    /// Left edge
    pub left: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
    /// Position: fixed (ignores scrolling)
    pub fixed: bool,
    /// State evolution
    pub script: StateScript,
}

impl MockActor {
    /// Actor at a document position with a fixed perched state
    #[must_use]
    pub fn new(doc_top: f64, left: f64, width: f64, height: f64) -> Self {
        Self {
            doc_top,
            left,
            width,
            height,
            fixed: false,
            script: StateScript::Fixed(ComputedState::classes(["perched"])),
        }
    }

    /// Pin the actor to the viewport
    #[must_use]
    pub const fn fixed(mut self) -> Self {
        self.fixed = true;
        self
    }

    /// Replace the state script
    #[must_use]
    pub fn with_script(mut self, script: StateScript) -> Self {
        self.script = script;
        self
    }

    /// Perched until the page is scrolled `at` pixels, then flying
    #[must_use]
    pub fn flies_after(self, at: u64) -> Self {
        self.with_script(StateScript::ScrollTriggered {
            at,
            idle: ComputedState::classes(["perched"]),
            flying: ComputedState::new(["fly"], "flap"),
        })
    }

    fn bounding_box(&self, scroll_y: f64) -> BoundingBox {
        let top = if self.fixed {
            self.doc_top
        } else {
            self.doc_top - scroll_y
        };
        BoundingBox::new(top, self.left, self.width, self.height)
    }

    fn state(&self, query: usize, scroll_y: f64) -> ComputedState {
        match &self.script {
            StateScript::Fixed(state) => state.clone(),
            StateScript::Sequence(states) => states
                .get(query)
                .or_else(|| states.last())
                .cloned()
                .unwrap_or_default(),
            StateScript::ScrollTriggered { at, idle, flying } => {
                if scroll_y >= *at as f64 {
                    flying.clone()
                } else {
                    idle.clone()
                }
            }
        }
    }
}

/// A scripted page
#[derive(Debug, Clone)]
pub struct MockPage {
    /// Visible width
    pub width: f64,
    /// Visible height
    pub height: f64,
    /// Total document height (bounds scrolling)
    pub document_height: f64,
    /// Selectors of static elements present on the page
    pub elements: BTreeSet<String>,
    /// Actors by selector, in document order
    pub actors: BTreeMap<String, Vec<MockActor>>,
    /// Fail `load_page` with `SessionLost`
    pub unreachable: bool,
    /// Lose the page after this many successful operations
    pub lose_after: Option<usize>,
    /// Time `load_page` takes
    pub load_delay: Duration,
}

impl MockPage {
    /// Empty page of the given viewport size with a `body` element
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            document_height: height,
            elements: BTreeSet::from(["body".to_string()]),
            actors: BTreeMap::new(),
            unreachable: false,
            lose_after: None,
            load_delay: Duration::ZERO,
        }
    }

    /// Set the document height
    #[must_use]
    pub const fn with_document_height(mut self, height: f64) -> Self {
        self.document_height = height;
        self
    }

    /// Add a static element
    #[must_use]
    pub fn with_element(mut self, selector: impl Into<String>) -> Self {
        self.elements.insert(selector.into());
        self
    }

    /// Remove a static element (e.g. the default `body`)
    #[must_use]
    pub fn without_element(mut self, selector: &str) -> Self {
        self.elements.remove(selector);
        self
    }

    /// Add an actor; repeating a selector adds another match for it
    #[must_use]
    pub fn with_actor(mut self, selector: impl Into<String>, actor: MockActor) -> Self {
        self.actors.entry(selector.into()).or_default().push(actor);
        self
    }

    /// Make `load_page` fail with `SessionLost`
    #[must_use]
    pub const fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Lose the page after `ops` successful driver operations
    #[must_use]
    pub const fn lose_after(mut self, ops: usize) -> Self {
        self.lose_after = Some(ops);
        self
    }

    /// Delay `load_page`
    #[must_use]
    pub const fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    fn max_scroll(&self) -> f64 {
        (self.document_height - self.height).max(0.0)
    }
}

#[derive(Debug)]
struct OpenPage {
    page: MockPage,
    scroll_y: f64,
    ops: usize,
    state_queries: HashMap<(String, usize), usize>,
}

/// Mock driver for unit testing
#[derive(Debug, Default)]
pub struct MockDriver {
    /// Pages by URL
    pub pages: HashMap<String, MockPage>,
    /// Call history for verification
    pub call_history: Vec<String>,
    open: HashMap<PageHandle, OpenPage>,
    next_handle: u64,
}

impl MockDriver {
    /// Create new mock driver
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page under a URL
    pub fn add_page(&mut self, url: impl Into<String>, page: MockPage) {
        self.pages.insert(url.into(), page);
    }

    /// Builder form of `add_page`
    #[must_use]
    pub fn with_page(mut self, url: impl Into<String>, page: MockPage) -> Self {
        self.add_page(url, page);
        self
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> &[String] {
        &self.call_history
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.call_history.iter().any(|c| c.starts_with(method))
    }

    /// Number of pages currently open
    #[must_use]
    pub fn open_pages(&self) -> usize {
        self.open.len()
    }

    fn page_mut(&mut self, handle: PageHandle) -> ProbeResult<&mut OpenPage> {
        let open = self
            .open
            .get_mut(&handle)
            .ok_or_else(|| ProbeError::session_lost(format!("{handle} is closed")))?;

        if open.page.lose_after.is_some_and(|limit| open.ops >= limit) {
            return Err(ProbeError::session_lost(format!("{handle} became unreachable")));
        }
        open.ops += 1;
        Ok(open)
    }
}

#[async_trait]
impl PageDriver for MockDriver {
    async fn load_page(&mut self, target: &PageTarget) -> ProbeResult<PageHandle> {
        self.call_history.push(format!("load_page:{}", target.url));

        let page = self
            .pages
            .get(&target.url)
            .cloned()
            .ok_or_else(|| ProbeError::session_lost(format!("{} is unreachable", target.url)))?;

        if !page.load_delay.is_zero() {
            tokio::time::sleep(page.load_delay).await;
        }
        if page.unreachable {
            return Err(ProbeError::session_lost(format!("{} is unreachable", target.url)));
        }

        self.next_handle += 1;
        let handle = PageHandle(self.next_handle);
        self.open.insert(
            handle,
            OpenPage {
                page,
                scroll_y: 0.0,
                ops: 0,
                state_queries: HashMap::new(),
            },
        );
        Ok(handle)
    }

    async fn count_matches(&mut self, handle: PageHandle, selector: &str) -> ProbeResult<usize> {
        self.call_history.push(format!("count_matches:{selector}"));
        let open = self.page_mut(handle)?;
        Ok(open
            .page
            .actors
            .get(selector)
            .map_or(usize::from(open.page.elements.contains(selector)), Vec::len))
    }

    async fn query_nth_bounding_box(
        &mut self,
        handle: PageHandle,
        selector: &str,
        nth: usize,
    ) -> ProbeResult<Option<BoundingBox>> {
        self.call_history
            .push(format!("query_bounding_box:{}", match_label(selector, nth)));
        let open = self.page_mut(handle)?;

        if let Some(actors) = open.page.actors.get(selector) {
            return Ok(actors.get(nth).map(|a| a.bounding_box(open.scroll_y)));
        }
        if nth == 0 && open.page.elements.contains(selector) {
            return Ok(Some(BoundingBox::new(
                -open.scroll_y,
                0.0,
                open.page.width,
                open.page.document_height,
            )));
        }
        Ok(None)
    }

    async fn query_nth_computed_state(
        &mut self,
        handle: PageHandle,
        selector: &str,
        nth: usize,
    ) -> ProbeResult<Option<ComputedState>> {
        self.call_history
            .push(format!("query_computed_state:{}", match_label(selector, nth)));
        let open = self.page_mut(handle)?;

        let Some(actors) = open.page.actors.get(selector) else {
            return Ok((nth == 0 && open.page.elements.contains(selector))
                .then(ComputedState::default));
        };
        let Some(actor) = actors.get(nth) else {
            return Ok(None);
        };

        let count = open
            .state_queries
            .entry((selector.to_string(), nth))
            .or_insert(0);
        let state = actor.state(*count, open.scroll_y);
        *count += 1;
        Ok(Some(state))
    }

    async fn scroll(
        &mut self,
        handle: PageHandle,
        instruction: ScrollInstruction,
    ) -> ProbeResult<()> {
        self.call_history.push(format!("scroll:{instruction:?}"));
        let open = self.page_mut(handle)?;
        let max = open.page.max_scroll();
        open.scroll_y = instruction.target_from(open.scroll_y).min(max);
        Ok(())
    }

    async fn current_viewport(&mut self, handle: PageHandle) -> ProbeResult<Viewport> {
        let open = self.page_mut(handle)?;
        Ok(Viewport::new(open.page.width, open.page.height, open.scroll_y))
    }

    async fn close(&mut self, handle: PageHandle) -> ProbeResult<()> {
        self.call_history.push(format!("close:{handle}"));
        self.open
            .remove(&handle)
            .map(|_| ())
            .ok_or_else(|| ProbeError::session_lost(format!("{handle} is not open")))
    }
}

fn match_label(selector: &str, nth: usize) -> String {
    if nth == 0 {
        selector.to_string()
    } else {
        format!("{selector}[{nth}]")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn bird_page() -> MockPage {
        MockPage::new(1280.0, 720.0)
            .with_document_height(4000.0)
            .with_element(".content-wrapper")
            .with_actor(".bird-1", MockActor::new(100.0, 200.0, 40.0, 30.0).flies_after(300))
            .with_actor(".bird-2", MockActor::new(1500.0, 600.0, 40.0, 30.0))
    }

    mod mock_driver_tests {
        use super::*;

        #[test]
        fn test_mock_driver_creation() {
            let driver = MockDriver::new();
            assert!(driver.pages.is_empty());
            assert!(driver.history().is_empty());
            assert_eq!(driver.open_pages(), 0);
        }

        #[test]
        fn test_mock_driver_was_called() {
            let driver = MockDriver::new();
            assert!(!driver.was_called("load_page"));
        }

        #[test]
        fn test_handle_display() {
            assert_eq!(PageHandle(7).to_string(), "page#7");
        }
    }

    mod async_driver_tests {
        use super::*;

        #[tokio::test]
        async fn test_load_unknown_url_is_session_lost() {
            let mut driver = MockDriver::new();
            let err = driver
                .load_page(&PageTarget::new("mock://nowhere"))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), "SessionLost");
            assert!(driver.was_called("load_page"));
        }

        #[tokio::test]
        async fn test_boxes_follow_scroll() {
            let mut driver = MockDriver::new().with_page("mock://birds", bird_page());
            let handle = driver.load_page(&PageTarget::new("mock://birds")).await.unwrap();

            let before = driver.query_bounding_box(handle, ".bird-2").await.unwrap().unwrap();
            assert_eq!(before.top, 1500.0);

            driver.scroll(handle, ScrollInstruction::Absolute(1000.0)).await.unwrap();
            let after = driver.query_bounding_box(handle, ".bird-2").await.unwrap().unwrap();
            assert_eq!(after.top, 500.0);

            let vp = driver.current_viewport(handle).await.unwrap();
            assert_eq!(vp.scroll_y, 1000.0);
        }

        #[tokio::test]
        async fn test_scroll_clamped_to_document() {
            let mut driver = MockDriver::new().with_page("mock://birds", bird_page());
            let handle = driver.load_page(&PageTarget::new("mock://birds")).await.unwrap();
            driver.scroll(handle, ScrollInstruction::Relative(99_999.0)).await.unwrap();
            let vp = driver.current_viewport(handle).await.unwrap();
            assert_eq!(vp.scroll_y, 4000.0 - 720.0);
        }

        #[tokio::test]
        async fn test_scroll_triggered_state() {
            let mut driver = MockDriver::new().with_page("mock://birds", bird_page());
            let handle = driver.load_page(&PageTarget::new("mock://birds")).await.unwrap();

            let state = driver.query_computed_state(handle, ".bird-1").await.unwrap().unwrap();
            assert!(state.class_list.contains("perched"));

            driver.scroll(handle, ScrollInstruction::Absolute(300.0)).await.unwrap();
            let state = driver.query_computed_state(handle, ".bird-1").await.unwrap().unwrap();
            assert!(state.class_list.contains("fly"));
            assert!(state.is_animating());
        }

        #[tokio::test]
        async fn test_sequence_script_repeats_last() {
            let actor = MockActor::new(0.0, 0.0, 10.0, 10.0).with_script(StateScript::Sequence(vec![
                ComputedState::classes(["idle"]),
                ComputedState::classes(["fly"]),
            ]));
            let page = MockPage::new(800.0, 600.0).with_actor(".a", actor);
            let mut driver = MockDriver::new().with_page("mock://seq", page);
            let handle = driver.load_page(&PageTarget::new("mock://seq")).await.unwrap();

            let mut classes = Vec::new();
            for _ in 0..3 {
                let s = driver.query_computed_state(handle, ".a").await.unwrap().unwrap();
                classes.push(s.class_list.into_iter().collect::<Vec<_>>().join(","));
            }
            assert_eq!(classes, vec!["idle", "fly", "fly"]);
        }

        #[tokio::test]
        async fn test_missing_selector_is_none() {
            let mut driver = MockDriver::new().with_page("mock://birds", bird_page());
            let handle = driver.load_page(&PageTarget::new("mock://birds")).await.unwrap();
            assert!(driver.query_bounding_box(handle, ".ghost").await.unwrap().is_none());
            assert!(driver.query_computed_state(handle, ".ghost").await.unwrap().is_none());
        }

        #[tokio::test]
        async fn test_repeated_selector_has_several_matches() {
            let page = MockPage::new(800.0, 600.0)
                .with_actor(".bird", MockActor::new(50.0, 0.0, 10.0, 10.0))
                .with_actor(".bird", MockActor::new(900.0, 0.0, 10.0, 10.0).flies_after(0));
            let mut driver = MockDriver::new().with_page("mock://flock", page);
            let handle = driver.load_page(&PageTarget::new("mock://flock")).await.unwrap();

            assert_eq!(driver.count_matches(handle, ".bird").await.unwrap(), 2);
            assert_eq!(driver.count_matches(handle, "body").await.unwrap(), 1);
            assert_eq!(driver.count_matches(handle, ".ghost").await.unwrap(), 0);

            let second = driver.query_nth_bounding_box(handle, ".bird", 1).await.unwrap().unwrap();
            assert_eq!(second.top, 900.0);
            let state = driver.query_nth_computed_state(handle, ".bird", 1).await.unwrap().unwrap();
            assert!(state.class_list.contains("fly"));
            assert!(driver.query_nth_bounding_box(handle, ".bird", 2).await.unwrap().is_none());
            assert!(driver.was_called("query_bounding_box:.bird[1]"));
        }

        #[tokio::test]
        async fn test_lose_after_ops() {
            let page = bird_page().lose_after(1);
            let mut driver = MockDriver::new().with_page("mock://flaky", page);
            let handle = driver.load_page(&PageTarget::new("mock://flaky")).await.unwrap();

            assert!(driver.current_viewport(handle).await.is_ok());
            let err = driver.current_viewport(handle).await.unwrap_err();
            assert!(matches!(err, ProbeError::SessionLost { .. }));
        }

        #[tokio::test]
        async fn test_close_removes_page() {
            let mut driver = MockDriver::new().with_page("mock://birds", bird_page());
            let handle = driver.load_page(&PageTarget::new("mock://birds")).await.unwrap();
            assert_eq!(driver.open_pages(), 1);
            driver.close(handle).await.unwrap();
            assert_eq!(driver.open_pages(), 0);
            assert!(driver.close(handle).await.is_err());
        }
    }

    #[test]
    fn test_session_error_mapping() {
        let lost = session_error(ProbeError::config("bad"));
        assert_eq!(lost.kind(), "SessionLost");
        let kept = session_error(ProbeError::Cancelled { ms: 5 });
        assert_eq!(kept.kind(), "Cancelled");
    }
}
