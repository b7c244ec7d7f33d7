//! Browser control for real pages.
//!
//! With the `browser` feature, `CdpDriver` drives Chromium over the Chrome
//! `DevTools` Protocol via chromiumoxide. Launch flags live here and nowhere
//! else; the harness only sees the `PageDriver` trait.

use serde::{Deserialize, Serialize};

/// Browser launch configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Window width
    pub viewport_width: u32,
    /// Window height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            chromium_path: None,
            sandbox: true,
        }
    }
}

impl BrowserConfig {
    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

// ============================================================================
// CDP driver (when `browser` feature is enabled)
// ============================================================================

#[cfg(feature = "browser")]
#[allow(clippy::missing_errors_doc, clippy::significant_drop_tightening)]
mod cdp {
    use super::BrowserConfig;
    use crate::animation::ComputedState;
    use crate::config::PageTarget;
    use crate::driver::{PageDriver, PageHandle};
    use crate::geometry::{BoundingBox, Viewport};
    use crate::result::{ProbeError, ProbeResult};
    use crate::scroll::ScrollInstruction;
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::handler::viewport::Viewport as CdpViewport;
    use chromiumoxide::page::Page as CdpPage;
    use futures::StreamExt;
    use serde::Deserialize;
    use std::collections::HashMap;
    use tracing::{debug, warn};

    #[derive(Deserialize)]
    struct StateProbe {
        found: bool,
        #[serde(flatten)]
        state: ComputedState,
    }

    fn lost(e: impl std::fmt::Display) -> ProbeError {
        ProbeError::session_lost(e.to_string())
    }

    fn selector_literal(selector: &str) -> ProbeResult<String> {
        Ok(serde_json::to_string(selector)?)
    }

    /// Expression for the `nth` match of `selector`, `undefined` when absent
    fn nth_match(selector: &str, nth: usize) -> ProbeResult<String> {
        Ok(format!(
            "document.querySelectorAll({})[{nth}]",
            selector_literal(selector)?
        ))
    }

    /// Emulated viewport; chromiumoxide would otherwise emulate 800x600
    fn cdp_viewport(config: &BrowserConfig) -> CdpViewport {
        CdpViewport {
            width: config.viewport_width,
            height: config.viewport_height,
            ..CdpViewport::default()
        }
    }

    fn cdp_config(config: &BrowserConfig) -> ProbeResult<CdpConfig> {
        let mut builder = CdpConfig::builder()
            .window_size(config.viewport_width, config.viewport_height)
            .viewport(cdp_viewport(config));

        if !config.headless {
            builder = builder.with_head();
        }

        if !config.sandbox {
            builder = builder.no_sandbox();
        }

        if let Some(ref path) = config.chromium_path {
            builder = builder.chrome_executable(path);
        }

        builder.build().map_err(ProbeError::driver_unavailable)
    }

    /// Page driver backed by a Chromium instance
    #[derive(Debug)]
    pub struct CdpDriver {
        config: BrowserConfig,
        browser: CdpBrowser,
        handler: tokio::task::JoinHandle<()>,
        pages: HashMap<PageHandle, CdpPage>,
        next_handle: u64,
    }

    impl CdpDriver {
        /// Launch Chromium
        ///
        /// # Errors
        ///
        /// Returns `DriverUnavailable` if the browser cannot be launched
        pub async fn launch(config: BrowserConfig) -> ProbeResult<Self> {
            let (browser, mut handler) = CdpBrowser::launch(cdp_config(&config)?)
                .await
                .map_err(|e| ProbeError::driver_unavailable(e.to_string()))?;

            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });
            debug!(headless = config.headless, "chromium launched");

            Ok(Self {
                config,
                browser,
                handler,
                pages: HashMap::new(),
                next_handle: 0,
            })
        }

        /// Browser configuration
        #[must_use]
        pub const fn config(&self) -> &BrowserConfig {
            &self.config
        }

        /// Close every open page and the browser
        pub async fn shutdown(mut self) -> ProbeResult<()> {
            for (handle, page) in self.pages.drain() {
                if let Err(e) = page.close().await {
                    warn!(%handle, error = %e, "page close failed during shutdown");
                }
            }
            self.browser
                .close()
                .await
                .map_err(|e| ProbeError::driver_unavailable(e.to_string()))?;
            let _ = self.browser.wait().await;
            self.handler.abort();
            Ok(())
        }

        fn page(&self, handle: PageHandle) -> ProbeResult<&CdpPage> {
            self.pages
                .get(&handle)
                .ok_or_else(|| ProbeError::session_lost(format!("{handle} is closed")))
        }

        async fn eval<T: serde::de::DeserializeOwned>(
            &self,
            handle: PageHandle,
            js: String,
        ) -> ProbeResult<T> {
            let result = self.page(handle)?.evaluate(js).await.map_err(lost)?;
            result.into_value().map_err(lost)
        }
    }

    #[async_trait]
    impl PageDriver for CdpDriver {
        async fn load_page(&mut self, target: &PageTarget) -> ProbeResult<PageHandle> {
            let page = self.browser.new_page(target.url.as_str()).await.map_err(lost)?;
            page.wait_for_navigation().await.map_err(lost)?;

            self.next_handle += 1;
            let handle = PageHandle(self.next_handle);
            self.pages.insert(handle, page);
            Ok(handle)
        }

        async fn count_matches(
            &mut self,
            handle: PageHandle,
            selector: &str,
        ) -> ProbeResult<usize> {
            let js = format!(
                "document.querySelectorAll({}).length",
                selector_literal(selector)?
            );
            self.eval(handle, js).await
        }

        async fn query_nth_bounding_box(
            &mut self,
            handle: PageHandle,
            selector: &str,
            nth: usize,
        ) -> ProbeResult<Option<BoundingBox>> {
            let js = format!(
                "(() => {{ const el = {}; \
                 if (!el) return []; \
                 const r = el.getBoundingClientRect(); \
                 return [r.top, r.left, r.width, r.height]; }})()",
                nth_match(selector, nth)?
            );
            let rect: Vec<f64> = self.eval(handle, js).await?;
            Ok(match rect.as_slice() {
                &[top, left, width, height] => Some(BoundingBox::new(top, left, width, height)),
                _ => None,
            })
        }

        async fn query_nth_computed_state(
            &mut self,
            handle: PageHandle,
            selector: &str,
            nth: usize,
        ) -> ProbeResult<Option<ComputedState>> {
            let js = format!(
                "(() => {{ const el = {}; \
                 if (!el) return {{ found: false, classList: [], animation: 'none' }}; \
                 return {{ found: true, classList: Array.from(el.classList), \
                 animation: getComputedStyle(el).animationName }}; }})()",
                nth_match(selector, nth)?
            );
            let probe: StateProbe = self.eval(handle, js).await?;
            Ok(probe.found.then_some(probe.state))
        }

        async fn scroll(
            &mut self,
            handle: PageHandle,
            instruction: ScrollInstruction,
        ) -> ProbeResult<()> {
            let js = match instruction {
                ScrollInstruction::Absolute(y) => format!("window.scrollTo(0, {y})"),
                ScrollInstruction::Relative(dy) => format!("window.scrollBy(0, {dy})"),
            };
            self.page(handle)?.evaluate(js).await.map_err(lost)?;
            Ok(())
        }

        async fn current_viewport(&mut self, handle: PageHandle) -> ProbeResult<Viewport> {
            let js = "({ width: window.innerWidth, height: window.innerHeight, \
                      scrollY: window.scrollY })";
            let viewport: Viewport = self.eval(handle, js.to_string()).await?;
            Ok(Viewport::new(viewport.width, viewport.height, viewport.scroll_y))
        }

        async fn close(&mut self, handle: PageHandle) -> ProbeResult<()> {
            let page = self
                .pages
                .remove(&handle)
                .ok_or_else(|| ProbeError::session_lost(format!("{handle} is not open")))?;
            page.close().await.map_err(lost)
        }
    }

    #[cfg(test)]
    #[allow(clippy::unwrap_used, clippy::expect_used)]
    mod tests {
        use super::*;

        #[test]
        fn test_viewport_follows_config() {
            let viewport = cdp_viewport(&BrowserConfig::default().with_viewport(1024, 768));
            assert_eq!((viewport.width, viewport.height), (1024, 768));

            let viewport = cdp_viewport(&BrowserConfig::default());
            assert_eq!((viewport.width, viewport.height), (1280, 720));
        }

        #[test]
        fn test_launch_config_emulates_configured_viewport() {
            let config = BrowserConfig::default()
                .with_viewport(1024, 768)
                .with_chromium_path("/opt/chromium/chrome");
            let built = format!("{:?}", cdp_config(&config).unwrap());
            assert!(built.contains("width: 1024, height: 768"), "{built}");
            assert!(!built.contains("width: 800, height: 600"), "{built}");
        }

        #[test]
        fn test_nth_match_expression() {
            assert_eq!(
                nth_match(".bird-wrapper", 2).unwrap(),
                "document.querySelectorAll(\".bird-wrapper\")[2]"
            );
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::CdpDriver;
