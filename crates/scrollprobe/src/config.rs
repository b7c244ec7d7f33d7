//! Harness configuration and target definitions.
//!
//! Every tunable the exploratory scripts hard-coded (selectors, wait times,
//! scroll distances, margins) is an explicit value here and is passed into
//! sessions; there are no globals.

use crate::animation::ClassMarkers;
use crate::geometry::VisibilityPolicy;
use crate::result::{ProbeError, ProbeResult};
use crate::scroll::{Checkpoint, DEFAULT_SETTLE_MS};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default root marker: any loaded document has a body
pub const DEFAULT_MARKER: &str = "body";

/// Default time to wait for the root marker after load (5 seconds)
pub const DEFAULT_LOAD_TIMEOUT_MS: u64 = 5_000;

/// Default marker polling interval (100ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// One page to verify
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageTarget {
    /// Stable identifier used in the report
    pub id: String,
    /// URL handed to the page driver
    pub url: String,
    /// Essential marker that must be present before sampling
    pub marker: String,
    /// Selectors of tracked actors
    pub actors: Vec<String>,
    /// Further elements the page is expected to contain
    pub expected: Vec<String>,
}

impl PageTarget {
    /// Target identified by its URL with default marker and no actors
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            id: url.clone(),
            url,
            marker: DEFAULT_MARKER.to_string(),
            actors: Vec::new(),
            expected: Vec::new(),
        }
    }

    /// Set the report identifier
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the root marker
    #[must_use]
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    /// Track an actor
    #[must_use]
    pub fn with_actor(mut self, selector: impl Into<String>) -> Self {
        self.actors.push(selector.into());
        self
    }

    /// Track several actors
    #[must_use]
    pub fn with_actors<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actors.extend(selectors.into_iter().map(Into::into));
        self
    }

    /// Expect an element to be present
    #[must_use]
    pub fn with_expected(mut self, selector: impl Into<String>) -> Self {
        self.expected.push(selector.into());
        self
    }
}

/// Values shared by every target that does not set its own
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetDefaults {
    /// Root marker
    pub marker: Option<String>,
    /// Tracked actors
    pub actors: Vec<String>,
    /// Expected elements
    pub expected: Vec<String>,
}

/// A target as written in a targets file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetSpec {
    /// Identifier (defaults to the URL)
    pub id: Option<String>,
    /// URL
    pub url: String,
    /// Root marker
    pub marker: Option<String>,
    /// Tracked actors
    pub actors: Vec<String>,
    /// Expected elements
    pub expected: Vec<String>,
}

/// One entry of a targets list: a bare URL or a full target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetEntry {
    /// Just a URL
    Url(String),
    /// Full target definition
    Spec(TargetSpec),
}

/// Contents of a targets file (YAML or JSON)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetFile {
    /// A bare list of targets
    List(Vec<TargetEntry>),
    /// Targets with shared defaults
    Document {
        /// Shared defaults
        #[serde(default)]
        defaults: TargetDefaults,
        /// Targets
        targets: Vec<TargetEntry>,
    },
}

impl TargetFile {
    /// Parse YAML (a superset of JSON)
    pub fn parse(text: &str) -> ProbeResult<Self> {
        Ok(serde_yaml_ng::from_str(text)?)
    }

    /// Read and parse a file
    pub fn load(path: &Path) -> ProbeResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Resolve entries into targets, applying file defaults then `fallback`
    pub fn into_targets(self, fallback: &TargetDefaults) -> ProbeResult<Vec<PageTarget>> {
        let (defaults, entries) = match self {
            Self::List(entries) => (TargetDefaults::default(), entries),
            Self::Document { defaults, targets } => (defaults, targets),
        };
        entries
            .into_iter()
            .map(|entry| resolve_entry(entry, &defaults, fallback))
            .collect()
    }
}

fn resolve_entry(
    entry: TargetEntry,
    defaults: &TargetDefaults,
    fallback: &TargetDefaults,
) -> ProbeResult<PageTarget> {
    let spec = match entry {
        TargetEntry::Url(url) => TargetSpec {
            url,
            ..TargetSpec::default()
        },
        TargetEntry::Spec(spec) => spec,
    };

    let url = spec.url.trim().to_string();
    if url.is_empty() {
        return Err(ProbeError::config("target without url"));
    }

    let pick = |own: Vec<String>, file: &[String], cli: &[String]| {
        if !own.is_empty() {
            own
        } else if !file.is_empty() {
            file.to_vec()
        } else {
            cli.to_vec()
        }
    };

    Ok(PageTarget {
        id: spec.id.unwrap_or_else(|| url.clone()),
        marker: spec
            .marker
            .or_else(|| defaults.marker.clone())
            .or_else(|| fallback.marker.clone())
            .unwrap_or_else(|| DEFAULT_MARKER.to_string()),
        actors: pick(spec.actors, defaults.actors.as_slice(), fallback.actors.as_slice()),
        expected: pick(
            spec.expected,
            defaults.expected.as_slice(),
            fallback.expected.as_slice(),
        ),
        url,
    })
}

/// Resolve a `--targets` argument.
///
/// An existing path is read as a targets file; anything else is a comma
/// separated list of URLs sharing `fallback`.
pub fn resolve_targets(arg: &str, fallback: &TargetDefaults) -> ProbeResult<Vec<PageTarget>> {
    let path = Path::new(arg);
    let targets = if path.is_file() {
        TargetFile::load(path)?.into_targets(fallback)?
    } else {
        let entries = arg
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|url| TargetEntry::Url(url.to_string()))
            .collect();
        TargetFile::List(entries).into_targets(fallback)?
    };

    if targets.is_empty() {
        return Err(ProbeError::config(format!("no targets in {arg}")));
    }
    Ok(targets)
}

/// Settings for one verification run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Settle delay after each scroll
    pub settle_ms: u64,
    /// Margin added around the viewport for visibility
    pub margin_px: f64,
    /// Checkpoint sequence, first one sampled without scrolling
    pub checkpoints: Vec<Checkpoint>,
    /// Class markers for the animation sampler
    pub markers: ClassMarkers,
    /// Visibility test
    pub visibility: VisibilityPolicy,
    /// Deadline for the whole run
    pub run_deadline_ms: Option<u64>,
    /// Time to wait for the root marker after load
    pub load_timeout_ms: u64,
    /// Marker polling interval
    pub poll_interval_ms: u64,
    /// Hold each page open this long before closing it (manual inspection)
    pub inspect_ms: Option<u64>,
    /// Viewport width requested from the driver
    pub viewport_width: u32,
    /// Viewport height requested from the driver
    pub viewport_height: u32,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            settle_ms: DEFAULT_SETTLE_MS,
            margin_px: 0.0,
            checkpoints: Checkpoint::default_sequence(),
            markers: ClassMarkers::default(),
            visibility: VisibilityPolicy::Anchor,
            run_deadline_ms: None,
            load_timeout_ms: DEFAULT_LOAD_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            inspect_ms: None,
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

impl HarnessConfig {
    /// Create new config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set settle delay
    #[must_use]
    pub const fn with_settle_ms(mut self, ms: u64) -> Self {
        self.settle_ms = ms;
        self
    }

    /// Set viewport margin
    #[must_use]
    pub const fn with_margin_px(mut self, margin: f64) -> Self {
        self.margin_px = margin;
        self
    }

    /// Set checkpoints
    #[must_use]
    pub fn with_checkpoints(mut self, checkpoints: Vec<Checkpoint>) -> Self {
        self.checkpoints = checkpoints;
        self
    }

    /// Set class markers
    #[must_use]
    pub fn with_markers(mut self, markers: ClassMarkers) -> Self {
        self.markers = markers;
        self
    }

    /// Set visibility policy
    #[must_use]
    pub const fn with_visibility(mut self, policy: VisibilityPolicy) -> Self {
        self.visibility = policy;
        self
    }

    /// Set run deadline
    #[must_use]
    pub const fn with_run_deadline_ms(mut self, ms: Option<u64>) -> Self {
        self.run_deadline_ms = ms;
        self
    }

    /// Set marker wait timeout
    #[must_use]
    pub const fn with_load_timeout_ms(mut self, ms: u64) -> Self {
        self.load_timeout_ms = ms;
        self
    }

    /// Set manual inspection hold
    #[must_use]
    pub const fn with_inspect_ms(mut self, ms: Option<u64>) -> Self {
        self.inspect_ms = ms;
        self
    }

    /// Set viewport size
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Settle delay as Duration
    #[must_use]
    pub const fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Marker wait timeout as Duration
    #[must_use]
    pub const fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    /// Poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Reject settings no run can use
    pub fn validate(&self) -> ProbeResult<()> {
        if self.checkpoints.is_empty() {
            return Err(ProbeError::config("at least one checkpoint is required"));
        }
        if !self.margin_px.is_finite() || self.margin_px < 0.0 {
            return Err(ProbeError::config(format!(
                "margin must be a non-negative number, got {}",
                self.margin_px
            )));
        }
        if self.viewport_width == 0 || self.viewport_height == 0 {
            return Err(ProbeError::config("viewport dimensions must be > 0"));
        }
        if self.poll_interval_ms == 0 {
            return Err(ProbeError::config("poll interval must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;

    mod harness_config_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let config = HarnessConfig::default();
            assert_eq!(config.settle_ms, 750);
            assert_eq!(config.checkpoints.len(), 4);
            assert_eq!(config.visibility, VisibilityPolicy::Anchor);
            assert!(config.validate().is_ok());
        }

        #[test]
        fn test_builder() {
            let config = HarnessConfig::new()
                .with_settle_ms(200)
                .with_margin_px(50.0)
                .with_viewport(800, 600)
                .with_run_deadline_ms(Some(60_000));
            assert_eq!(config.settle(), Duration::from_millis(200));
            assert_eq!(config.margin_px, 50.0);
            assert_eq!(config.viewport_width, 800);
            assert_eq!(config.run_deadline_ms, Some(60_000));
        }

        #[test]
        fn test_validate_rejects() {
            assert!(HarnessConfig::new().with_checkpoints(vec![]).validate().is_err());
            assert!(HarnessConfig::new().with_margin_px(-1.0).validate().is_err());
            assert!(HarnessConfig::new().with_viewport(0, 600).validate().is_err());
        }

        #[test]
        fn test_partial_yaml_uses_defaults() {
            let config: HarnessConfig =
                serde_yaml_ng::from_str("settle_ms: 100\ncheckpoints: [top, down500, up300, top]\n")
                    .unwrap();
            assert_eq!(config.settle_ms, 100);
            assert_eq!(config.checkpoints[2], Checkpoint::Up(300.0));
            assert_eq!(config.load_timeout_ms, DEFAULT_LOAD_TIMEOUT_MS);
        }
    }

    mod target_tests {
        use super::*;

        #[test]
        fn test_page_target_builder() {
            let target = PageTarget::new("file:///zen.html")
                .with_id("zen")
                .with_marker(".content-wrapper")
                .with_actors([".bird-1", ".bird-2"])
                .with_expected(".zen-title");
            assert_eq!(target.id, "zen");
            assert_eq!(target.actors.len(), 2);
            assert_eq!(target.expected, vec![".zen-title"]);
        }

        #[test]
        fn test_bare_list_of_urls() {
            let file = TargetFile::parse("- file:///a.html\n- file:///b.html\n").unwrap();
            let fallback = TargetDefaults {
                actors: vec![".bird".into()],
                ..TargetDefaults::default()
            };
            let targets = file.into_targets(&fallback).unwrap();
            assert_eq!(targets.len(), 2);
            assert_eq!(targets[0].id, "file:///a.html");
            assert_eq!(targets[0].marker, DEFAULT_MARKER);
            assert_eq!(targets[1].actors, vec![".bird"]);
        }

        #[test]
        fn test_document_with_defaults() {
            let yaml = r"
defaults:
  marker: .content-wrapper
  actors: [.bird-1, .bird-2]
targets:
  - id: zen
    url: file:///zen_garden_birds.html
    expected: [.zen-title, .zen-verse]
  - url: file:///iphone_minimal_birds.html
    marker: .dynamic-island
    actors: [.bird-3]
";
            let targets = TargetFile::parse(yaml)
                .unwrap()
                .into_targets(&TargetDefaults::default())
                .unwrap();
            assert_eq!(targets[0].id, "zen");
            assert_eq!(targets[0].marker, ".content-wrapper");
            assert_eq!(targets[0].actors, vec![".bird-1", ".bird-2"]);
            assert_eq!(targets[0].expected.len(), 2);
            assert_eq!(targets[1].marker, ".dynamic-island");
            assert_eq!(targets[1].actors, vec![".bird-3"]);
        }

        #[test]
        fn test_json_is_accepted() {
            let json = r#"[{"url": "file:///a.html", "actors": [".x"]}, "file:///b.html"]"#;
            let targets = TargetFile::parse(json)
                .unwrap()
                .into_targets(&TargetDefaults::default())
                .unwrap();
            assert_eq!(targets.len(), 2);
            assert_eq!(targets[0].actors, vec![".x"]);
            assert!(targets[1].actors.is_empty());
        }

        #[test]
        fn test_empty_url_rejected() {
            let err = TargetFile::parse("- url: '  '\n")
                .unwrap()
                .into_targets(&TargetDefaults::default())
                .unwrap_err();
            assert_eq!(err.kind(), "Config");
        }

        #[test]
        fn test_resolve_comma_list() {
            let targets = resolve_targets(
                "http://localhost:8080/a, http://localhost:8080/b,",
                &TargetDefaults::default(),
            )
            .unwrap();
            assert_eq!(targets.len(), 2);
            assert_eq!(targets[1].url, "http://localhost:8080/b");
        }

        #[test]
        fn test_resolve_file() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "- id: one\n  url: mock://one\n  actors: [.bird]").unwrap();
            let targets =
                resolve_targets(file.path().to_str().unwrap(), &TargetDefaults::default()).unwrap();
            assert_eq!(targets[0].id, "one");
        }

        #[test]
        fn test_resolve_empty_is_error() {
            assert!(resolve_targets(" , ", &TargetDefaults::default()).is_err());
        }
    }
}
