//! Geometry probe: viewport-relative visibility of actor bounding boxes.
//!
//! Pure functions over data supplied by the page driver. Box coordinates are
//! viewport-relative (what `getBoundingClientRect` reports), so an element at
//! `top == 0` sits on the top edge of the visible window whatever the scroll
//! offset is.

use serde::{Deserialize, Serialize};

/// The visible window at sample time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    /// Visible width in CSS pixels
    pub width: f64,
    /// Visible height in CSS pixels
    pub height: f64,
    /// Vertical scroll offset of the document
    pub scroll_y: f64,
}

impl Viewport {
    /// Create a viewport. Overscroll (negative offsets) is clamped to 0.
    #[must_use]
    pub fn new(width: f64, height: f64, scroll_y: f64) -> Self {
        Self {
            width,
            height,
            scroll_y: scroll_y.max(0.0),
        }
    }

    /// Whether the dimensions describe a real window
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.scroll_y >= 0.0
    }

    /// Same window scrolled to another offset
    #[must_use]
    pub fn scrolled_to(self, scroll_y: f64) -> Self {
        Self::new(self.width, self.height, scroll_y)
    }
}

/// Bounding box of an element, relative to the viewport origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Top edge
    pub top: f64,
    /// Left edge
    pub left: f64,
    /// Width (0 means hidden-but-present)
    pub width: f64,
    /// Height (0 means hidden-but-present)
    pub height: f64,
}

impl BoundingBox {
    /// Create a new bounding box
    #[must_use]
    pub const fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    /// Bottom edge
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Right edge
    #[must_use]
    pub fn right(&self) -> f64 {
        self.left + self.width
    }
}

/// How "visible" is decided for an actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityPolicy {
    /// The top-left anchor point lies inside the (margin-expanded) viewport
    #[default]
    Anchor,
    /// Any part of the box overlaps the (margin-expanded) viewport
    Intersection,
}

impl VisibilityPolicy {
    /// Apply this policy to a box
    #[must_use]
    pub fn is_visible(self, bbox: &BoundingBox, viewport: &Viewport, margin: f64) -> bool {
        match self {
            Self::Anchor => is_in_viewport(bbox, viewport, margin),
            Self::Intersection => intersects_viewport(bbox, viewport, margin),
        }
    }
}

impl std::fmt::Display for VisibilityPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anchor => write!(f, "anchor"),
            Self::Intersection => write!(f, "intersection"),
        }
    }
}

impl std::str::FromStr for VisibilityPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "anchor" => Ok(Self::Anchor),
            "intersection" => Ok(Self::Intersection),
            other => Err(format!("unknown visibility policy: {other}")),
        }
    }
}

/// Edge-inclusive anchor-point test.
///
/// True iff `top` lies within `[-margin, height + margin]` and `left` lies
/// within `[-margin, width + margin]`.
#[must_use]
pub fn is_in_viewport(bbox: &BoundingBox, viewport: &Viewport, margin: f64) -> bool {
    bbox.top >= -margin
        && bbox.top <= viewport.height + margin
        && bbox.left >= -margin
        && bbox.left <= viewport.width + margin
}

/// Edge-inclusive rectangle overlap test.
#[must_use]
pub fn intersects_viewport(bbox: &BoundingBox, viewport: &Viewport, margin: f64) -> bool {
    bbox.top <= viewport.height + margin
        && bbox.bottom() >= -margin
        && bbox.left <= viewport.width + margin
        && bbox.right() >= -margin
}

/// True iff the box has positive area. Negative dimensions count as not rendered.
#[must_use]
pub fn is_rendered(bbox: &BoundingBox) -> bool {
    bbox.width > 0.0 && bbox.height > 0.0
}
