//! Samples: snapshots of every tracked actor at one checkpoint.

use crate::animation::{classify, AnimationState, ClassMarkers, ComputedState};
use crate::geometry::{is_rendered, BoundingBox, Viewport, VisibilityPolicy};
use crate::scroll::Checkpoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One element a session tracks: the `nth` match of a selector.
///
/// A selector matching a single element keeps the selector as its key. A
/// selector matching several elements fans out into `selector[0]`,
/// `selector[1]`, ... in document order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackedActor {
    /// Key reported in samples and verdicts
    pub key: String,
    /// Selector handed to the driver
    pub selector: String,
    /// Match index within the selector
    pub nth: usize,
}

impl TrackedActor {
    /// Expand a selector that matched `matches` elements at load.
    ///
    /// No match still yields one actor, so the selector is reported as dead
    /// instead of silently dropped.
    #[must_use]
    pub fn expand(selector: &str, matches: usize) -> Vec<Self> {
        if matches <= 1 {
            return vec![Self {
                key: selector.to_string(),
                selector: selector.to_string(),
                nth: 0,
            }];
        }
        (0..matches)
            .map(|nth| Self {
                key: format!("{selector}[{nth}]"),
                selector: selector.to_string(),
                nth,
            })
            .collect()
    }
}

/// A tracked actor as observed at one checkpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    /// Stable selector identifying the actor within a session
    pub selector: String,
    /// Derived: anchor (or box) inside the viewport
    pub visibility_flag: bool,
    /// Classified animation state
    pub animation_state: AnimationState,
}

/// One actor's entry in a sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorSample {
    /// Actor identity and derived state
    pub actor: Actor,
    /// Bounding box, `None` when no element matched
    pub bounding_box: Option<BoundingBox>,
    /// Positive-area box
    pub rendered: bool,
}

impl ActorSample {
    /// Derive an actor sample from raw driver data
    #[must_use]
    pub fn observe(
        selector: &str,
        bounding_box: Option<BoundingBox>,
        raw_state: Option<&ComputedState>,
        viewport: &Viewport,
        config: &SampleRules<'_>,
    ) -> Self {
        let animation_state = raw_state.map_or(AnimationState::Unknown, |state| {
            classify(config.markers, state)
        });
        let visibility_flag = bounding_box
            .as_ref()
            .is_some_and(|b| config.visibility.is_visible(b, viewport, config.margin));
        let rendered = bounding_box.as_ref().is_some_and(is_rendered);

        Self {
            actor: Actor {
                selector: selector.to_string(),
                visibility_flag,
                animation_state,
            },
            bounding_box,
            rendered,
        }
    }

    /// Selector of the actor
    #[must_use]
    pub fn selector(&self) -> &str {
        &self.actor.selector
    }

    /// Whether the element exists on the page
    #[must_use]
    pub const fn is_present(&self) -> bool {
        self.bounding_box.is_some()
    }
}

/// Classification rules applied while sampling
#[derive(Debug, Clone, Copy)]
pub struct SampleRules<'a> {
    /// Class markers
    pub markers: &'a ClassMarkers,
    /// Visibility policy
    pub visibility: VisibilityPolicy,
    /// Viewport margin
    pub margin: f64,
}

/// Snapshot of the viewport and all actors at one checkpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    /// Position in the session's checkpoint sequence
    pub index: usize,
    /// Checkpoint this sample was taken at
    pub checkpoint: Checkpoint,
    /// Wall-clock time of the sample
    pub timestamp: DateTime<Utc>,
    /// Viewport at sample time
    pub viewport: Viewport,
    /// Actors in tracking order
    pub actors: Vec<ActorSample>,
}

impl Sample {
    /// Number of actors inside the viewport
    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.actors.iter().filter(|a| a.actor.visibility_flag).count()
    }

    /// Entry for a selector
    #[must_use]
    pub fn actor(&self, selector: &str) -> Option<&ActorSample> {
        self.actors.iter().find(|a| a.selector() == selector)
    }

    /// Same viewport and actor observations, ignoring when they were taken
    #[must_use]
    pub fn same_observation(&self, other: &Self) -> bool {
        self.viewport == other.viewport && self.actors == other.actors
    }
}
