//! Animation state sampler.
//!
//! Classifies an actor's animation state from a snapshot of its class list and
//! computed `animation-name`. Never looks at timing or position.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The computed-style value meaning "no animation running"
pub const NO_ANIMATION: &str = "none";

/// Classified animation state of an actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimationState {
    /// Resting (idle or perched)
    Idle,
    /// In flight
    Flying,
    /// Neither marker present; a classification gap
    Unknown,
}

impl AnimationState {
    /// Check if state is `Flying`
    #[must_use]
    pub const fn is_flying(self) -> bool {
        matches!(self, Self::Flying)
    }

    /// Check if state is `Unknown`
    #[must_use]
    pub const fn is_unknown(self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl std::fmt::Display for AnimationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Flying => write!(f, "flying"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Raw state snapshot reported by the page driver
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputedState {
    /// Class names on the element
    pub class_list: BTreeSet<String>,
    /// Computed `animation-name` (`none` when no animation runs)
    pub animation: String,
}

impl ComputedState {
    /// Create a snapshot from classes and an animation name
    #[must_use]
    pub fn new<I, S>(classes: I, animation: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            class_list: classes.into_iter().map(Into::into).collect(),
            animation: animation.into(),
        }
    }

    /// Snapshot with the given classes and no running animation
    #[must_use]
    pub fn classes<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(classes, NO_ANIMATION)
    }

    /// Whether a non-sentinel animation is running
    #[must_use]
    pub fn is_animating(&self) -> bool {
        let name = self.animation.trim();
        !name.is_empty() && name != NO_ANIMATION
    }
}

/// Class names that mark flight and rest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassMarkers {
    /// Classes marking active flight
    pub flying: Vec<String>,
    /// Classes marking an idle or perched actor
    pub idle: Vec<String>,
}

impl Default for ClassMarkers {
    fn default() -> Self {
        Self {
            flying: vec!["fly".to_string(), "flying".to_string()],
            idle: vec!["idle".to_string(), "perched".to_string()],
        }
    }
}

impl ClassMarkers {
    /// Create markers from explicit lists
    #[must_use]
    pub fn new(flying: Vec<String>, idle: Vec<String>) -> Self {
        Self { flying, idle }
    }
}

/// Classify one snapshot.
///
/// Flight wins over rest: a flying class or a running animation yields
/// `Flying` even when an idle class is also present.
#[must_use]
pub fn classify(markers: &ClassMarkers, state: &ComputedState) -> AnimationState {
    let has = |names: &[String]| names.iter().any(|n| state.class_list.contains(n));

    if has(&markers.flying) || state.is_animating() {
        AnimationState::Flying
    } else if has(&markers.idle) {
        AnimationState::Idle
    } else {
        AnimationState::Unknown
    }
}

/// True if the sequence contains an `Idle` directly followed by `Flying`
#[must_use]
pub fn has_idle_to_flying(states: &[AnimationState]) -> bool {
    states
        .windows(2)
        .any(|w| w[0] == AnimationState::Idle && w[1] == AnimationState::Flying)
}
