//! Verdict reduction: turns one page's samples into a pass/fail judgment.

use crate::animation::{has_idle_to_flying, AnimationState};
use crate::result::ProbeError;
use crate::sample::Sample;
use serde::{Deserialize, Serialize};

/// Anomaly recorded when a session tracks no actors at all
pub const NO_ACTORS_TRACKED: &str = "no actors tracked";

/// Per-actor history across one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorTrace {
    /// Actor selector
    pub selector: String,
    /// Classified state at each checkpoint
    pub states: Vec<AnimationState>,
    /// In-viewport flag at each checkpoint
    pub in_viewport: Vec<bool>,
    /// Number of samples where the actor had a positive-area box
    pub rendered_samples: usize,
}

impl ActorTrace {
    /// Whether the state sequence contains an `Idle` → `Flying` step
    #[must_use]
    pub fn transitioned_to_flying(&self) -> bool {
        has_idle_to_flying(&self.states)
    }

    /// Checkpoint indices where the actor could not be classified
    #[must_use]
    pub fn unknown_at(&self) -> Vec<usize> {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_unknown())
            .map(|(i, _)| i)
            .collect()
    }
}

/// Judgment for one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    /// Target identifier
    pub page_id: String,
    /// Checkpoint labels, aligned with `visible_at_checkpoint`
    pub checkpoints: Vec<String>,
    /// Number of tracked actors
    pub total_actors: usize,
    /// Actors inside the viewport, per checkpoint
    pub visible_at_checkpoint: Vec<usize>,
    /// Actors whose state went from `Idle` to `Flying` at some point
    pub transitioned_to_flying: usize,
    /// Everything that went wrong, in detection order
    pub anomalies: Vec<String>,
    /// Per-actor traces
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actors: Vec<ActorTrace>,
    /// Session error message, if the session was aborted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Verdict {
    /// Failed verdict for an aborted session
    #[must_use]
    pub fn session_error(
        page_id: impl Into<String>,
        total_actors: usize,
        err: &ProbeError,
    ) -> Self {
        Self {
            page_id: page_id.into(),
            checkpoints: Vec::new(),
            total_actors,
            visible_at_checkpoint: Vec::new(),
            transitioned_to_flying: 0,
            anomalies: vec![format!("session-error: {}", err.kind())],
            actors: Vec::new(),
            error: Some(err.to_string()),
        }
    }

    /// No anomalies and at least one actor visible at the first checkpoint
    #[must_use]
    pub fn is_passing(&self) -> bool {
        self.anomalies.is_empty() && self.visible_at_checkpoint.first().is_some_and(|&n| n > 0)
    }

    /// Whether this verdict comes from an aborted session
    #[must_use]
    pub const fn is_session_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Reduce a completed session's samples into a verdict.
///
/// `missing` lists expected selectors that were absent after load; each one
/// becomes a `missing-element` anomaly ahead of the actor anomalies.
#[must_use]
pub fn reduce_samples(
    page_id: &str,
    selectors: &[String],
    samples: &[Sample],
    missing: &[String],
) -> Verdict {
    let traces: Vec<ActorTrace> = selectors
        .iter()
        .map(|selector| trace_actor(selector, samples))
        .collect();

    let mut anomalies: Vec<String> = missing
        .iter()
        .map(|sel| format!("missing-element: {sel}"))
        .collect();

    if selectors.is_empty() {
        anomalies.push(NO_ACTORS_TRACKED.to_string());
    }

    for trace in &traces {
        let unknown = trace.unknown_at();
        if !unknown.is_empty() {
            anomalies.push(format!(
                "classification-gap: {} unclassified at checkpoints {:?}",
                trace.selector, unknown
            ));
        }
        if trace.rendered_samples == 0 {
            anomalies.push(format!("dead-actor: {} never rendered", trace.selector));
        }
    }

    Verdict {
        page_id: page_id.to_string(),
        checkpoints: samples.iter().map(|s| s.checkpoint.to_string()).collect(),
        total_actors: selectors.len(),
        visible_at_checkpoint: samples.iter().map(Sample::visible_count).collect(),
        transitioned_to_flying: traces.iter().filter(|t| t.transitioned_to_flying()).count(),
        anomalies,
        actors: traces,
        error: None,
    }
}

fn trace_actor(selector: &str, samples: &[Sample]) -> ActorTrace {
    let mut trace = ActorTrace {
        selector: selector.to_string(),
        states: Vec::with_capacity(samples.len()),
        in_viewport: Vec::with_capacity(samples.len()),
        rendered_samples: 0,
    };
    for sample in samples {
        match sample.actor(selector) {
            Some(entry) => {
                trace.states.push(entry.actor.animation_state);
                trace.in_viewport.push(entry.actor.visibility_flag);
                if entry.rendered {
                    trace.rendered_samples += 1;
                }
            }
            None => {
                trace.states.push(AnimationState::Unknown);
                trace.in_viewport.push(false);
            }
        }
    }
    trace
}
