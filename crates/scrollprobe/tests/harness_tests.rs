//! End-to-end harness runs against scripted pages.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use scrollprobe::{
    is_in_viewport, is_rendered, resolve_targets, AnimationState, BoundingBox, Checkpoint,
    ComputedState, HarnessConfig, MockActor, MockDriver, MockPage, MultiPageRunner, PageSession,
    PageTarget, SessionState, StateScript, TargetDefaults, Viewport, NO_ACTORS_TRACKED,
};
use std::time::Duration;

fn perched() -> ComputedState {
    ComputedState::classes(["bird-wrapper", "perched"])
}

fn flying() -> ComputedState {
    ComputedState::new(["bird-wrapper", "fly"], "flap")
}

fn config() -> HarnessConfig {
    HarnessConfig::default().with_settle_ms(250)
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_actor_in_800x600_viewport() {
    let viewport = Viewport::new(800.0, 600.0, 0.0);
    let bbox = BoundingBox::new(100.0, 100.0, 50.0, 50.0);
    assert!(is_in_viewport(&bbox, &viewport, 0.0));
    assert!(is_rendered(&bbox));
}

#[tokio::test(start_paused = true)]
async fn test_idle_flying_flying_idle_counts_one_transition() {
    let actor = MockActor::new(100.0, 100.0, 50.0, 50.0).with_script(StateScript::Sequence(vec![
        perched(),
        flying(),
        flying(),
        perched(),
    ]));
    let page = MockPage::new(800.0, 600.0)
        .with_document_height(3000.0)
        .with_actor(".bird", actor);
    let driver = MockDriver::new().with_page("mock://story", page);
    let config = config().with_checkpoints(
        ["top", "down500", "up300", "top"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect(),
    );

    let mut runner = MultiPageRunner::new(driver, config);
    let report = runner
        .run(&[PageTarget::new("mock://story").with_actor(".bird")])
        .await;

    let verdict = &report.verdicts[0];
    assert_eq!(verdict.transitioned_to_flying, 1);
    assert_eq!(
        verdict.actors[0].states,
        vec![
            AnimationState::Idle,
            AnimationState::Flying,
            AnimationState::Flying,
            AnimationState::Idle
        ]
    );
    assert!(verdict.is_passing());
}

#[tokio::test(start_paused = true)]
async fn test_lost_second_page_does_not_stop_run() {
    let good = || {
        MockPage::new(800.0, 600.0).with_actor(".bird", MockActor::new(50.0, 50.0, 40.0, 40.0))
    };
    let driver = MockDriver::new()
        .with_page("mock://one", good())
        .with_page("mock://two", good().unreachable())
        .with_page("mock://three", good());
    let targets: Vec<PageTarget> = ["mock://one", "mock://two", "mock://three"]
        .iter()
        .map(|url| PageTarget::new(*url).with_actor(".bird"))
        .collect();

    let mut runner = MultiPageRunner::new(driver, config());
    let report = runner.run(&targets).await;

    assert_eq!(report.verdicts.len(), 3);
    assert!(report.verdicts[0].is_passing());
    assert!(!report.verdicts[1].is_passing());
    assert_eq!(report.verdicts[1].anomalies, vec!["session-error: SessionLost"]);
    assert!(report.verdicts[2].is_passing());
    assert_eq!((report.summary.pass, report.summary.fail), (2, 1));
}

#[tokio::test(start_paused = true)]
async fn test_unclassifiable_actor_fails_page() {
    let page = MockPage::new(800.0, 600.0)
        .with_actor(".good", MockActor::new(50.0, 50.0, 40.0, 40.0))
        .with_actor(
            ".odd",
            MockActor::new(80.0, 80.0, 40.0, 40.0)
                .with_script(StateScript::Fixed(ComputedState::classes(["bird-wrapper"]))),
        );
    let driver = MockDriver::new().with_page("mock://odd", page);
    let target = PageTarget::new("mock://odd").with_actors([".good", ".odd"]);

    let mut runner = MultiPageRunner::new(driver, config());
    let report = runner.run(&[target]).await;
    let verdict = &report.verdicts[0];

    assert!(verdict.actors[1].states.iter().all(|s| s.is_unknown()));
    assert!(verdict
        .anomalies
        .iter()
        .any(|a| a.starts_with("classification-gap: .odd")));
    assert!(!verdict.is_passing());
}

#[tokio::test(start_paused = true)]
async fn test_zero_actors_is_not_passing() {
    let driver = MockDriver::new().with_page("mock://empty", MockPage::new(800.0, 600.0));
    let mut runner = MultiPageRunner::new(driver, config());

    let report = runner.run(&[PageTarget::new("mock://empty")]).await;
    let verdict = &report.verdicts[0];

    assert_eq!(verdict.checkpoints.len(), 4);
    assert!(verdict.anomalies.iter().any(|a| a == NO_ACTORS_TRACKED));
    assert!(!verdict.is_passing());
}

#[tokio::test(start_paused = true)]
async fn test_missing_actor_is_dead_not_an_error() {
    let driver = MockDriver::new().with_page("mock://bare", MockPage::new(800.0, 600.0));
    let mut runner = MultiPageRunner::new(driver, config());

    let report = runner
        .run(&[PageTarget::new("mock://bare").with_actor(".ghost")])
        .await;
    let verdict = &report.verdicts[0];

    assert!(verdict.error.is_none());
    assert_eq!(verdict.visible_at_checkpoint, vec![0, 0, 0, 0]);
    assert_eq!(
        verdict.anomalies,
        vec![
            "classification-gap: .ghost unclassified at checkpoints [0, 1, 2, 3]",
            "dead-actor: .ghost never rendered",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_group_selector_tracks_every_bird() {
    let page = MockPage::new(800.0, 600.0)
        .with_document_height(3000.0)
        .with_actor(".bird-wrapper", MockActor::new(100.0, 100.0, 40.0, 30.0).flies_after(300))
        .with_actor(".bird-wrapper", MockActor::new(200.0, 300.0, 40.0, 30.0).flies_after(300))
        .with_actor(".bird-wrapper", MockActor::new(400.0, 500.0, 0.0, 0.0));
    let driver = MockDriver::new().with_page("mock://flock", page);

    let mut runner = MultiPageRunner::new(driver, config());
    let report = runner
        .run(&[PageTarget::new("mock://flock").with_actor(".bird-wrapper")])
        .await;

    let verdict = &report.verdicts[0];
    assert_eq!(verdict.total_actors, 3);
    assert_eq!(verdict.visible_at_checkpoint, vec![3, 0, 0, 3]);
    assert_eq!(verdict.transitioned_to_flying, 2);
    assert_eq!(verdict.anomalies, vec!["dead-actor: .bird-wrapper[2] never rendered"]);
    let traced: Vec<&str> = verdict.actors.iter().map(|t| t.selector.as_str()).collect();
    assert_eq!(traced, vec![".bird-wrapper[0]", ".bird-wrapper[1]", ".bird-wrapper[2]"]);
    assert!(!report.is_success());
}

// ============================================================================
// Properties
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_sampling_static_page_is_idempotent() {
    let page = MockPage::new(800.0, 600.0)
        .with_document_height(2000.0)
        .with_actor(".bird", MockActor::new(300.0, 20.0, 40.0, 40.0))
        .with_actor(".sun", MockActor::new(10.0, 700.0, 80.0, 80.0).fixed());
    let mut driver = MockDriver::new().with_page("mock://still", page);
    let target = PageTarget::new("mock://still").with_actors([".bird", ".sun"]);
    let config = config();

    let mut session = PageSession::new(&mut driver, &target, &config);
    session.load().await.unwrap();
    session.scroll(Checkpoint::Down(200.0)).await.unwrap();
    let first = session.sample(Checkpoint::Down(200.0)).await.unwrap().clone();
    tokio::time::sleep(Duration::from_secs(1)).await;
    let second = session.sample(Checkpoint::Down(200.0)).await.unwrap().clone();

    assert!(first.same_observation(&second));
    assert_ne!(first.index, second.index);
    session.abort().await;
    assert_eq!(session.state(), SessionState::Aborted);
}

#[tokio::test(start_paused = true)]
async fn test_fixed_actor_stays_visible() {
    let page = MockPage::new(800.0, 600.0)
        .with_document_height(5000.0)
        .with_actor(".badge", MockActor::new(20.0, 20.0, 30.0, 30.0).fixed());
    let driver = MockDriver::new().with_page("mock://fixed", page);
    let config = config().with_checkpoints(Checkpoint::sequence(6, 700.0));

    let mut runner = MultiPageRunner::new(driver, config);
    let report = runner
        .run(&[PageTarget::new("mock://fixed").with_actor(".badge")])
        .await;
    assert_eq!(report.verdicts[0].visible_at_checkpoint, vec![1; 6]);
}

// ============================================================================
// Deadline and configuration
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_run_deadline_records_cancelled_pages() {
    let page = MockPage::new(800.0, 600.0)
        .with_document_height(3000.0)
        .with_actor(".bird", MockActor::new(50.0, 50.0, 40.0, 40.0));
    let driver = MockDriver::new()
        .with_page("mock://a", page.clone())
        .with_page("mock://b", page.clone())
        .with_page("mock://c", page);
    // One page takes 3 settles of 1s each
    let config = HarnessConfig::default()
        .with_settle_ms(1_000)
        .with_run_deadline_ms(Some(4_500));
    let targets: Vec<PageTarget> = ["mock://a", "mock://b", "mock://c"]
        .iter()
        .map(|url| PageTarget::new(*url).with_actor(".bird"))
        .collect();

    let mut runner = MultiPageRunner::new(driver, config);
    let report = runner.run(&targets).await;

    assert_eq!(report.verdicts.len(), 3);
    assert!(report.verdicts[0].is_passing());
    assert_eq!(report.verdicts[1].anomalies, vec!["session-error: Cancelled"]);
    assert_eq!(report.verdicts[2].anomalies, vec!["session-error: Cancelled"]);
    assert_eq!(runner.into_driver().open_pages(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_targets_file_drives_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("targets.yaml");
    std::fs::write(
        &path,
        "defaults:\n  actors: ['.bird']\ntargets:\n  - mock://home\n  - url: mock://about\n    id: about\n    marker: '#stage'\n",
    )
    .unwrap();
    let targets = resolve_targets(path.to_str().unwrap(), &TargetDefaults::default()).unwrap();
    assert_eq!(targets.len(), 2);

    let bird = MockActor::new(60.0, 60.0, 40.0, 40.0);
    let driver = MockDriver::new()
        .with_page("mock://home", MockPage::new(800.0, 600.0).with_actor(".bird", bird.clone()))
        .with_page(
            "mock://about",
            MockPage::new(800.0, 600.0)
                .with_element("#stage")
                .with_actor(".bird", bird),
        );

    let mut runner = MultiPageRunner::new(driver, config());
    let report = runner.run(&targets).await;
    let ids: Vec<&str> = report.verdicts.iter().map(|v| v.page_id.as_str()).collect();
    assert_eq!(ids, vec!["mock://home", "about"]);
    assert!(report.is_success());
}
