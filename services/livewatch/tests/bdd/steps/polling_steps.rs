//! Steps that run polling cycles and inspect observed state

use cucumber::{then, when};

use livewatch::state::ObservedState;

use crate::steps::source_steps::parse_snapshot;
use crate::world::LivewatchWorld;

#[when("a polling cycle runs")]
async fn cycle_runs(world: &mut LivewatchWorld) {
    world.run_cycle().await;
}

#[when(expr = "{string} is polled as {word}")]
async fn polled_as(world: &mut LivewatchWorld, id: String, result: String) {
    world.source().push(&id, parse_snapshot(&result)).await;
    world.run_cycle().await;
}

#[when(expr = "{string} is polled with item {string}")]
async fn polled_with_item(world: &mut LivewatchWorld, id: String, item: String) {
    world
        .source()
        .push(&id, parse_snapshot(&format!("item {}", item)))
        .await;
    world.run_cycle().await;
}

#[then(expr = "{string} should be observed as live")]
fn observed_live(world: &mut LivewatchWorld, id: String) {
    let observed = world.scheduler().store().observed(&id).cloned();
    assert!(
        observed.as_ref().is_some_and(ObservedState::is_live),
        "Expected {} to be live, got {:?}",
        id,
        observed
    );
}

#[then(expr = "{string} should be observed as offline")]
fn observed_offline(world: &mut LivewatchWorld, id: String) {
    let observed = world.scheduler().store().observed(&id).cloned();
    assert!(
        matches!(observed, Some(ObservedState::Observed { is_live: false, .. })),
        "Expected {} to be offline, got {:?}",
        id,
        observed
    );
}

#[then(expr = "{string} should remember item {string}")]
fn remembers_item(world: &mut LivewatchWorld, id: String, item: String) {
    let observed = world.scheduler().store().observed(&id).cloned();
    assert_eq!(
        observed.as_ref().and_then(|o| o.item_id()),
        Some(item.as_str())
    );
}

#[then(expr = "{string} should still be unobserved")]
fn still_unobserved(world: &mut LivewatchWorld, id: String) {
    let observed = world.scheduler().store().observed(&id).cloned();
    assert_eq!(observed, Some(ObservedState::Unobserved));
}

#[then(expr = "{string} should have {int} consecutive error(s)")]
fn consecutive_errors(world: &mut LivewatchWorld, id: String, count: u32) {
    let status = world
        .scheduler()
        .store()
        .status(&id)
        .cloned()
        .expect("unknown target");
    assert_eq!(status.consecutive_errors, count);
}

#[then(expr = "the cycle should report {int} failed fetch(es)")]
fn cycle_failures(world: &mut LivewatchWorld, count: usize) {
    let report = world.last_report.expect("no cycle has run");
    assert_eq!(report.failed, count);
}
