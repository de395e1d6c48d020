//! Steps for webhook delivery outcomes

use cucumber::{given, then};

use crate::world::LivewatchWorld;

#[given("the webhook rejects deliveries")]
async fn webhook_rejects(world: &mut LivewatchWorld) {
    *world.notifier().rejecting.write().await = true;
}

#[given("the webhook accepts deliveries")]
async fn webhook_accepts(world: &mut LivewatchWorld) {
    *world.notifier().rejecting.write().await = false;
}

#[then(expr = "{int} notification(s) should have been sent")]
async fn notifications_sent(world: &mut LivewatchWorld, count: usize) {
    let sent = world.notifier().sent.read().await.len();
    assert_eq!(sent, count, "Expected {} notifications, got {}", count, sent);
}

#[then("no notification should have been sent")]
async fn nothing_sent(world: &mut LivewatchWorld) {
    let sent = world.notifier().sent.read().await.len();
    assert_eq!(sent, 0, "Expected no notifications, got {}", sent);
}

#[then(expr = "the last notification should contain {string}")]
async fn last_contains(world: &mut LivewatchWorld, expected: String) {
    let notifier = world.notifier();
    let sent = notifier.sent.read().await;
    let last = sent.last().expect("no notification sent");
    assert!(
        last.content.contains(&expected),
        "Expected message to contain '{}', got '{}'",
        expected,
        last.content
    );
}

#[then("the last notification should have an embed")]
async fn last_has_embed(world: &mut LivewatchWorld) {
    let notifier = world.notifier();
    let sent = notifier.sent.read().await;
    let last = sent.last().expect("no notification sent");
    assert_eq!(last.embeds.len(), 1);
}

#[then("the last notification should be plain text")]
async fn last_plain(world: &mut LivewatchWorld) {
    let notifier = world.notifier();
    let sent = notifier.sent.read().await;
    let last = sent.last().expect("no notification sent");
    assert!(last.embeds.is_empty());
}

#[then("the delivery should be recorded as failed")]
fn delivery_failed(world: &mut LivewatchWorld) {
    let record = world
        .scheduler()
        .store()
        .history()
        .back()
        .cloned()
        .expect("no notification in history");
    assert!(!record.success);
    assert!(record.error.is_some());
}

#[then("the delivery should be recorded as successful")]
fn delivery_succeeded(world: &mut LivewatchWorld) {
    let record = world
        .scheduler()
        .store()
        .history()
        .back()
        .cloned()
        .expect("no notification in history");
    assert!(record.success);
}
