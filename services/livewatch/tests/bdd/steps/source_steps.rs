//! Steps that configure the watched source and its scripted responses

use std::sync::Arc;

use cucumber::given;

use livewatch::source::{Snapshot, SourceKind, Target};
use livewatch::LivewatchError;

use crate::world::{LivewatchWorld, RecordingNotifier, ScriptedSource};

fn parse_kind(s: &str) -> SourceKind {
    match s {
        "twitch" => SourceKind::Twitch,
        "twitcasting" => SourceKind::TwitCasting,
        "youtube" => SourceKind::YouTube,
        other => panic!("Unknown source kind: {}", other),
    }
}

pub fn parse_snapshot(s: &str) -> livewatch::Result<Snapshot> {
    match s {
        "live" => Ok(Snapshot::live(true)),
        "offline" => Ok(Snapshot::live(false)),
        "empty" => Ok(Snapshot::default()),
        "an error" => Err(LivewatchError::Fetch("connection reset".to_string())),
        other => match other.strip_prefix("item ") {
            Some(id) => Ok(Snapshot::item(id).with_title(format!("Video {}", id))),
            None => panic!("Unknown fetch result: {}", other),
        },
    }
}

#[given(expr = "a {word} source")]
fn a_source(world: &mut LivewatchWorld, kind: String) {
    let kind = parse_kind(&kind);
    world.kind = Some(kind);
    world.source = Some(Arc::new(ScriptedSource::new(kind)));
    world.notifier = Some(Arc::new(RecordingNotifier::default()));
}

#[given(expr = "the source watches {string} named {string}")]
fn watches_target(world: &mut LivewatchWorld, id: String, name: String) {
    world.targets.push(Target::new(id, name));
}

#[given("targets already live at startup are announced")]
fn announce_initial_live(world: &mut LivewatchWorld) {
    world.announce_initial_live = true;
}

#[given(expr = "the next fetch of {string} returns {word}")]
async fn next_fetch_word(world: &mut LivewatchWorld, id: String, result: String) {
    world.source().push(&id, parse_snapshot(&result)).await;
}

#[given(expr = "the next fetch of {string} returns item {string}")]
async fn next_fetch_item(world: &mut LivewatchWorld, id: String, item: String) {
    world
        .source()
        .push(&id, parse_snapshot(&format!("item {}", item)))
        .await;
}

#[given(expr = "the next fetch of {string} fails")]
async fn next_fetch_fails(world: &mut LivewatchWorld, id: String) {
    world.source().push(&id, parse_snapshot("an error")).await;
}
