//! BDD test world for livewatch

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use cucumber::World;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use livewatch::config::TimingConfig;
use livewatch::detector::Detector;
use livewatch::notifier::{Notifier, WebhookMessage};
use livewatch::scheduler::{CycleReport, Scheduler};
use livewatch::source::{Snapshot, Source, SourceKind, Target};
use livewatch::LivewatchError;

/// A source that replays queued fetch results per target
#[derive(Debug)]
pub struct ScriptedSource {
    kind: SourceKind,
    script: RwLock<HashMap<String, VecDeque<livewatch::Result<Snapshot>>>>,
}

impl ScriptedSource {
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            script: RwLock::new(HashMap::new()),
        }
    }

    pub async fn push(&self, target: &str, result: livewatch::Result<Snapshot>) {
        self.script
            .write()
            .await
            .entry(target.to_string())
            .or_default()
            .push_back(result);
    }
}

#[async_trait]
impl Source for ScriptedSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self, target: &Target) -> livewatch::Result<Snapshot> {
        self.script
            .write()
            .await
            .get_mut(&target.id)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| Err(LivewatchError::Fetch("nothing scripted".to_string())))
    }
}

/// A notifier that records messages and rejects them on request
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub rejecting: RwLock<bool>,
    pub sent: RwLock<Vec<WebhookMessage>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn destination(&self) -> &str {
        "recording"
    }

    async fn notify(&self, message: &WebhookMessage) -> livewatch::Result<()> {
        self.sent.write().await.push(message.clone());
        if *self.rejecting.read().await {
            Err(LivewatchError::Notify("status 429".to_string()))
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Default, World)]
pub struct LivewatchWorld {
    pub kind: Option<SourceKind>,
    pub targets: Vec<Target>,
    pub announce_initial_live: bool,
    pub source: Option<Arc<ScriptedSource>>,
    pub notifier: Option<Arc<RecordingNotifier>>,
    pub scheduler: Option<Scheduler>,
    pub last_report: Option<CycleReport>,
}

impl LivewatchWorld {
    pub fn source(&self) -> Arc<ScriptedSource> {
        Arc::clone(self.source.as_ref().expect("source not configured"))
    }

    pub fn notifier(&self) -> Arc<RecordingNotifier> {
        Arc::clone(self.notifier.as_ref().expect("notifier not configured"))
    }

    /// Build the scheduler on first use, after all targets are declared
    pub fn scheduler(&mut self) -> &mut Scheduler {
        if self.scheduler.is_none() {
            let kind = self.kind.expect("source kind not configured");
            let detector =
                Detector::new(kind.detection_mode()).announce_initial_live(self.announce_initial_live);
            let source: Arc<dyn Source> = self.source();
            let notifier: Arc<dyn Notifier> = self.notifier();
            self.scheduler = Some(Scheduler::new(
                source,
                notifier,
                self.targets.clone(),
                detector,
                TimingConfig::immediate(),
                50,
                CancellationToken::new(),
            ));
        }
        self.scheduler.as_mut().expect("scheduler just built")
    }

    pub async fn run_cycle(&mut self) {
        let report = self
            .scheduler()
            .run_cycle()
            .await
            .expect("cycle should not fail");
        self.last_report = Some(report);
    }
}
