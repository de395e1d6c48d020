//! Scheduler: drives one source's fetch, detect, notify, sleep loop

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio_util::sync::CancellationToken;

use crate::config::TimingConfig;
use crate::detector::{ChangeVerdict, Detector};
use crate::notifier::{NotificationRecord, Notifier, Transition};
use crate::source::{Snapshot, Source, Target};
use crate::state::ObservedStateStore;

/// Consecutive fetch failures after which a target is reported once at warn
const ERROR_STREAK_WARNING: u32 = 5;

/// What happened to one target in one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetOutcome {
    Unchanged,
    WentInactive,
    Notified { delivered: bool },
}

/// Tally of one full pass over the targets
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub polled: usize,
    pub failed: usize,
    pub notified: usize,
    pub delivery_failures: usize,
}

/// Polls every target of one source sequentially, forever.
///
/// Owns the source's [`ObservedStateStore`]; nothing else mutates it.
pub struct Scheduler {
    source: Arc<dyn Source>,
    notifier: Arc<dyn Notifier>,
    targets: Vec<Target>,
    detector: Detector,
    store: ObservedStateStore,
    timing: TimingConfig,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("source", &self.source)
            .field("targets", &self.targets)
            .field("detector", &self.detector)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    pub fn new(
        source: Arc<dyn Source>,
        notifier: Arc<dyn Notifier>,
        targets: Vec<Target>,
        detector: Detector,
        timing: TimingConfig,
        history_size: usize,
        cancel: CancellationToken,
    ) -> Self {
        let store = ObservedStateStore::new(&targets, history_size);
        Self {
            source,
            notifier,
            targets,
            detector,
            store,
            timing,
            cancel,
        }
    }

    pub fn store(&self) -> &ObservedStateStore {
        &self.store
    }

    /// Run cycles until cancelled.
    ///
    /// Returns an error only when credentials could not be refreshed, which
    /// leaves the source unable to make progress.
    pub async fn run(&mut self) -> crate::Result<()> {
        let kind = self.source.kind();
        tracing::info!(
            "Polling {} target(s) on {} every {:?}",
            self.targets.len(),
            kind,
            self.timing.cycle_delay
        );

        while !self.cancel.is_cancelled() {
            let report = self.run_cycle().await?;
            tracing::debug!("{} cycle finished: {:?}", kind, report);

            if !self.pause(self.timing.cycle_delay).await {
                break;
            }
        }

        tracing::debug!("Polling loop for {} cancelled", kind);
        Ok(())
    }

    /// One full pass over all targets, including the delays between them.
    ///
    /// A credential refresh failure, at the start or from any fetch, ends the
    /// cycle with that error. Other fetch failures only skip their target.
    pub async fn run_cycle(&mut self) -> crate::Result<CycleReport> {
        self.source.ensure_auth().await?;

        let mut report = CycleReport::default();
        for index in 0..self.targets.len() {
            let target = self.targets[index].clone();
            report.polled += 1;

            let delay = match self.poll_target(&target).await {
                Ok(outcome) => {
                    if let TargetOutcome::Notified { delivered } = outcome {
                        report.notified += 1;
                        if !delivered {
                            report.delivery_failures += 1;
                        }
                    }
                    self.timing.inter_target_delay
                }
                Err(e @ crate::LivewatchError::Auth(_)) => return Err(e),
                Err(e) => {
                    report.failed += 1;
                    let streak = self.store.record_failure(&target.id);
                    tracing::warn!(
                        "Fetching {} on {} failed: {}",
                        target.name,
                        self.source.kind(),
                        e
                    );
                    if streak == ERROR_STREAK_WARNING {
                        tracing::warn!(
                            "Target '{}' has {} consecutive fetch errors",
                            target.name,
                            streak
                        );
                    }
                    self.timing.error_backoff
                }
            };

            if !self.pause(delay).await {
                break;
            }
        }

        Ok(report)
    }

    /// Fetch, detect, notify if needed, then commit the new state.
    ///
    /// A fetch error returns early and leaves the observed state untouched.
    /// The state is committed whatever the delivery outcome, so a failed
    /// delivery is not retried on the next cycle.
    pub async fn poll_target(&mut self, target: &Target) -> crate::Result<TargetOutcome> {
        let snapshot = self.source.fetch(target).await?;
        let now_ms = current_epoch_ms();

        let verdict = match self.store.observed(&target.id) {
            Some(previous) => self.detector.detect(previous, &snapshot),
            None => ChangeVerdict::NoChange,
        };

        tracing::debug!(
            "Poll '{}' on {}: live={} item={:?} -> {:?}",
            target.name,
            self.source.kind(),
            snapshot.is_live,
            snapshot.item_id(),
            verdict
        );

        let (snapshot, outcome) = match verdict {
            ChangeVerdict::TransitionedToActive => {
                let snapshot = self.source.enrich(target, snapshot).await;
                let delivered = self.deliver(target, &snapshot, now_ms).await;
                (snapshot, TargetOutcome::Notified { delivered })
            }
            ChangeVerdict::TransitionedToInactive => (snapshot, TargetOutcome::WentInactive),
            ChangeVerdict::NoChange => (snapshot, TargetOutcome::Unchanged),
        };

        self.store
            .commit(&target.id, self.detector.mode(), &snapshot, now_ms);
        Ok(outcome)
    }

    async fn deliver(&mut self, target: &Target, snapshot: &Snapshot, now_ms: u64) -> bool {
        let transition = Transition {
            kind: self.source.kind(),
            target,
            snapshot,
        };
        let message = transition.to_message();
        let result = self.notifier.notify(&message).await;

        match &result {
            Ok(()) => tracing::info!(
                "Sent notification for {} to {}",
                target.name,
                self.notifier.destination()
            ),
            Err(e) => tracing::warn!(
                "Notification for {} to {} failed: {}",
                target.name,
                self.notifier.destination(),
                e
            ),
        }

        self.store.add_notification(NotificationRecord {
            target_name: target.name.clone(),
            destination: self.notifier.destination().to_string(),
            message: message.content,
            success: result.is_ok(),
            error: result.as_ref().err().map(|e| e.to_string()),
            timestamp_epoch_ms: now_ms,
        });

        result.is_ok()
    }

    /// Sleep unless cancelled first. Returns false on cancellation.
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = self.cancel.cancelled() => false,
        }
    }
}

fn current_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
