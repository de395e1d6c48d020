//! Observed state per target and notification history

use std::collections::VecDeque;

use serde::Serialize;

use crate::notifier::NotificationRecord;
use crate::source::{DetectionMode, Snapshot, Target};

/// What the scheduler remembers about a target between cycles
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum ObservedState {
    /// No fetch for this target has succeeded yet
    Unobserved,
    Observed {
        is_live: bool,
        item_id: Option<String>,
    },
}

impl ObservedState {
    /// The state after applying a successful fetch.
    ///
    /// Latest-item sources keep the previous id when the snapshot carries
    /// none, so an empty response never erases what was seen.
    pub fn advance(&self, mode: DetectionMode, snapshot: &Snapshot) -> ObservedState {
        let previous_item = match self {
            ObservedState::Observed { item_id, .. } => item_id.clone(),
            ObservedState::Unobserved => None,
        };
        let item_id = match mode {
            DetectionMode::LatestItem => snapshot.item_id().map(str::to_string).or(previous_item),
            DetectionMode::Liveness => snapshot.item_id.clone(),
        };
        ObservedState::Observed {
            is_live: snapshot.is_live,
            item_id,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, ObservedState::Observed { is_live: true, .. })
    }

    pub fn item_id(&self) -> Option<&str> {
        match self {
            ObservedState::Observed { item_id, .. } => item_id.as_deref(),
            ObservedState::Unobserved => None,
        }
    }
}

/// Status of a single target
#[derive(Debug, Clone, Serialize)]
pub struct TargetStatus {
    pub id: String,
    pub name: String,
    pub observed: ObservedState,
    pub last_poll_epoch_ms: u64,
    pub last_change_epoch_ms: Option<u64>,
    pub consecutive_errors: u32,
}

/// Per-source memory of every configured target.
///
/// Every target passed to [`ObservedStateStore::new`] keeps exactly one
/// entry for the lifetime of the store.
#[derive(Debug)]
pub struct ObservedStateStore {
    targets: Vec<TargetStatus>,
    history: VecDeque<NotificationRecord>,
    history_max_size: usize,
}

impl ObservedStateStore {
    pub fn new(targets: &[Target], history_max_size: usize) -> Self {
        let targets = targets
            .iter()
            .map(|t| TargetStatus {
                id: t.id.clone(),
                name: t.name.clone(),
                observed: ObservedState::Unobserved,
                last_poll_epoch_ms: 0,
                last_change_epoch_ms: None,
                consecutive_errors: 0,
            })
            .collect();

        Self {
            targets,
            history: VecDeque::with_capacity(history_max_size),
            history_max_size,
        }
    }

    pub fn targets(&self) -> &[TargetStatus] {
        &self.targets
    }

    pub fn status(&self, id: &str) -> Option<&TargetStatus> {
        self.targets.iter().find(|t| t.id == id)
    }

    /// Get a target's observed state
    pub fn observed(&self, id: &str) -> Option<&ObservedState> {
        self.status(id).map(|t| &t.observed)
    }

    /// Record a successful fetch, returning true if the observed state changed
    pub fn commit(&mut self, id: &str, mode: DetectionMode, snapshot: &Snapshot, now_ms: u64) -> bool {
        let Some(status) = self.targets.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        let next = status.observed.advance(mode, snapshot);
        let changed = next != status.observed;
        status.observed = next;
        status.last_poll_epoch_ms = now_ms;
        status.consecutive_errors = 0;
        if changed {
            status.last_change_epoch_ms = Some(now_ms);
        }
        changed
    }

    /// Record a failed fetch, returning the consecutive error count.
    ///
    /// The observed state is left untouched.
    pub fn record_failure(&mut self, id: &str) -> u32 {
        match self.targets.iter_mut().find(|t| t.id == id) {
            Some(status) => {
                status.consecutive_errors += 1;
                status.consecutive_errors
            }
            None => 0,
        }
    }

    pub fn history(&self) -> &VecDeque<NotificationRecord> {
        &self.history
    }

    /// Add a notification to history
    pub fn add_notification(&mut self, record: NotificationRecord) {
        if self.history_max_size == 0 {
            return;
        }
        if self.history.len() >= self.history_max_size {
            self.history.pop_front();
        }
        self.history.push_back(record);
    }
}
