//! Change detection between the remembered state and a fresh snapshot

use crate::source::{DetectionMode, Snapshot};
use crate::state::ObservedState;

/// Outcome of comparing a snapshot against the remembered state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeVerdict {
    NoChange,
    /// Went live, or a new latest item appeared. The only notifiable verdict.
    TransitionedToActive,
    /// Went from live to not live. Updates memory, never notifies.
    TransitionedToInactive,
}

/// Compares snapshots for one source
#[derive(Debug, Clone, Copy)]
pub struct Detector {
    mode: DetectionMode,
    announce_initial_live: bool,
}

impl Detector {
    pub fn new(mode: DetectionMode) -> Self {
        Self {
            mode,
            announce_initial_live: false,
        }
    }

    /// Treat a target that is already live on its first successful fetch as
    /// a transition. Has no effect on latest-item detection.
    pub fn announce_initial_live(mut self, announce: bool) -> Self {
        self.announce_initial_live = announce;
        self
    }

    pub fn mode(&self) -> DetectionMode {
        self.mode
    }

    pub fn detect(&self, previous: &ObservedState, snapshot: &Snapshot) -> ChangeVerdict {
        match (self.mode, previous) {
            (DetectionMode::Liveness, ObservedState::Unobserved) => {
                if snapshot.is_live && self.announce_initial_live {
                    ChangeVerdict::TransitionedToActive
                } else {
                    ChangeVerdict::NoChange
                }
            }
            (DetectionMode::Liveness, ObservedState::Observed { is_live, .. }) => {
                match (*is_live, snapshot.is_live) {
                    (false, true) => ChangeVerdict::TransitionedToActive,
                    (true, false) => ChangeVerdict::TransitionedToInactive,
                    _ => ChangeVerdict::NoChange,
                }
            }
            // The first sighting of a latest item only seeds memory
            (DetectionMode::LatestItem, ObservedState::Unobserved) => ChangeVerdict::NoChange,
            (DetectionMode::LatestItem, ObservedState::Observed { item_id, .. }) => {
                match snapshot.item_id() {
                    Some(new_id) if item_id.as_deref() != Some(new_id) => {
                        ChangeVerdict::TransitionedToActive
                    }
                    _ => ChangeVerdict::NoChange,
                }
            }
        }
    }
}
