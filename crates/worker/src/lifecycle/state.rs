//! Worker lifecycle states.

use serde::Serialize;
use std::fmt;

/// Lifecycle state of one worker generation.
///
/// ```text
/// Uninstalled → Installing → Waiting → Activating → Active → Redundant
///                    └──────(skip waiting)──────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Uninstalled,
    Installing,
    Waiting,
    Activating,
    Active,
    Redundant,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Uninstalled => "uninstalled",
            WorkerState::Installing => "installing",
            WorkerState::Waiting => "waiting",
            WorkerState::Activating => "activating",
            WorkerState::Active => "active",
            WorkerState::Redundant => "redundant",
        }
    }

    /// Whether `self → next` is a legal transition.
    ///
    /// Any state may become redundant. Installing may go straight to
    /// Activating when waiting is skipped.
    pub fn can_transition_to(&self, next: WorkerState) -> bool {
        use WorkerState::*;
        matches!(
            (self, next),
            (Uninstalled, Installing)
                | (Installing, Waiting)
                | (Installing, Activating)
                | (Waiting, Activating)
                | (Activating, Active)
                | (Uninstalled | Installing | Waiting | Activating | Active, Redundant)
        )
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
