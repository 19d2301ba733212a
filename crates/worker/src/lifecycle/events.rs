//! Registration events broadcast to interested hosts.

use serde::Serialize;

/// Something observable happened to a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// A new generation started installing.
    UpdateFound { version: String },
    /// Install finished; the generation holds its manifest.
    Installed { version: String },
    /// Installed generation is waiting for the old one to release its clients.
    NewGenerationWaiting { version: String, active: String },
    /// Install failed fatally; the generation stays stalled.
    InstallFailed { version: String, reason: String },
    /// Open clients switched to a new controller.
    ControllerChange { version: String, claimed: usize },
    /// A generation was superseded or unregistered.
    Redundant { version: String },
}

impl LifecycleEvent {
    pub fn version(&self) -> &str {
        match self {
            LifecycleEvent::UpdateFound { version }
            | LifecycleEvent::Installed { version }
            | LifecycleEvent::NewGenerationWaiting { version, .. }
            | LifecycleEvent::InstallFailed { version, .. }
            | LifecycleEvent::ControllerChange { version, .. }
            | LifecycleEvent::Redundant { version } => version,
        }
    }
}
