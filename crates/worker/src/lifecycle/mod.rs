//! Worker lifecycle: registration, install, activate, control messages.

pub mod clients;
pub mod container;
pub mod events;
pub mod manifest;
pub mod registration;
pub mod state;

pub use clients::{ClientDirectory, ClientId, ClientInfo, InMemoryClients};
pub use container::Container;
pub use events::LifecycleEvent;
pub use manifest::{AssetManifest, ManifestEntry};
pub use registration::{Fetched, Registration, RegistrationStatus, UpdateOutcome, WorkerSlot, WorkerStatus};
pub use state::WorkerState;
