//! Shared test fakes and utilities for the Void notification pipeline.

mod broker;
mod clock;
mod repository;
mod store;

pub use broker::{FailingBroker, InMemoryBroker};
pub use clock::FixedClock;
pub use repository::{FailingShoutRepository, RecordingShoutRepository};
pub use store::{FailingNotificationStore, RecordingNotificationStore};
