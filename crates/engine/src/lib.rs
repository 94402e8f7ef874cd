//! Subscriber registry, matching and notification fan-out.

pub mod dispatcher;
pub mod matcher;
pub mod registry;
pub mod store;

pub use dispatcher::{DispatchReport, Dispatcher};
pub use matcher::SubscriberMatcher;
pub use registry::Registry;
pub use store::{JsonFileStore, MemoryStore, Snapshot, SnapshotStore};
