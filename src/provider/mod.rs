//! Provider implementations
//!
//! Concrete implementations of the cloud and storage ports. Only the
//! deterministic in-memory fakes live here; real cloud integrations plug in
//! through the same traits.

pub mod fake;

pub use fake::{FakeCloudProvider, FakeStorageProvider, InjectedFailure};
