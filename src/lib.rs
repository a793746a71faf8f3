//! Rico - Storage Infrastructure Autoscaler
//!
//! A control loop that inspects a cluster of storage nodes and their
//! attached block devices, compares observed utilization against per-class
//! watermarks, and converges the fleet: provisioning new cloud devices on
//! undersubscribed nodes and reclaiming devices from oversubscribed ones.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       Driver / Shell                      │
//! ├──────────────────────────────────────────────────────────┤
//! │                         Manager                           │
//! │   per class: utilization + total vs watermarks + bounds   │
//! │              -> Grow | Shrink | Hold                      │
//! ├───────────────────────┬──────────────────────────────────┤
//! │    Cloud Provider     │        Storage Provider          │
//! │  device create/delete │  topology, device attach/detach  │
//! └───────────────────────┴──────────────────────────────────┘
//! ```
//!
//! Every reconcile pass is a pure function of a fresh topology snapshot;
//! the core keeps no state between passes.
//!
//! # Modules
//!
//! - [`config`]: classes, watermarks, size bounds
//! - [`topology`]: cluster snapshot model, aggregations, placement
//! - [`domain`]: provider ports
//! - [`provider`]: deterministic in-memory fake providers
//! - [`manager`]: the reconciliation loop
//! - [`error`]: error types and retry classification

pub mod config;
pub mod domain;
pub mod error;
pub mod manager;
pub mod metrics;
pub mod provider;
pub mod shell;
pub mod topology;

// Re-export commonly used types
pub use config::{Class, Config};
pub use domain::ports::{CloudProvider, CloudProviderRef, StorageProvider, StorageProviderRef};
pub use error::{Error, ErrorAction, ProviderKind, Result};
pub use manager::{decide, Decision, Manager, ManagerStatus};
pub use provider::{FakeCloudProvider, FakeStorageProvider};
pub use shell::Shell;
pub use topology::{
    Device, InstanceMetadata, PlacementEngine, Pool, ReclaimTarget, StorageCluster, StorageNode,
    Topology,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
