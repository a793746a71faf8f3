//! Cluster topology model
//!
//! The observed shape of the fleet: nodes, their attached devices, and the
//! optional pools that group devices into accounting units. Everything here
//! is a pure function of one snapshot; the reconciler re-reads the topology
//! from the storage provider on every pass.

pub mod cluster;
pub mod node;
pub mod placement;

pub use cluster::{StorageCluster, Topology};
pub use node::{Device, InstanceMetadata, Pool, StorageNode};
pub use placement::{PlacementEngine, ReclaimTarget};
