//! Provider ports
//!
//! The two capability sets the reconciler drives. The cloud provider owns
//! the existence of block devices; the storage provider owns their
//! membership in the storage stack and is the source of truth for the
//! cluster topology. The manager holds both as trait objects and never
//! downcasts.

use crate::config::{Class, Config};
use crate::error::Result;
use crate::topology::{Device, StorageNode, Topology};
use async_trait::async_trait;
use std::sync::Arc;

// =============================================================================
// Cloud Provider Port
// =============================================================================

/// Port for cloud block device lifecycle operations
///
/// Create precedes the storage provider's attach; delete follows its detach,
/// so a device is always in one of three safe states: nonexistent, attached
/// and known to storage, or detached.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Called whenever the config changes; the provider may cache class
    /// parameters
    fn set_config(&self, config: &Config);

    /// Synchronously create one block device, attach it to the instance,
    /// and return it populated
    ///
    /// The returned device carries a non-empty stable id and a size equal to
    /// the class's `disk_size_gb`. Fails transient (retry on the next pass)
    /// or permanent (surface to the operator).
    async fn device_create(&self, instance_id: &str, class: &Class) -> Result<Device>;

    /// Detach and destroy a device; idempotent on "already gone"
    async fn device_delete(&self, instance_id: &str, device_id: &str) -> Result<()>;
}

// =============================================================================
// Storage Provider Port
// =============================================================================

/// Port for storage stack operations
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Called whenever the config changes
    fn set_config(&self, config: &Config);

    /// Return a consistent snapshot of the cluster; may be expensive
    ///
    /// The snapshot must satisfy `Topology::verify` or the manager rejects
    /// the pass.
    async fn get_topology(&self) -> Result<Topology>;

    /// Incorporate a freshly-created cloud device into the storage stack on
    /// a node
    async fn device_add(&self, node: &StorageNode, device: &Device) -> Result<()>;

    /// Drain and detach a device from the storage stack, leaving the cloud
    /// device safe to destroy
    async fn device_remove(&self, node: &StorageNode, device: &Device) -> Result<()>;
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type CloudProviderRef = Arc<dyn CloudProvider>;
pub type StorageProviderRef = Arc<dyn StorageProvider>;
