//! Storage node model
//!
//! A node is one compute instance hosting storage: its identity, the cloud
//! block devices attached to it, and the optional pools that group devices
//! into shared accounting units. When a node has pools, the pools override
//! raw devices for utilization accounting; total sizes always come from
//! devices. Mixing pooled and raw accounting on one node is disallowed by
//! policy.

use crate::config::Class;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// Instance Metadata
// =============================================================================

/// Identity of the compute instance backing a storage node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceMetadata {
    /// Provider-assigned instance id
    pub id: String,

    /// Free-form zone/region labels
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

// =============================================================================
// Device
// =============================================================================

/// One cloud block device attached to a node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Provider-assigned id, stable for the device's lifetime
    pub id: String,

    /// OS-visible path on the node
    pub path: String,

    /// Name of the owning class
    pub class: String,

    /// Device size in GB
    pub size_gb: i64,

    /// Utilization percentage, 0-100
    pub utilization: u32,

    /// Pool this device belongs to, if any
    #[serde(default)]
    pub pool: Option<String>,
}

impl Device {
    pub fn verify(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::TopologyInvalid("device has empty id".into()));
        }
        if self.class.is_empty() {
            return Err(Error::TopologyInvalid(format!(
                "device {} has empty class",
                self.id
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D[{}|{}Gi|{}] ", self.class, self.size_gb, self.utilization)
    }
}

// =============================================================================
// Pool
// =============================================================================

/// Grouping of devices on a node that are accounted as one unit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub name: String,

    /// Name of the owning class
    pub class: String,

    /// Number of devices constituting one logical unit
    pub set_size: u32,

    /// Utilization percentage of the pool as a whole, 0-100
    pub utilization: u32,
}

impl Pool {
    pub fn verify(&self) -> Result<()> {
        if self.set_size == 0 {
            return Err(Error::TopologyInvalid(format!(
                "pool {} has zero set size",
                self.name
            )));
        }
        if self.class.is_empty() {
            return Err(Error::TopologyInvalid(format!(
                "pool {} has empty class",
                self.name
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Storage Node
// =============================================================================

/// A compute instance and the storage attached to it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageNode {
    pub metadata: InstanceMetadata,

    #[serde(default)]
    pub devices: Vec<Device>,

    /// Pools keyed by pool name
    #[serde(default)]
    pub pools: BTreeMap<String, Pool>,
}

impl StorageNode {
    /// A bare node with no devices or pools
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            metadata: InstanceMetadata {
                id: id.into(),
                labels: BTreeMap::new(),
            },
            devices: Vec::new(),
            pools: BTreeMap::new(),
        }
    }

    /// Sum and count of the node's utilization units for a class
    ///
    /// Pools override devices: a node with any pools is accounted entirely
    /// through its pools.
    pub fn raw_utilization(&self, class: &Class) -> (u64, u64) {
        let (mut sum, mut num) = (0u64, 0u64);
        if !self.pools.is_empty() {
            for pool in self.pools.values() {
                if pool.class == class.name {
                    sum += u64::from(pool.utilization);
                    num += 1;
                }
            }
        } else {
            for device in &self.devices {
                if device.class == class.name {
                    sum += u64::from(device.utilization);
                    num += 1;
                }
            }
        }
        (sum, num)
    }

    /// Mean utilization of the node for a class, 0 when the class has no
    /// units here
    pub fn utilization(&self, class: &Class) -> u32 {
        let (sum, num) = self.raw_utilization(class);
        if num == 0 {
            return 0;
        }
        (sum / num) as u32
    }

    /// Total provisioned GB for a class on this node
    pub fn total_storage(&self, class: &Class) -> i64 {
        self.devices
            .iter()
            .filter(|d| d.class == class.name)
            .map(|d| d.size_gb)
            .sum()
    }

    /// How many devices one provisioning decision creates on this node
    ///
    /// A pool keyed by the class name means new storage arrives a full set
    /// at a time; otherwise devices are provisioned one by one.
    pub fn num_disks(&self, class: &Class) -> (u32, Option<&Pool>) {
        match self.pools.get(&class.name) {
            Some(pool) => (pool.set_size, Some(pool)),
            None => (1, None),
        }
    }

    /// Devices belonging to a class
    pub fn devices_for_class(&self, class: &Class) -> Vec<&Device> {
        self.devices
            .iter()
            .filter(|d| d.class == class.name)
            .collect()
    }

    /// Devices assigned to a pool
    pub fn devices_on_pool(&self, pool: &Pool) -> Vec<&Device> {
        self.devices
            .iter()
            .filter(|d| d.pool.as_deref() == Some(pool.name.as_str()))
            .collect()
    }

    pub fn verify(&self) -> Result<()> {
        if self.metadata.id.is_empty() {
            return Err(Error::TopologyInvalid(
                "node missing instance metadata id".into(),
            ));
        }
        for pool in self.pools.values() {
            pool.verify()?;
        }
        for device in &self.devices {
            device.verify()?;
        }
        Ok(())
    }
}

impl fmt::Display for StorageNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N[{}|{}]: ", self.metadata.id, self.devices.len())?;
        for device in &self.devices {
            write!(f, "{device}")?;
        }
        writeln!(f)
    }
}
