//! In-memory fake providers
//!
//! Deterministic stand-ins for the cloud and storage providers, used by the
//! simulator shell and the manager tests. The fake cloud mints sequential
//! device ids; the fake storage keeps a topology behind a lock and applies
//! attach/detach against it. Both record their calls so tests can assert
//! exact provider-call sequences, and both can be armed to fail their next
//! operation.

use crate::config::{Class, Config};
use crate::domain::ports::{CloudProvider, StorageProvider};
use crate::error::{Error, ProviderKind, Result};
use crate::topology::{Device, StorageNode, Topology};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

// =============================================================================
// Failure Injection
// =============================================================================

/// Failure class to arm on a fake's next operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    Transient,
    Permanent,
}

impl InjectedFailure {
    fn into_error(self, provider: ProviderKind, operation: &str) -> Error {
        match self {
            InjectedFailure::Transient => Error::transient(provider, operation, "injected"),
            InjectedFailure::Permanent => Error::permanent(provider, operation, "injected"),
        }
    }
}

/// One armed failure: fires after `after` more successful calls
type ArmedFailure = Mutex<Option<(u32, InjectedFailure)>>;

fn check_armed(
    armed: &ArmedFailure,
    provider: ProviderKind,
    operation: &str,
) -> Result<()> {
    let mut slot = armed.lock();
    match slot.take() {
        Some((0, failure)) => Err(failure.into_error(provider, operation)),
        Some((remaining, failure)) => {
            *slot = Some((remaining - 1, failure));
            Ok(())
        }
        None => Ok(()),
    }
}

// =============================================================================
// Fake Cloud Provider
// =============================================================================

/// Record of one `device_create` call
#[derive(Debug, Clone)]
pub struct CreateCall {
    pub instance_id: String,
    pub class: String,
}

/// Record of one `device_delete` call
#[derive(Debug, Clone)]
pub struct DeleteCall {
    pub instance_id: String,
    pub device_id: String,
}

/// Cloud provider that mints devices out of thin air
#[derive(Default)]
pub struct FakeCloudProvider {
    next_id: AtomicU64,
    config: RwLock<Config>,
    creates: Mutex<Vec<CreateCall>>,
    deletes: Mutex<Vec<DeleteCall>>,
    fail_create: ArmedFailure,
    fail_delete: ArmedFailure,
}

impl FakeCloudProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `device_create` call observed so far
    pub fn created(&self) -> Vec<CreateCall> {
        self.creates.lock().clone()
    }

    /// Every `device_delete` call observed so far
    pub fn deleted(&self) -> Vec<DeleteCall> {
        self.deletes.lock().clone()
    }

    /// Arm the next `device_create` to fail
    pub fn fail_next_create(&self, failure: InjectedFailure) {
        *self.fail_create.lock() = Some((0, failure));
    }

    /// Arm `device_create` to fail after `after` more successful calls
    pub fn fail_create_after(&self, after: u32, failure: InjectedFailure) {
        *self.fail_create.lock() = Some((after, failure));
    }

    /// Arm the next `device_delete` to fail
    pub fn fail_next_delete(&self, failure: InjectedFailure) {
        *self.fail_delete.lock() = Some((0, failure));
    }

    /// The config most recently pushed via `set_config`
    pub fn config(&self) -> Config {
        self.config.read().clone()
    }
}

#[async_trait]
impl CloudProvider for FakeCloudProvider {
    fn set_config(&self, config: &Config) {
        *self.config.write() = config.clone();
    }

    async fn device_create(&self, instance_id: &str, class: &Class) -> Result<Device> {
        check_armed(&self.fail_create, ProviderKind::Cloud, "device_create")?;

        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let device = Device {
            id: format!("vol-{n:06}"),
            path: format!("/dev/fake{n}"),
            class: class.name.clone(),
            size_gb: class.disk_size_gb,
            utilization: 0,
            pool: None,
        };

        debug!(
            instance = instance_id,
            class = %class.name,
            device = %device.id,
            "fake cloud created device"
        );
        self.creates.lock().push(CreateCall {
            instance_id: instance_id.into(),
            class: class.name.clone(),
        });

        Ok(device)
    }

    async fn device_delete(&self, instance_id: &str, device_id: &str) -> Result<()> {
        check_armed(&self.fail_delete, ProviderKind::Cloud, "device_delete")?;

        debug!(
            instance = instance_id,
            device = device_id,
            "fake cloud deleted device"
        );
        self.deletes.lock().push(DeleteCall {
            instance_id: instance_id.into(),
            device_id: device_id.into(),
        });

        Ok(())
    }
}

// =============================================================================
// Fake Storage Provider
// =============================================================================

/// Record of one `device_add` or `device_remove` call: (node id, device id)
pub type StorageCall = (String, String);

/// Storage provider backed by an in-memory topology
pub struct FakeStorageProvider {
    topology: RwLock<Topology>,
    config: RwLock<Config>,
    adds: Mutex<Vec<StorageCall>>,
    removes: Mutex<Vec<StorageCall>>,
    fail_add: ArmedFailure,
    fail_remove: ArmedFailure,
}

impl FakeStorageProvider {
    pub fn new(topology: Topology) -> Self {
        Self {
            topology: RwLock::new(topology),
            config: RwLock::new(Config::empty()),
            adds: Mutex::new(Vec::new()),
            removes: Mutex::new(Vec::new()),
            fail_add: Mutex::new(None),
            fail_remove: Mutex::new(None),
        }
    }

    /// Add a node to the simulated cluster (driver helper, not part of the
    /// storage port)
    pub fn node_add(&self, node: StorageNode) {
        self.topology.write().cluster.nodes.push(node);
    }

    /// Set the utilization of every device and pool of a class across the
    /// cluster (driver helper)
    pub fn set_utilization(&self, class: &Class, utilization: u32) {
        let mut topology = self.topology.write();
        for node in &mut topology.cluster.nodes {
            for device in &mut node.devices {
                if device.class == class.name {
                    device.utilization = utilization;
                }
            }
            for pool in node.pools.values_mut() {
                if pool.class == class.name {
                    pool.utilization = utilization;
                }
            }
        }
    }

    pub fn added(&self) -> Vec<StorageCall> {
        self.adds.lock().clone()
    }

    pub fn removed(&self) -> Vec<StorageCall> {
        self.removes.lock().clone()
    }

    pub fn fail_next_add(&self, failure: InjectedFailure) {
        *self.fail_add.lock() = Some((0, failure));
    }

    pub fn fail_next_remove(&self, failure: InjectedFailure) {
        *self.fail_remove.lock() = Some((0, failure));
    }
}

#[async_trait]
impl StorageProvider for FakeStorageProvider {
    fn set_config(&self, config: &Config) {
        *self.config.write() = config.clone();
    }

    async fn get_topology(&self) -> Result<Topology> {
        Ok(self.topology.read().clone())
    }

    async fn device_add(&self, node: &StorageNode, device: &Device) -> Result<()> {
        check_armed(&self.fail_add, ProviderKind::Storage, "device_add")?;

        let mut topology = self.topology.write();
        let entry = topology.node_mut(&node.metadata.id).ok_or_else(|| {
            Error::permanent(
                ProviderKind::Storage,
                "device_add",
                format!("unknown node {}", node.metadata.id),
            )
        })?;
        entry.devices.push(device.clone());

        debug!(
            node = %node.metadata.id,
            device = %device.id,
            "fake storage attached device"
        );
        self.adds
            .lock()
            .push((node.metadata.id.clone(), device.id.clone()));

        Ok(())
    }

    async fn device_remove(&self, node: &StorageNode, device: &Device) -> Result<()> {
        check_armed(&self.fail_remove, ProviderKind::Storage, "device_remove")?;

        let mut topology = self.topology.write();
        let entry = topology.node_mut(&node.metadata.id).ok_or_else(|| {
            Error::permanent(
                ProviderKind::Storage,
                "device_remove",
                format!("unknown node {}", node.metadata.id),
            )
        })?;

        let before = entry.devices.len();
        entry.devices.retain(|d| d.id != device.id);
        if entry.devices.len() == before {
            // Detaching something already gone is not a failure
            warn!(
                node = %node.metadata.id,
                device = %device.id,
                "device already absent from storage stack"
            );
        }

        self.removes
            .lock()
            .push((node.metadata.id.clone(), device.id.clone()));

        Ok(())
    }
}
