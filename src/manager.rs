//! Reconciliation manager
//!
//! The manager owns the decision loop: per class, compare the observed
//! utilization and total footprint against the class watermarks and bounds,
//! then drive the cloud and storage providers to converge the fleet. Each
//! pass is a pure function of a fresh topology snapshot; nothing is cached
//! between passes, and a failed pass is simply retried by the next one.

use crate::config::{Class, Config};
use crate::domain::ports::{CloudProviderRef, StorageProviderRef};
use crate::error::{Error, Result};
use crate::metrics::Metrics;
use crate::topology::{PlacementEngine, Topology};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

// =============================================================================
// Decision
// =============================================================================

/// Per-class outcome of comparing a snapshot against the class policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Grow,
    Shrink,
    Hold,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Grow => write!(f, "grow"),
            Decision::Shrink => write!(f, "shrink"),
            Decision::Hold => write!(f, "hold"),
        }
    }
}

/// Decide what to do for one class given its observed utilization and total
/// provisioned size
///
/// Precedence: a class below its floor must grow regardless of utilization;
/// a class at or above its ceiling never grows but may still shrink;
/// otherwise the watermarks decide, with both comparisons inclusive and
/// every move checked against the size bounds.
pub fn decide(class: &Class, utilization: u32, total_gb: i64) -> Decision {
    if total_gb < class.minimum_total_size_gb {
        return Decision::Grow;
    }
    if total_gb >= class.maximum_total_size_gb {
        if utilization <= class.watermark_low
            && total_gb - class.disk_size_gb >= class.minimum_total_size_gb
        {
            return Decision::Shrink;
        }
        return Decision::Hold;
    }
    if utilization >= class.watermark_high
        && total_gb + class.disk_size_gb <= class.maximum_total_size_gb
    {
        return Decision::Grow;
    }
    if utilization <= class.watermark_low
        && total_gb - class.disk_size_gb >= class.minimum_total_size_gb
    {
        return Decision::Shrink;
    }
    Decision::Hold
}

// =============================================================================
// Status
// =============================================================================

/// Point-in-time summary of manager activity
#[derive(Debug, Clone, Default, Serialize)]
pub struct ManagerStatus {
    pub reconcile_count: u64,
    pub last_reconcile_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

// =============================================================================
// Manager
// =============================================================================

/// Drives the cloud and storage providers to converge the fleet toward the
/// configured per-class policies
pub struct Manager {
    config: RwLock<Config>,
    cloud: CloudProviderRef,
    storage: StorageProviderRef,
    metrics: Metrics,
    status: RwLock<ManagerStatus>,
    /// Serializes passes so at most one is in flight; a second caller
    /// blocks until the current pass completes
    pass_gate: Mutex<()>,
}

impl Manager {
    /// Create a manager, validating the config and pushing it to both
    /// providers
    pub fn new(
        config: Config,
        cloud: CloudProviderRef,
        storage: StorageProviderRef,
    ) -> Result<Self> {
        config.validate()?;
        cloud.set_config(&config);
        storage.set_config(&config);

        Ok(Self {
            config: RwLock::new(config),
            cloud,
            storage,
            metrics: Metrics::new()?,
            status: RwLock::new(ManagerStatus::default()),
            pass_gate: Mutex::new(()),
        })
    }

    /// Snapshot of the current config
    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }

    /// Replace the config wholesale and re-notify both providers
    ///
    /// A pass in flight keeps the snapshot it read at entry; the next pass
    /// observes the new config in full.
    pub async fn set_config(&self, config: Config) -> Result<()> {
        config.validate()?;
        self.cloud.set_config(&config);
        self.storage.set_config(&config);
        *self.config.write().await = config;
        info!("configuration replaced");
        Ok(())
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub async fn status(&self) -> ManagerStatus {
        self.status.read().await.clone()
    }

    /// One reconcile sweep over every configured class
    ///
    /// Reads the config once at entry, obtains a fresh topology snapshot,
    /// verifies it, then processes classes in declaration order. A class
    /// failure does not stop the sweep; the first error encountered is
    /// returned after all classes have been visited. Concurrent callers are
    /// serialized: the second blocks until the first pass finishes.
    pub async fn reconcile(&self) -> Result<()> {
        let _pass = self.pass_gate.lock().await;
        let result = self.run_pass().await;

        self.metrics.reconciles.inc();
        if result.is_err() {
            self.metrics.reconcile_errors.inc();
        }
        let mut status = self.status.write().await;
        status.reconcile_count += 1;
        status.last_reconcile_at = Some(Utc::now());
        status.last_error = result.as_ref().err().map(|e| e.to_string());

        result
    }

    async fn run_pass(&self) -> Result<()> {
        let config = self.config.read().await.clone();

        let topology = self.storage.get_topology().await?;
        topology.verify()?;

        let mut first_error = None;
        for class in config.classes() {
            if let Err(e) = self.reconcile_class(&topology, class).await {
                warn!(class = %class.name, error = %e, "class reconcile failed");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn reconcile_class(&self, topology: &Topology, class: &Class) -> Result<()> {
        let utilization = topology.utilization(class);
        let total_gb = topology.total_storage(class);
        let decision = decide(class, utilization, total_gb);

        debug!(
            class = %class.name,
            utilization,
            total_gb,
            decision = %decision,
            "class evaluated"
        );

        match decision {
            Decision::Grow => self.grow(topology, class).await,
            Decision::Shrink => self.shrink(topology, class).await,
            Decision::Hold => Ok(()),
        }
    }

    /// Create and attach new devices for a class
    ///
    /// Cloud create comes first: a failure there leaves nothing behind,
    /// while the reverse order could leave storage expecting a device that
    /// never existed. A mid-loop failure stops the grow and leaves already
    /// attached devices in place; the next pass re-evaluates from the new
    /// snapshot.
    async fn grow(&self, topology: &Topology, class: &Class) -> Result<()> {
        let node = PlacementEngine::node_to_add_storage(topology).ok_or_else(|| {
            Error::Internal("no node available for growth in a verified topology".into())
        })?;
        let (count, pool) = node.num_disks(class);

        info!(
            class = %class.name,
            node = %node.metadata.id,
            count,
            pool = pool.map(|p| p.name.as_str()),
            "growing class"
        );

        for _ in 0..count {
            let device = self.cloud.device_create(&node.metadata.id, class).await?;
            self.storage.device_add(node, &device).await?;
            self.metrics.devices_created.inc();
        }

        Ok(())
    }

    /// Drain and destroy the cheapest device of a class
    ///
    /// Storage detach comes first; the cloud device is destroyed only once
    /// it is out of the storage stack, so a failure never leaves storage
    /// pointing at a destroyed device. No device of the class anywhere
    /// means there is nothing to do.
    async fn shrink(&self, topology: &Topology, class: &Class) -> Result<()> {
        let Some(target) = PlacementEngine::storage_to_remove(topology, class) else {
            debug!(class = %class.name, "no devices to reclaim");
            return Ok(());
        };

        info!(
            class = %class.name,
            node = %target.node.metadata.id,
            device = %target.device.id,
            utilization = target.device.utilization,
            "shrinking class"
        );

        self.storage
            .device_remove(target.node, target.device)
            .await?;
        self.cloud
            .device_delete(&target.node.metadata.id, &target.device.id)
            .await?;
        self.metrics.devices_deleted.inc();

        Ok(())
    }
}
