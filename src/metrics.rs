//! Reconciler metrics
//!
//! Prometheus counters owned by the manager and exported through the
//! driver's `/metrics` endpoint. Each manager registers its counters on its
//! own registry so multiple managers can coexist in one process.

use crate::error::{Error, Result};
use prometheus::{IntCounter, Registry};

/// Counters tracking reconciler activity
pub struct Metrics {
    registry: Registry,
    pub reconciles: IntCounter,
    pub reconcile_errors: IntCounter,
    pub devices_created: IntCounter,
    pub devices_deleted: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let reconciles = counter("rico_reconciles_total", "Total reconcile passes")?;
        let reconcile_errors = counter(
            "rico_reconcile_errors_total",
            "Reconcile passes that surfaced an error",
        )?;
        let devices_created = counter(
            "rico_devices_created_total",
            "Cloud devices created by reconciliation",
        )?;
        let devices_deleted = counter(
            "rico_devices_deleted_total",
            "Cloud devices deleted by reconciliation",
        )?;

        for c in [
            &reconciles,
            &reconcile_errors,
            &devices_created,
            &devices_deleted,
        ] {
            registry
                .register(Box::new(c.clone()))
                .map_err(|e| Error::Internal(format!("metric registration failed: {e}")))?;
        }

        Ok(Self {
            registry,
            reconciles,
            reconcile_errors,
            devices_created,
            devices_deleted,
        })
    }

    /// The registry holding this manager's counters
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

fn counter(name: &str, help: &str) -> Result<IntCounter> {
    IntCounter::new(name, help)
        .map_err(|e| Error::Internal(format!("metric {name} creation failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_register_and_increment() {
        let metrics = Metrics::new().unwrap();
        metrics.reconciles.inc();
        metrics.devices_created.inc_by(3);

        assert_eq!(metrics.reconciles.get(), 1);
        assert_eq!(metrics.devices_created.get(), 3);
        assert_eq!(metrics.registry().gather().len(), 4);
    }

    #[test]
    fn test_independent_registries() {
        // Two managers in one process must not collide on registration
        let first = Metrics::new().unwrap();
        let second = Metrics::new().unwrap();
        first.reconciles.inc();
        assert_eq!(second.reconciles.get(), 0);
    }
}
