//! Cluster topology snapshot
//!
//! A topology is a read-only observation of the whole cluster at one moment:
//! every node with its devices and pools. The reconciler obtains a fresh
//! snapshot from the storage provider at each pass and never caches one
//! across passes; reality is the only state.

use crate::config::{Class, Config};
use crate::error::{Error, Result};
use crate::topology::node::StorageNode;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

// =============================================================================
// Cluster
// =============================================================================

/// The ordered set of storage nodes in the cluster
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageCluster {
    #[serde(default)]
    pub nodes: Vec<StorageNode>,
}

// =============================================================================
// Topology
// =============================================================================

/// One observed snapshot of the cluster
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    pub cluster: StorageCluster,
}

impl Topology {
    pub fn new(nodes: Vec<StorageNode>) -> Self {
        Self {
            cluster: StorageCluster { nodes },
        }
    }

    /// Mean utilization of a class across the cluster
    ///
    /// Computed as `sum / num` over every node's raw utilization units, with
    /// truncating integer division; 0 when no node has units of the class.
    /// A node accounted through one pool contributes a single unit no matter
    /// how many devices back it.
    pub fn utilization(&self, class: &Class) -> u32 {
        let (mut sum, mut num) = (0u64, 0u64);
        for node in &self.cluster.nodes {
            let (s, n) = node.raw_utilization(class);
            sum += s;
            num += n;
        }
        if num == 0 {
            return 0;
        }
        (sum / num) as u32
    }

    /// Total provisioned GB for a class across the cluster
    pub fn total_storage(&self, class: &Class) -> i64 {
        self.cluster
            .nodes
            .iter()
            .map(|n| n.total_storage(class))
            .sum()
    }

    /// Total device count across all nodes, regardless of class
    pub fn num_devices(&self) -> usize {
        self.cluster.nodes.iter().map(|n| n.devices.len()).sum()
    }

    /// Find a node by instance id
    pub fn node(&self, id: &str) -> Option<&StorageNode> {
        self.cluster.nodes.iter().find(|n| n.metadata.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut StorageNode> {
        self.cluster.nodes.iter_mut().find(|n| n.metadata.id == id)
    }

    /// Confirm the snapshot carries the information reconciliation requires
    pub fn verify(&self) -> Result<()> {
        if self.cluster.nodes.is_empty() {
            return Err(Error::TopologyInvalid(
                "no storage nodes in cluster".into(),
            ));
        }
        for node in &self.cluster.nodes {
            node.verify()?;
        }
        Ok(())
    }

    /// Human-readable rendering of the snapshot
    ///
    /// One `C[<class>|<util>]` token per configured class on the header line,
    /// then one line per node listing its devices.
    pub fn render(&self, config: &Config) -> String {
        let mut out = String::from("TOPOLOGY\n");
        for class in config.classes() {
            let _ = write!(out, "C[{}|{}] ", class.name, self.utilization(class));
        }
        out.push('\n');
        for node in &self.cluster.nodes {
            let _ = write!(out, "{node}");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::node::Device;

    fn class(name: &str) -> Class {
        Class {
            name: name.into(),
            watermark_high: 75,
            watermark_low: 25,
            disk_size_gb: 8,
            minimum_total_size_gb: 0,
            maximum_total_size_gb: 1024,
            parameters: Default::default(),
        }
    }

    fn node(id: &str, utilizations: &[u32]) -> StorageNode {
        let mut node = StorageNode::new(id);
        node.devices = utilizations
            .iter()
            .enumerate()
            .map(|(i, &utilization)| Device {
                id: format!("{id}-d{i}"),
                path: format!("/dev/{id}-d{i}"),
                class: "gp2".into(),
                size_gb: 8,
                utilization,
                pool: None,
            })
            .collect();
        node
    }

    #[test]
    fn test_utilization_is_cluster_wide_mean() {
        let topology = Topology::new(vec![node("one", &[80, 80]), node("two", &[80, 80])]);
        assert_eq!(topology.utilization(&class("gp2")), 80);

        // 115 / 6 truncates to 19
        let topology = Topology::new(vec![
            node("one", &[20, 20, 20]),
            node("two", &[20, 20, 15]),
        ]);
        assert_eq!(topology.utilization(&class("gp2")), 19);
    }

    #[test]
    fn test_utilization_unknown_class_is_zero() {
        let topology = Topology::new(vec![node("one", &[80])]);
        assert_eq!(topology.utilization(&class("io1")), 0);
    }

    #[test]
    fn test_utilization_stays_in_percent_range() {
        let topology = Topology::new(vec![node("one", &[100, 100]), node("two", &[0])]);
        let utilization = topology.utilization(&class("gp2"));
        assert!(utilization <= 100);
    }

    #[test]
    fn test_total_storage() {
        let topology = Topology::new(vec![node("one", &[0, 0]), node("two", &[0, 0, 0])]);
        assert_eq!(topology.total_storage(&class("gp2")), 40);
        assert_eq!(topology.total_storage(&class("io1")), 0);
    }

    #[test]
    fn test_num_devices() {
        let topology = Topology::new(vec![node("one", &[0, 0]), node("two", &[0])]);
        assert_eq!(topology.num_devices(), 3);
    }

    #[test]
    fn test_verify_rejects_empty_cluster() {
        assert!(Topology::default().verify().is_err());
        assert!(Topology::new(vec![node("one", &[])]).verify().is_ok());
    }

    #[test]
    fn test_render() {
        let config = Config::new([class("gp2")]).unwrap();
        let topology = Topology::new(vec![node("one", &[80])]);
        assert_eq!(
            topology.render(&config),
            "TOPOLOGY\nC[gp2|80] \nN[one|1]: D[gp2|8Gi|80] \n"
        );
    }
}
