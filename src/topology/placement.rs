//! Placement decisions
//!
//! Chooses where to grow and what to reclaim. Growth goes to the node with
//! the fewest devices; reclamation takes the least-utilized device of the
//! class. Both tie-break to the first candidate in iteration order so
//! repeated passes over the same snapshot make the same choice.

use crate::config::Class;
use crate::topology::cluster::Topology;
use crate::topology::node::{Device, Pool, StorageNode};

/// The device chosen for reclamation, with its surrounding context
#[derive(Debug, Clone, Copy)]
pub struct ReclaimTarget<'a> {
    pub node: &'a StorageNode,
    pub pool: Option<&'a Pool>,
    pub device: &'a Device,
}

/// Placement policy over one topology snapshot
pub struct PlacementEngine;

impl PlacementEngine {
    /// The node new storage should land on: fewest total devices, ties to
    /// the first node in iteration order
    ///
    /// `None` only on an empty cluster, which `Topology::verify` rejects
    /// before placement runs.
    pub fn node_to_add_storage(topology: &Topology) -> Option<&StorageNode> {
        topology
            .cluster
            .nodes
            .iter()
            .min_by_key(|node| node.devices.len())
    }

    /// The cheapest device of a class to drain: lowest utilization across
    /// all nodes, ties to the first in node-then-device order
    ///
    /// Returns `None` when no device of the class exists anywhere. The pool
    /// of the returned target is always `None` for now: reclamation is not
    /// yet pool-aware, even though provisioning honors pool set sizes.
    /// TODO: pool-aware reclaim should pick the least-utilized pool and
    /// drain its members via `devices_on_pool`.
    pub fn storage_to_remove<'a>(
        topology: &'a Topology,
        class: &Class,
    ) -> Option<ReclaimTarget<'a>> {
        let mut target: Option<(&StorageNode, &Device)> = None;
        for node in &topology.cluster.nodes {
            for device in node.devices_for_class(class) {
                let lower = match target {
                    Some((_, best)) => device.utilization < best.utilization,
                    None => true,
                };
                if lower {
                    target = Some((node, device));
                }
            }
        }
        target.map(|(node, device)| ReclaimTarget {
            node,
            pool: None,
            device,
        })
    }
}
