//! Benchmark for topology aggregation and placement
//!
//! Exercises the per-pass hot path: cluster-wide utilization, grow-node
//! selection, and reclaim-target selection over a mid-sized fleet.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rico::{Class, Device, PlacementEngine, StorageNode, Topology};

fn fleet(nodes: usize, devices_per_node: usize) -> Topology {
    let nodes = (0..nodes)
        .map(|n| {
            let mut node = StorageNode::new(format!("node-{n:04}"));
            node.devices = (0..devices_per_node)
                .map(|d| Device {
                    id: format!("node-{n:04}-d{d}"),
                    path: format!("/dev/node{n}d{d}"),
                    class: "gp2".into(),
                    size_gb: 8,
                    // Deterministic spread of utilizations across the fleet
                    utilization: ((n * 7 + d * 13) % 100) as u32,
                    pool: None,
                })
                .collect();
            node
        })
        .collect();
    Topology::new(nodes)
}

fn gp2() -> Class {
    Class {
        name: "gp2".into(),
        watermark_high: 75,
        watermark_low: 25,
        disk_size_gb: 8,
        minimum_total_size_gb: 32,
        maximum_total_size_gb: 1024,
        parameters: Default::default(),
    }
}

fn bench_utilization(c: &mut Criterion) {
    let mut group = c.benchmark_group("topology");
    let topology = fleet(100, 10);
    let class = gp2();
    group.throughput(Throughput::Elements(1000));

    group.bench_function("utilization_100x10", |b| {
        b.iter(|| black_box(&topology).utilization(black_box(&class)));
    });

    group.bench_function("total_storage_100x10", |b| {
        b.iter(|| black_box(&topology).total_storage(black_box(&class)));
    });

    group.finish();
}

fn bench_placement(c: &mut Criterion) {
    let mut group = c.benchmark_group("placement");
    let topology = fleet(100, 10);
    let class = gp2();
    group.throughput(Throughput::Elements(1));

    group.bench_function("node_to_add_storage_100x10", |b| {
        b.iter(|| PlacementEngine::node_to_add_storage(black_box(&topology)));
    });

    group.bench_function("storage_to_remove_100x10", |b| {
        b.iter(|| PlacementEngine::storage_to_remove(black_box(&topology), black_box(&class)));
    });

    group.finish();
}

criterion_group!(benches, bench_utilization, bench_placement);
criterion_main!(benches);
