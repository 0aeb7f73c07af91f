//! Benchmarks for dependency graph construction and ordering.

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use upkscope::{
    loader::graph::{DependencyGraph, NodeRef},
    upk::index::ObjectIndex,
};

/// Layered graph: every node depends on a handful of nodes one layer down.
fn build_graph(nodes: usize) -> DependencyGraph {
    let package: Arc<str> = Arc::from("Bench");
    let mut graph = DependencyGraph::new();

    for index in 0..nodes {
        graph.add_node(NodeRef::object(
            package.clone(),
            ObjectIndex::from_export(index),
        ));
    }
    for index in 1..nodes {
        for step in [1usize, 7, 63] {
            if let Some(dependency) = index.checked_sub(step) {
                graph
                    .add_edge(
                        NodeRef::object(package.clone(), ObjectIndex::from_export(dependency)),
                        NodeRef::object(package.clone(), ObjectIndex::from_export(index)),
                    )
                    .expect("distinct nodes");
            }
        }
    }

    graph
}

fn bench_topo_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("topo_sort");
    for nodes in [256usize, 2048, 16384] {
        let graph = build_graph(nodes);
        group.bench_with_input(BenchmarkId::from_parameter(nodes), &graph, |b, graph| {
            b.iter(|| {
                let order = graph.topo_sort();
                assert_eq!(order.len(), nodes);
            });
        });
    }
    group.finish();
}

fn bench_build(c: &mut Criterion) {
    c.bench_function("graph_build_2048", |b| {
        b.iter(|| build_graph(2048).node_count())
    });
}

criterion_group!(benches, bench_topo_sort, bench_build);
criterion_main!(benches);
