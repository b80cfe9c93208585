//! Benchmarks for graph rendering performance
//!
//! Renders large generated dependency graphs with shared subtrees, so the
//! ASCII renderer has to emit reference leaves as well as expanded nodes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use depviz::graph::DependencyGraph;
use depviz::render::{to_dot, AsciiTreeRenderer};

/// Create a graph with `total_nodes` packages, each depending on up to
/// `children_per_node` later packages.
fn create_large_graph(total_nodes: usize, children_per_node: usize) -> DependencyGraph {
    let mut graph = DependencyGraph::with_root("pkg-0");
    let mut depths = vec![0usize; total_nodes];

    for i in 1..total_nodes {
        let parent = (i - 1) / children_per_node;
        depths[i] = depths[parent] + 1;
        graph.add_package(&format!("pkg-{i}"), depths[i]);
        graph.add_edge(&format!("pkg-{parent}"), &format!("pkg-{i}"));
    }

    // Cross links to already placed packages
    for i in (children_per_node..total_nodes).step_by(7) {
        let target = i / 3;
        if target != i {
            graph.add_edge(&format!("pkg-{i}"), &format!("pkg-{target}"));
        }
    }

    graph
}

/// Benchmark tree flattening operation
fn bench_flatten(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_flatten");

    for size in [100, 500, 1000, 2000, 5000].iter() {
        let graph = create_large_graph(*size, 5);

        group.bench_with_input(BenchmarkId::new("nodes", size), size, |b, _| {
            b.iter(|| black_box(AsciiTreeRenderer::flatten(&graph)));
        });
    }

    group.finish();
}

/// Benchmark full ASCII rendering into a buffer
fn bench_ascii_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("ascii_render");
    let renderer = AsciiTreeRenderer::new();

    for size in [100, 1000, 5000].iter() {
        let graph = create_large_graph(*size, 5);

        group.bench_with_input(BenchmarkId::new("nodes", size), &graph, |b, graph| {
            b.iter(|| {
                let mut buffer = Vec::with_capacity(64 * 1024);
                renderer.render(graph, &mut buffer).unwrap();
                black_box(buffer)
            });
        });
    }

    group.finish();
}

/// Benchmark DOT serialization for the image renderer
fn bench_dot(c: &mut Criterion) {
    let mut group = c.benchmark_group("dot_output");

    for size in [100, 1000, 5000].iter() {
        let graph = create_large_graph(*size, 5);

        group.bench_with_input(BenchmarkId::new("nodes", size), &graph, |b, graph| {
            b.iter(|| black_box(to_dot(graph)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_flatten, bench_ascii_render, bench_dot);
criterion_main!(benches);
