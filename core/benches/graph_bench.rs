//! Benchmarks for graph construction and topological sort.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use graph_core::dag::Graph;

fn build_linear_graph(n: usize) -> Graph {
    let mut g = Graph::new();
    let mut prev: Option<String> = None;
    for i in 0..n {
        let id = format!("t-{i}");
        g.add_vertex(id.clone(), serde_json::Value::Null).unwrap();
        if let Some(p) = &prev {
            g.add_edge(p, &id).unwrap();
        }
        prev = Some(id);
    }
    g
}

fn build_fanout_graph(fan: usize) -> Graph {
    let mut g = Graph::new();
    g.add_vertex("root", serde_json::Value::Null).unwrap();
    for i in 0..fan {
        let id = format!("child-{i}");
        g.add_vertex(id.clone(), serde_json::Value::Null).unwrap();
        g.add_edge("root", &id).unwrap();
    }
    g
}

fn build_layered_graph(layers: usize, width: usize) -> Graph {
    let mut g = Graph::new();
    let mut prev_layer: Vec<String> = Vec::new();
    for l in 0..layers {
        let mut current_layer = Vec::with_capacity(width);
        for w in 0..width {
            let id = format!("L{l}-W{w}");
            g.add_vertex(id.clone(), serde_json::Value::Null).unwrap();
            for p in &prev_layer {
                g.add_edge(p, &id).unwrap();
            }
            current_layer.push(id);
        }
        prev_layer = current_layer;
    }
    g
}

fn bench_graph_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_construction");
    for size in [10, 100, 1_000, 10_000] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &n| {
            b.iter(|| {
                let mut g = Graph::new();
                for i in 0..n {
                    g.add_vertex(format!("t-{i}"), serde_json::Value::Null).unwrap();
                }
                black_box(g)
            });
        });
    }
    group.finish();
}

fn bench_edge_insertion(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_edge_insertion");
    for size in [10, 100, 1_000] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &n| {
            b.iter_batched(
                || {
                    let mut g = Graph::new();
                    let ids: Vec<_> = (0..n)
                        .map(|i| {
                            let id = format!("t-{i}");
                            g.add_vertex(id.clone(), serde_json::Value::Null).unwrap();
                            id
                        })
                        .collect();
                    (g, ids)
                },
                |(mut g, ids)| {
                    for pair in ids.windows(2) {
                        g.add_edge(&pair[0], &pair[1]).unwrap();
                    }
                    black_box(g)
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_topological_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_topological_sort");
    for size in [10, 100, 1_000] {
        group.bench_with_input(BenchmarkId::new("linear", size), &size, |b, &n| {
            let g = build_linear_graph(n);
            b.iter(|| black_box(g.topological_sort()));
        });
        group.bench_with_input(BenchmarkId::new("fanout", size), &size, |b, &n| {
            let g = build_fanout_graph(n);
            b.iter(|| black_box(g.topological_sort()));
        });
    }
    for (layers, width) in [(5, 20), (10, 10), (20, 5)] {
        let label = format!("{layers}x{width}");
        group.bench_with_input(BenchmarkId::new("layered", &label), &(layers, width), |b, &(l, w)| {
            let g = build_layered_graph(l, w);
            b.iter(|| black_box(g.topological_sort()));
        });
    }
    group.finish();
}

fn bench_degree_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_degree_queries");
    for fan in [10, 100, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(fan), &fan, |b, &n| {
            let g = build_fanout_graph(n);
            b.iter(|| {
                for id in g.vertex_ids() {
                    black_box(g.indegree(&id));
                }
            });
        });
    }
    group.finish();
}

fn bench_vertex_removal(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_vertex_removal");
    for depth in [10, 100, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &n| {
            b.iter_batched(
                || build_linear_graph(n),
                |mut g| {
                    black_box(g.remove_vertex("t-0").unwrap());
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_construction_scenarios(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_construction_scenarios");
    group.sample_size(10);
    for size in [100, 1_000, 10_000] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("construct_linear", size), &size, |b, &n| {
            b.iter(|| black_box(build_linear_graph(n)));
        });
        group.bench_with_input(BenchmarkId::new("construct_fanout", size), &size, |b, &n| {
            b.iter(|| black_box(build_fanout_graph(n)));
        });
        let width = (size as f64).sqrt() as usize;
        let layers = size / width.max(1);
        group.bench_with_input(BenchmarkId::new("construct_layered", size), &(layers, width), |b, &(l, w)| {
            b.iter(|| black_box(build_layered_graph(l, w)));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_graph_construction,
    bench_edge_insertion,
    bench_topological_sort,
    bench_degree_queries,
    bench_vertex_removal,
    bench_construction_scenarios
);
criterion_main!(benches);
