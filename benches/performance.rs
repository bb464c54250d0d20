//! Performance benchmarks for pointfield
//!
//! Run with: cargo bench

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use geo::{Coord, Rect};
use pointfield::{Point, Quadtree, QuadtreeConfig, stride_sample};

/// Generate points scattered over a square region
fn generate_points(n: usize, extent: f64) -> Vec<Point> {
    (0..n)
        .map(|i| Point {
            position: Coord {
                x: (i as f64 * 37.77) % extent,
                y: (i as f64 * 73.31) % extent,
            },
            z: None,
            color: None,
            radius: 1.0,
            id: i as u64,
        })
        .collect()
}

fn build_tree(points: &[Point], extent: f64) -> Quadtree {
    let bounds = Rect::new(
        Coord { x: 0.0, y: 0.0 },
        Coord {
            x: extent,
            y: extent,
        },
    );
    let mut tree = Quadtree::new(bounds, QuadtreeConfig::default());
    for point in points {
        tree.insert(point.clone());
    }
    tree
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    group.sample_size(20);

    for &n in &[10_000usize, 100_000] {
        let points = generate_points(n, 1000.0);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("insert_{n}"), |b| {
            b.iter(|| build_tree(&points, 1000.0));
        });
    }

    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");

    let points = generate_points(100_000, 1000.0);
    let tree = build_tree(&points, 1000.0);

    // Small viewport (zoomed in)
    let small = Rect::new(Coord { x: 450.0, y: 450.0 }, Coord { x: 550.0, y: 550.0 });
    group.bench_function("small_viewport_100k", |b| {
        b.iter(|| tree.query(&small));
    });

    // Full extent (overview)
    let large = Rect::new(
        Coord { x: 0.0, y: 0.0 },
        Coord {
            x: 1000.0,
            y: 1000.0,
        },
    );
    group.bench_function("large_viewport_100k", |b| {
        b.iter(|| tree.query(&large));
    });

    group.finish();
}

fn bench_subsample(c: &mut Criterion) {
    let mut group = c.benchmark_group("subsample");

    let points = generate_points(100_000, 1000.0);
    let refs: Vec<&Point> = points.iter().collect();

    group.throughput(Throughput::Elements(refs.len() as u64));
    group.bench_function("stride_100k_to_5k", |b| {
        b.iter(|| stride_sample(&refs, 5_000));
    });

    group.finish();
}

criterion_group!(benches, bench_build, bench_query, bench_subsample);
criterion_main!(benches);
