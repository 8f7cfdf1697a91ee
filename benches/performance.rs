//! Performance benchmarks for agv_warehouse_sim using Criterion.rs.

use agv_warehouse_sim::grid::{build_graph, build_map, Pos};
use agv_warehouse_sim::pathfinding::astar;
use agv_warehouse_sim::runner::run_headless;
use agv_warehouse_sim::scenario::HeadlessRunConfig;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_headless_run(c: &mut Criterion) {
    let scenarios = vec![("small", 2, 4), ("medium", 4, 8), ("large", 8, 16)];

    let mut group = c.benchmark_group("headless_run");
    for (name, agvs, carts) in scenarios {
        group.bench_with_input(
            BenchmarkId::from_parameter(name),
            &(agvs, carts),
            |b, &(agvs, carts)| {
                b.iter(|| {
                    let config = HeadlessRunConfig {
                        num_agvs: agvs,
                        num_carts: carts,
                        sim_duration: 600.0,
                        tick_dt: 0.1,
                        verbose: false,
                        seed: 42,
                    };
                    black_box(run_headless(config).unwrap());
                });
            },
        );
    }
    group.finish();
}

fn bench_pathfinding(c: &mut Criterion) {
    let tiles = build_map();
    let graph = build_graph(&tiles);

    let mut group = c.benchmark_group("pathfinding");
    group.bench_function("astar_corner_to_corner", |b| {
        b.iter(|| {
            black_box(astar(
                &graph,
                Pos::new(0, 7),
                Pos::new(57, 8),
                None,
                Some(&tiles),
            ));
        });
    });
    group.bench_function("astar_station_to_station", |b| {
        b.iter(|| {
            black_box(astar(
                &graph,
                Pos::new(8, 12),
                Pos::new(39, 24),
                None,
                Some(&tiles),
            ));
        });
    });
    group.finish();
}

criterion_group!(benches, bench_headless_run, bench_pathfinding);
criterion_main!(benches);
