//! # Tick Benchmarks
//!
//! Measures one simulation step on factories of growing size: spawning,
//! controlled-gate resolution, routing and movement.
//!
//! Run: `cargo bench --bench tick_bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use qfab_factory::{Cell, Direction, ItemRegistry, Route, SystemTable, Item, TileKind};
use qfab_sim::{LevelData, LevelTile, SimConfig, SimulationWorld};
use std::time::Duration;

/// `lanes` linhas independentes: fonte → H → esteiras → sorvedouro
fn lanes_level(lanes: i32, length: i32) -> LevelData {
    let mut layout = Vec::new();
    for y in 0..lanes {
        let row = y * 2;
        layout.push(tile(0, row, TileKind::Source, Some(Direction::East), None));
        layout.push(tile(1, row, TileKind::Printer, Some(Direction::East), Some("h")));
        for x in 2..length {
            layout.push(tile(x, row, TileKind::Conveyor, Some(Direction::East), None));
        }
        layout.push(tile(length, row, TileKind::Sink, None, None));
    }
    LevelData {
        layout,
        ..Default::default()
    }
}

fn tile(x: i32, y: i32, kind: TileKind, direction: Option<Direction>, gate: Option<&str>) -> LevelTile {
    LevelTile {
        x,
        y,
        kind,
        direction,
        gate_id: gate.map(str::to_string),
    }
}

/// Mundo aquecido: belts já cheios de itens
fn warmed_world(lanes: i32) -> SimulationWorld {
    let mut world = SimulationWorld::new(SimConfig {
        seed: Some(7),
        spawn_interval_ms: 200,
        ..SimConfig::default()
    })
    .unwrap();
    world.load_level(lanes_level(lanes, 24));
    world.run(200);
    world
}

/// Benchmark full world step
fn bench_world_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_step");

    // o fluxo fonte → sorvedouro mantém o número de itens estável
    for lanes in [1, 8, 32] {
        let mut world = warmed_world(lanes);
        group.bench_with_input(BenchmarkId::new("lanes", lanes), &lanes, |b, _| {
            b.iter(|| black_box(world.step()))
        });
    }

    group.finish();
}

/// Benchmark registry movement with a trivial router
fn bench_registry_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_update");

    for count in [100i32, 1_000] {
        let mut registry = ItemRegistry::default();
        for i in 0..count {
            registry.spawn(Cell::new(0, i * 2));
        }
        group.bench_with_input(BenchmarkId::new("items", count), &count, |b, _| {
            let mut router = |_: &mut Item, _: Cell, _: &mut SystemTable| Route::Move(Direction::East);
            b.iter(|| black_box(registry.update(Duration::from_millis(100), &mut router)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_world_step, bench_registry_update);
criterion_main!(benches);
