//! Tick hot-path benchmark: collision scan plus script execution.
//!
//! The collision pass is O(n^2); this measures where that starts to bite
//! so the spatial-grid hook has a number attached.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use skirmish_server::Simulation;
use skirmish_shared::{GameConfig, Vec2};

fn populated_sim(entity_count: usize) -> Simulation {
    let mut sim = Simulation::with_seed(GameConfig::default(), 99);
    sim.spawn_player("bench", "#808080");
    for i in 0..entity_count {
        let type_name = if i % 2 == 0 { "blob" } else { "runner" };
        let pos = sim.random_world_point();
        sim.spawn(type_name, pos);
    }
    sim
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation_tick");
    for entity_count in [10, 50, 200] {
        group.bench_with_input(
            BenchmarkId::from_parameter(entity_count),
            &entity_count,
            |b, &count| {
                let mut sim = populated_sim(count);
                b.iter(|| sim.tick(1.0 / 120.0));
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
