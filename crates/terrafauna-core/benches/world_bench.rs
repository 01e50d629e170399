use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use std::time::Duration;
use terrafauna_core::{EngineConfig, SimulationState};

fn bench_world_steps(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_step");
    let samples: usize = std::env::var("TF_BENCH_SAMPLES")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(30);
    let steps: usize = std::env::var("TF_BENCH_STEPS")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(32);
    group.sample_size(samples);
    group.warm_up_time(Duration::from_secs(2));
    group.measurement_time(Duration::from_secs(8));

    for &founders in &[10u32, 40, 120] {
        group.bench_function(format!("steps{steps}_founders{founders}"), |b| {
            b.iter_batched(
                || {
                    let config = EngineConfig {
                        world_width: 160,
                        world_height: 120,
                        species_count: 6,
                        creatures_per_species: founders,
                        rng_seed: Some(0xBEEF),
                        summary_interval: 0,
                        ..EngineConfig::default()
                    };
                    SimulationState::new(config).expect("world")
                },
                |mut sim| {
                    for _ in 0..steps {
                        sim.step();
                    }
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_world_steps);
criterion_main!(benches);
