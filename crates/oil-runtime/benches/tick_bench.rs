use criterion::{criterion_group, criterion_main, Criterion};
use oil_core::{ChaChaSource, ContinentId, FieldTypeId};
use oil_runtime::Simulation;

fn bench_ticks(c: &mut Criterion) {
    let sim = Simulation::builtin().unwrap();
    let mut state = sim.new_game();
    state.money = 50_000_000;
    let mut rng = ChaChaSource::seed_from_u64(42);
    for _ in 0..40 {
        sim.fields()
            .purchase(&mut state, &FieldTypeId::from("conventional"), &mut rng)
            .unwrap();
    }
    let europe = ContinentId::from("europe");
    c.bench_function("month_tick", |b| {
        b.iter(|| {
            let report = sim.advance_one_month(&mut state, &mut rng);
            let half = state.oil_stock / 2;
            if half > 0 {
                let _ = sim.shipping().ship(&mut state, &europe, half);
            }
            report
        })
    });
}

criterion_group!(benches, bench_ticks);
criterion_main!(benches);
