use bevy_sph_fluid::cpu::sph2d::*;
use bevy_sph_fluid::{IntegrationScheme, SimulationParams};
use criterion::{Criterion, criterion_group, criterion_main};
use glam::{UVec2, Vec2};

fn bench_step(c: &mut Criterion) {
    let h = 0.02;
    let spacing = 0.012; // spacing < h for overlap

    let params = SimulationParams::default()
        .with_kernel_radius(h)
        .with_scheme(IntegrationScheme::Leapfrog);
    let mut sim = FluidSim::block(params, 70, 70, spacing, Vec2::new(0.05, 0.05)).unwrap();

    c.bench_function("step_4.9k", |b| b.iter(|| sim.step(0.001)));
}

fn bench_seeded(c: &mut Criterion) {
    let mut sim = FluidSim::demo_5k().unwrap();
    c.bench_function("step_5k_seeded", |b| b.iter(|| sim.step(1.0 / 60.0)));
}

fn bench_self_gravity(c: &mut Criterion) {
    let mut params = SimulationParams::self_gravitating();
    params.field_size = UVec2::new(128, 128);
    let mut sim = FluidSim::new(params, 5000).unwrap();

    c.bench_function("step_5k_self_gravity_128", |b| b.iter(|| sim.step(1e-3)));
}

criterion_group!(benches, bench_step, bench_seeded, bench_self_gravity);
criterion_main!(benches);
