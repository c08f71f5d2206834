use bevy_sph_fluid::cpu::integrator::{check_velocities, resolve_wall_collisions};
use bevy_sph_fluid::{FluidSim, IntegrationScheme, Particle, SimError, SimulationParams};
use glam::Vec2;

fn energy(sim: &FluidSim) -> f32 {
    sim.kinetic_energy() + sim.internal_energy()
}

#[test]
fn wall_reflects_with_damping() {
    for scheme in [IntegrationScheme::Euler, IntegrationScheme::Leapfrog] {
        let mut params = SimulationParams::isolated().with_scheme(scheme);
        params.wall_damping = 0.5;
        let particle = Particle::new(Vec2::new(1.2, 0.5)).with_velocity(Vec2::new(2.0, 0.0));
        let mut sim = FluidSim::from_particles(params, vec![particle]).unwrap();
        sim.step(0.01).unwrap();

        let p = sim.particles()[0];
        assert_eq!(p.position.x, 1.0, "{scheme:?}");
        assert_eq!(p.velocity.x, -1.0, "{scheme:?}");
    }
}

#[test]
fn wall_collision_clamps_every_side() {
    let mut particles = vec![
        Particle::new(Vec2::new(-0.1, 0.5)).with_velocity(Vec2::new(-1.0, 0.0)),
        Particle::new(Vec2::new(0.5, 1.3)).with_velocity(Vec2::new(0.0, 3.0)),
        Particle::new(Vec2::new(0.5, 0.5)).with_velocity(Vec2::new(1.0, 1.0)),
    ];
    resolve_wall_collisions(&mut particles, 1.0);
    assert_eq!(particles[0].position, Vec2::new(0.0, 0.5));
    assert_eq!(particles[0].velocity, Vec2::new(1.0, 0.0));
    assert_eq!(particles[1].position, Vec2::new(0.5, 1.0));
    assert_eq!(particles[1].velocity, Vec2::new(0.0, -3.0));
    // untouched inside the domain
    assert_eq!(particles[2].velocity, Vec2::new(1.0, 1.0));
}

#[test]
fn lone_particle_falls_under_gravity() {
    let params = SimulationParams {
        friction: 0.0,
        cohesion: 0.0,
        ..SimulationParams::default()
    }
    .with_scheme(IntegrationScheme::Euler);
    let mut sim = FluidSim::from_particles(params, vec![Particle::new(Vec2::new(0.5, 0.8))]).unwrap();
    sim.step(0.01).unwrap();

    let p = sim.particles()[0];
    assert!((p.velocity.y + 0.01).abs() < 1e-6);
    assert!((p.position.y - (0.8 - 0.0001)).abs() < 1e-6);
}

#[test]
fn leapfrog_conserves_energy_of_a_pair() {
    let h = 0.05;
    let params = SimulationParams::isolated()
        .with_kernel_radius(h)
        .with_scheme(IntegrationScheme::Leapfrog);
    let particles = vec![
        Particle::new(Vec2::new(0.5 - 0.25 * h, 0.5)),
        Particle::new(Vec2::new(0.5 + 0.25 * h, 0.5)),
    ];
    let mut sim = FluidSim::from_particles(params, particles).unwrap();
    let start = energy(&sim);

    for _ in 0..2000 {
        sim.step(1e-4).unwrap();
    }
    let end = energy(&sim);

    // the pair has flown apart, pressure energy became kinetic
    assert!(sim.kinetic_energy() > 0.0);
    assert!((end - start).abs() <= start * 1e-3 + 1e-5, "{start} -> {end}");
}

#[test]
fn euler_and_leapfrog_agree_on_small_steps() {
    let base = SimulationParams::default();
    let mut euler = FluidSim::new(base.clone().with_scheme(IntegrationScheme::Euler), 200).unwrap();
    let mut leapfrog = FluidSim::new(base.with_scheme(IntegrationScheme::Leapfrog), 200).unwrap();
    for _ in 0..5 {
        euler.step(1e-4).unwrap();
        leapfrog.step(1e-4).unwrap();
    }
    let centroid = |sim: &FluidSim| {
        sim.particles().iter().map(|p| p.position).sum::<Vec2>() / sim.particle_count() as f32
    };
    assert!(centroid(&euler).distance(centroid(&leapfrog)) < 1e-4);
}

#[test]
fn non_finite_state_is_repaired_or_reported() {
    let mut particles = vec![
        Particle::new(Vec2::new(0.2, 0.2)).with_velocity(Vec2::new(f32::NAN, 0.0)),
        Particle::new(Vec2::new(f32::INFINITY, 0.2)),
        Particle::new(Vec2::new(0.4, 0.4)),
    ];
    let mut broken = particles.clone();
    assert_eq!(
        check_velocities(&mut broken, true),
        Err(SimError::NumericalDivergence { stage: "integration", particles: 2 })
    );

    assert_eq!(check_velocities(&mut particles, false), Ok(2));
    for p in &particles {
        assert!(p.position.is_finite() && p.velocity.is_finite());
    }
    assert_eq!(particles[1].position, Vec2::splat(0.5));
}

#[test]
fn long_run_keeps_particles_in_domain() {
    let mut sim = FluidSim::new(SimulationParams::default(), 500).unwrap();
    sim.set_interaction(Some(Vec2::new(0.5, 0.3)));
    for _ in 0..200 {
        let report = sim.tick(1.0 / 60.0).unwrap().unwrap();
        assert_eq!(report.non_finite_states, 0);
    }
    for p in sim.particles() {
        assert!(p.position.cmpge(Vec2::ZERO).all() && p.position.cmple(Vec2::ONE).all());
        assert!(p.velocity.is_finite());
    }
}
