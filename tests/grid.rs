use bevy_sph_fluid::cpu::grid::{EMPTY_CELL, SpatialHashGrid, cell_hash, position_hash};
use bevy_sph_fluid::{FluidSim, SimulationParams};
use glam::{IVec2, Vec2};

fn seeded(n: usize) -> FluidSim {
    FluidSim::new(SimulationParams::default(), n).unwrap()
}

#[test]
fn hashes_match_positions_and_are_sorted() {
    let sim = seeded(1500);
    let h = sim.params().kernel_radius;
    let n = sim.particle_count();
    let particles = sim.particles();

    for p in particles {
        assert_eq!(p.cell_hash, position_hash(p.position, h, n));
    }
    assert!(particles.windows(2).all(|w| w[0].cell_hash <= w[1].cell_hash));
}

#[test]
fn cell_start_points_at_first_of_each_run() {
    let sim = seeded(1000);
    let particles = sim.particles();
    let cell_start = sim.cell_start();
    assert_eq!(cell_start.len(), particles.len());

    for (hash, &start) in cell_start.iter().enumerate() {
        if start == EMPTY_CELL {
            assert!(particles.iter().all(|p| p.cell_hash as usize != hash));
            continue;
        }
        let start = start as usize;
        assert_eq!(particles[start].cell_hash as usize, hash);
        if start > 0 {
            assert_ne!(particles[start - 1].cell_hash as usize, hash);
        }
    }
}

#[test]
fn neighbour_walk_finds_every_particle_in_range() {
    let sim = seeded(800);
    let h = sim.params().kernel_radius;
    let particles = sim.particles();

    for i in (0..particles.len()).step_by(37) {
        let pos = particles[i].position;
        let mut visited = vec![0u32; particles.len()];
        sim.grid()
            .for_each_neighbour(particles, pos, |j, _| visited[j] += 1);

        for (j, other) in particles.iter().enumerate() {
            if pos.distance(other.position) < h {
                assert_eq!(visited[j], 1, "particle {j} near {i} visited {} times", visited[j]);
            }
            // colliding cells never count a particle twice
            assert!(visited[j] <= 1);
        }
    }
}

#[test]
fn hashes_stay_in_range_outside_domain() {
    for cell in [IVec2::new(-3, -7), IVec2::new(-1, 0), IVec2::new(400, -400)] {
        assert!(cell_hash(cell, 100) < 100);
    }
    assert!(position_hash(Vec2::new(-0.5, 1.7), 0.04, 37) < 37);
}

#[test]
fn rebuild_after_moving_particles() {
    let mut store = bevy_sph_fluid::cpu::particle::ParticleStore::block(
        8,
        8,
        0.03,
        Vec2::new(0.1, 0.1),
    )
    .unwrap();
    let particles = store.as_mut_slice();
    let mut grid = SpatialHashGrid::new(particles.len(), 0.04).unwrap();
    grid.rebuild(particles, 0.04);

    for p in particles.iter_mut() {
        p.position += Vec2::new(0.5, 0.3);
    }
    grid.rebuild(particles, 0.04);
    for p in particles.iter() {
        assert_eq!(p.cell_hash, position_hash(p.position, 0.04, 64));
    }
}
