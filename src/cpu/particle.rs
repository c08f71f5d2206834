use bevy::log::debug;
use glam::Vec2;
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::cpu::params::ReseedMode;
use crate::error::{Result, SimError, try_alloc};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Particle {
    pub position: Vec2,
    pub velocity: Vec2,
    pub xsph_velocity: Vec2,
    pub acceleration: Vec2,
    pub density: f32,
    pub cell_hash: u32,
}

impl Particle {
    pub fn new(position: Vec2) -> Self {
        Self { position, ..Default::default() }
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }
}

/// Contiguous particle array. Length only changes through a full reallocation.
#[derive(Clone, Debug)]
pub struct ParticleStore {
    particles: Vec<Particle>,
}

impl ParticleStore {
    /// Allocate `count` particles scattered around the domain center.
    /// Returns the store together with the seed that produced it.
    pub fn seeded(count: usize, mode: ReseedMode) -> Result<(Self, u64)> {
        if count == 0 {
            return Err(SimError::InvalidParticleCount(count));
        }
        let seed = match mode {
            ReseedMode::Seeded(seed) => seed,
            ReseedMode::Random => rand::rng().random::<u64>(),
        };
        let mut particles = try_alloc("particle store", count, Particle::default())?;
        let mut rng = StdRng::seed_from_u64(seed);
        for p in &mut particles {
            *p = Particle::new(seed_position(&mut rng));
        }
        debug!("seeded {count} particles with seed {seed}");
        Ok((Self { particles }, seed))
    }

    pub fn from_particles(particles: Vec<Particle>) -> Result<Self> {
        if particles.is_empty() {
            return Err(SimError::InvalidParticleCount(0));
        }
        Ok(Self { particles })
    }

    /// Regular n_x * n_y lattice, row by row starting at `origin`.
    pub fn block(n_x: usize, n_y: usize, spacing: f32, origin: Vec2) -> Result<Self> {
        let count = n_x * n_y;
        if count == 0 {
            return Err(SimError::InvalidParticleCount(count));
        }
        let mut particles = try_alloc("particle store", count, Particle::default())?;
        for iy in 0..n_y {
            for ix in 0..n_x {
                let pos = origin + Vec2::new(ix as f32 * spacing, iy as f32 * spacing);
                particles[iy * n_x + ix] = Particle::new(pos);
            }
        }
        Ok(Self { particles })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Mass carried by every particle; total mass is one.
    #[inline]
    pub fn particle_mass(&self) -> f32 {
        1.0 / self.particles.len() as f32
    }

    pub fn as_slice(&self) -> &[Particle] {
        &self.particles
    }

    pub fn as_mut_slice(&mut self) -> &mut [Particle] {
        &mut self.particles
    }
}

// gaussian blob: mean 50, deviation 10, cut at 3 sigma,
// quantised to hundredths, then jittered
fn seed_position(rng: &mut StdRng) -> Vec2 {
    let quantised = |rng: &mut StdRng| {
        let z = standard_normal(rng);
        (50.0 + 10.0 * z).round().clamp(20.0, 80.0) / 100.0
    };
    let base = Vec2::new(quantised(rng), quantised(rng));
    let jitter = Vec2::new(
        rng.random_range(-0.01..=0.01),
        rng.random_range(-0.01..=0.01),
    );
    (base + jitter).clamp(Vec2::ZERO, Vec2::ONE)
}

// Box-Muller
fn standard_normal(rng: &mut StdRng) -> f32 {
    let u1: f32 = 1.0 - rng.random::<f32>(); // (0, 1]
    let u2: f32 = rng.random::<f32>();
    (-2.0 * u1.ln()).sqrt() * (std::f32::consts::TAU * u2).cos()
}
