// spatial hash grid: cell hash into [0, N), stable sort by hash, cell-start index

use glam::{IVec2, Vec2};
use rayon::prelude::*;

use crate::cpu::particle::Particle;
use crate::error::{Result, try_alloc};

pub const HASH_P1: i64 = 1291;
pub const HASH_P2: i64 = 10079;

/// `cell_start` value for hashes no particle maps to.
pub const EMPTY_CELL: u32 = u32::MAX;

pub const CELL_OFFSETS: [IVec2; 9] = [
    IVec2::new(-1, -1),
    IVec2::new(-1, 0),
    IVec2::new(-1, 1),
    IVec2::new(0, -1),
    IVec2::new(0, 0),
    IVec2::new(0, 1),
    IVec2::new(1, -1),
    IVec2::new(1, 0),
    IVec2::new(1, 1),
];

#[inline]
pub fn cell_coord(pos: Vec2, h: f32) -> IVec2 {
    (pos / h).floor().as_ivec2()
}

/// `(i * P1 + j * P2) mod table_size`, euclidean so negative cells stay in range.
#[inline]
pub fn cell_hash(cell: IVec2, table_size: usize) -> u32 {
    let mixed = (cell.x as i64) * HASH_P1 + (cell.y as i64) * HASH_P2;
    mixed.rem_euclid(table_size.max(1) as i64) as u32
}

#[inline]
pub fn position_hash(pos: Vec2, h: f32, table_size: usize) -> u32 {
    cell_hash(cell_coord(pos, h), table_size)
}

#[derive(Clone, Debug)]
pub struct SpatialHashGrid {
    kernel_radius: f32,
    cell_start: Vec<u32>,
}

impl SpatialHashGrid {
    pub fn new(particle_count: usize, kernel_radius: f32) -> Result<Self> {
        Ok(Self {
            kernel_radius,
            cell_start: try_alloc("cell-start index", particle_count, EMPTY_CELL)?,
        })
    }

    pub fn kernel_radius(&self) -> f32 {
        self.kernel_radius
    }

    pub fn cell_start(&self) -> &[u32] {
        &self.cell_start
    }

    /// Stage 1 (parallel): refresh every particle's `cell_hash` from its current position.
    pub fn update_hashes(particles: &mut [Particle], h: f32) {
        let n = particles.len();
        particles.par_iter_mut().for_each(|p| {
            p.cell_hash = position_hash(p.position, h, n);
        });
    }

    /// Stage 2 (sequential): stable sort by hash and rebuild `cell_start`.
    pub fn sort_and_build_index(&mut self, particles: &mut [Particle]) {
        particles.sort_by_key(|p| p.cell_hash);

        self.cell_start.clear();
        self.cell_start.resize(particles.len(), EMPTY_CELL);

        let mut last_hash = EMPTY_CELL;
        for (i, p) in particles.iter().enumerate() {
            if p.cell_hash != last_hash {
                self.cell_start[p.cell_hash as usize] = i as u32;
                last_hash = p.cell_hash;
            }
        }
    }

    /// Hash, sort and index in one go. Positions must not change until the next rebuild.
    pub fn rebuild(&mut self, particles: &mut [Particle], h: f32) {
        self.kernel_radius = h;
        Self::update_hashes(particles, h);
        self.sort_and_build_index(particles);
    }

    /// Visit every particle whose hash matches one of the 3x3 cells around `pos`.
    ///
    /// A run of particles is visited at most once even when several of the nine cells
    /// collide on the same hash. Visited particles may lie far away (hash collisions);
    /// the callback is expected to test the distance itself.
    pub fn for_each_neighbour<F>(&self, particles: &[Particle], pos: Vec2, mut f: F)
    where
        F: FnMut(usize, &Particle),
    {
        let n = particles.len();
        debug_assert_eq!(n, self.cell_start.len(), "grid built for another particle count");

        let center = cell_coord(pos, self.kernel_radius);
        let mut seen = [EMPTY_CELL; 9];

        for (slot, offset) in CELL_OFFSETS.iter().enumerate() {
            let hash = cell_hash(center + *offset, n);
            if seen[..slot].contains(&hash) {
                continue;
            }
            seen[slot] = hash;

            let start = self.cell_start[hash as usize];
            if start == EMPTY_CELL {
                continue;
            }
            for (j, other) in particles.iter().enumerate().skip(start as usize) {
                if other.cell_hash != hash {
                    break;
                }
                f(j, other);
            }
        }
    }
}
