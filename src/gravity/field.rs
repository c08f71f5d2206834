// fixed-resolution 2D fields over the unit square (density, velocity, potential, spectrum)
use glam::{UVec2, Vec2};
use rayon::prelude::*;

use crate::cpu::forces::density_floor;
use crate::cpu::grid::SpatialHashGrid;
use crate::cpu::kernel::kernel;
use crate::cpu::particle::Particle;
use crate::error::{Result, SimError, try_alloc};
use crate::gravity::fft::Complex;

/// Number of texels in a `size` grid, computed without overflowing.
pub fn texel_count(size: UVec2) -> Result<usize> {
    (size.x as usize)
        .checked_mul(size.y as usize)
        .ok_or(SimError::Allocation {
            what: "field buffer",
            requested: usize::MAX,
        })
}

#[derive(Clone, Debug)]
pub struct Field2<T> {
    width: u32,
    height: u32,
    data: Vec<T>, // row-major, y * width + x
}

pub type ScalarField = Field2<f32>;
pub type VectorField = Field2<Vec2>;
pub type SpectrumField = Field2<Complex>;

impl<T: Copy> Field2<T> {
    pub fn new(size: UVec2, fill: T) -> Result<Self> {
        let UVec2 { x: width, y: height } = size;
        if width == 0 || height == 0 {
            return Err(SimError::InvalidFieldSize { width, height });
        }
        Ok(Self {
            width,
            height,
            data: try_alloc("field buffer", texel_count(size)?, fill)?,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> T {
        self.data[self.index(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: T) {
        let i = self.index(x, y);
        self.data[i] = value;
    }

    /// Domain position of a texel center.
    #[inline]
    pub fn texel_center(&self, x: u32, y: u32) -> Vec2 {
        Vec2::new(
            (x as f32 + 0.5) / self.width as f32,
            (y as f32 + 0.5) / self.height as f32,
        )
    }

    /// Texel containing `pos`, clamped into the field.
    #[inline]
    pub fn texel_of(&self, pos: Vec2) -> UVec2 {
        let scaled = pos * Vec2::new(self.width as f32, self.height as f32);
        let max = Vec2::new((self.width - 1) as f32, (self.height - 1) as f32);
        scaled.floor().clamp(Vec2::ZERO, max).as_uvec2()
    }
}

impl ScalarField {
    /// Nearest-texel sample.
    pub fn sample(&self, pos: Vec2) -> f32 {
        let t = self.texel_of(pos);
        self.get(t.x, t.y)
    }

    /// Central-difference gradient at the texel containing `pos`, periodic at the edges.
    pub fn gradient_at(&self, pos: Vec2) -> Vec2 {
        let t = self.texel_of(pos);
        let (w, h) = (self.width, self.height);
        let left = self.get((t.x + w - 1) % w, t.y);
        let right = self.get((t.x + 1) % w, t.y);
        let down = self.get(t.x, (t.y + h - 1) % h);
        let up = self.get(t.x, (t.y + 1) % h);
        Vec2::new(
            (right - left) * 0.5 * w as f32,
            (up - down) * 0.5 * h as f32,
        )
    }

    pub fn mean(&self) -> f32 {
        self.data.iter().sum::<f32>() / self.data.len() as f32
    }
}

/// Sample SPH density and velocity at every texel center, parallel over texels.
/// The grid must have been rebuilt for the current positions.
pub fn rasterize(
    particles: &[Particle],
    grid: &SpatialHashGrid,
    density: &mut ScalarField,
    velocity: &mut VectorField,
) {
    debug_assert_eq!(density.size(), velocity.size());
    let (w, h) = (density.width as f32, density.height as f32);
    let width = density.width as usize;
    let mass = 1.0 / particles.len() as f32;
    let floor = density_floor(mass);
    let radius = grid.kernel_radius();

    density
        .data
        .par_iter_mut()
        .zip(velocity.data.par_iter_mut())
        .enumerate()
        .for_each(|(i, (rho, vel))| {
            let pos = Vec2::new(
                ((i % width) as f32 + 0.5) / w,
                ((i / width) as f32 + 0.5) / h,
            );
            let mut rho_sum = 0.0;
            let mut vel_sum = Vec2::ZERO;
            grid.for_each_neighbour(particles, pos, |_, other| {
                let d = pos.distance(other.position);
                if d < radius {
                    let weight = mass * kernel(d / radius);
                    rho_sum += weight;
                    vel_sum += weight * other.velocity / other.density.max(floor);
                }
            });
            *rho = rho_sum;
            *vel = vel_sum;
        });
}
