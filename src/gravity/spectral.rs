// periodic spectral poisson solve: density -> FFT -> -G / |k|^2 (DC = 0) -> IFFT -> potential

use std::f32::consts::TAU;

use bevy::log::debug;
use glam::{UVec2, Vec2};
use rayon::prelude::*;

use crate::cpu::grid::SpatialHashGrid;
use crate::cpu::params::SimulationParams;
use crate::cpu::particle::Particle;
use crate::error::{Result, try_alloc};
use crate::gravity::fft::{Complex, Direction, Fft2d};
use crate::gravity::field::{ScalarField, SpectrumField, VectorField, rasterize, texel_count};

/// Signed frequency of bin `i` in a transform of length `n`.
#[inline]
pub fn signed_frequency(i: u32, n: u32) -> f32 {
    if i <= n / 2 {
        i as f32
    } else {
        i as f32 - n as f32
    }
}

/// Multiply every bin by `-g / |k|^2`; the zero-frequency bin (mean density) becomes zero.
pub fn apply_inverse_laplacian(spectrum: &mut SpectrumField, g: f32) {
    let (w, h) = (spectrum.width(), spectrum.height());
    spectrum
        .data_mut()
        .par_chunks_mut(w as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let ky = TAU * signed_frequency(y as u32, h);
            for (x, bin) in row.iter_mut().enumerate() {
                let kx = TAU * signed_frequency(x as u32, w);
                let k2 = kx * kx + ky * ky;
                if k2 == 0.0 {
                    *bin = Complex::ZERO;
                } else {
                    *bin *= -g / k2;
                }
            }
        });
}

pub struct SpectralSolver {
    fft: Fft2d,
    spectrum: SpectrumField, // filtered frequency-domain density
    work: Vec<Complex>,
    potential: ScalarField,
}

impl SpectralSolver {
    pub fn new(size: UVec2) -> Result<Self> {
        let len = texel_count(size)?;
        Ok(Self {
            fft: Fft2d::new(size.x as usize, size.y as usize)?,
            spectrum: SpectrumField::new(size, Complex::ZERO)?,
            work: try_alloc("spectral work buffer", len, Complex::ZERO)?,
            potential: ScalarField::new(size, 0.0)?,
        })
    }

    pub fn size(&self) -> UVec2 {
        self.potential.size()
    }

    pub fn spectrum(&self) -> &SpectrumField {
        &self.spectrum
    }

    pub fn potential(&self) -> &ScalarField {
        &self.potential
    }

    /// Forward transform of a real field into the spectrum buffer.
    pub fn forward(&mut self, field: &ScalarField) {
        debug_assert_eq!(field.size(), self.size());
        self.spectrum
            .data_mut()
            .par_iter_mut()
            .zip(field.data().par_iter())
            .for_each(|(bin, &value)| *bin = Complex::new(value, 0.0));
        self.fft.process(self.spectrum.data_mut(), Direction::Forward);
    }

    /// Inverse transform of the spectrum buffer; the real part lands in `out`.
    pub fn inverse_into(&mut self, out: &mut ScalarField) {
        inverse_real(&mut self.fft, &self.spectrum, &mut self.work, out);
    }

    /// Solve laplacian(phi) = g * rho for the given density field.
    pub fn solve(&mut self, density: &ScalarField, g: f32) -> &ScalarField {
        self.forward(density);
        apply_inverse_laplacian(&mut self.spectrum, g);

        inverse_real(&mut self.fft, &self.spectrum, &mut self.work, &mut self.potential);
        &self.potential
    }
}

// the spectrum is kept intact, the transform runs on a copy
fn inverse_real(
    fft: &mut Fft2d,
    spectrum: &SpectrumField,
    work: &mut [Complex],
    out: &mut ScalarField,
) {
    work.copy_from_slice(spectrum.data());
    fft.process(work, Direction::Inverse);
    out.data_mut()
        .par_iter_mut()
        .zip(work.par_iter())
        .for_each(|(value, bin)| *value = bin.re);
}

/// Density/velocity fields plus the optional potential solve, sized by `field_size`.
pub struct GravityFields {
    density: ScalarField,
    velocity: VectorField,
    solver: Option<SpectralSolver>,
}

impl GravityFields {
    pub fn new(params: &SimulationParams) -> Result<Self> {
        let size = params.field_size;
        debug!(
            "allocating {}x{} fields (self-gravity: {})",
            size.x, size.y, params.self_gravity
        );
        Ok(Self {
            density: ScalarField::new(size, 0.0)?,
            velocity: VectorField::new(size, Vec2::ZERO)?,
            solver: if params.self_gravity {
                Some(SpectralSolver::new(size)?)
            } else {
                None
            },
        })
    }

    /// Whether these buffers can be reused for `params` without reallocating.
    pub fn matches(&self, params: &SimulationParams) -> bool {
        self.density.size() == params.field_size && self.solver.is_some() == params.self_gravity
    }

    pub fn density(&self) -> &ScalarField {
        &self.density
    }

    pub fn velocity(&self) -> &VectorField {
        &self.velocity
    }

    pub fn potential(&self) -> Option<&ScalarField> {
        self.solver.as_ref().map(SpectralSolver::potential)
    }

    pub fn spectrum(&self) -> Option<&SpectrumField> {
        self.solver.as_ref().map(SpectralSolver::spectrum)
    }

    /// Rasterise the particles and, with self-gravity on, solve for the potential.
    pub fn update(
        &mut self,
        particles: &[Particle],
        grid: &SpatialHashGrid,
        params: &SimulationParams,
    ) -> Option<&ScalarField> {
        rasterize(particles, grid, &mut self.density, &mut self.velocity);
        match self.solver.as_mut() {
            Some(solver) => Some(solver.solve(&self.density, params.gravity_constant)),
            None => None,
        }
    }
}
