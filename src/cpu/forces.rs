// density and force evaluation over the 3x3 hash-grid neighbourhood
use bevy::log::error;
use glam::Vec2;
use rayon::prelude::*;

use crate::cpu::grid::SpatialHashGrid;
use crate::cpu::kernel::{kernel, kernel_grad};
use crate::cpu::params::{DragInteraction, SimulationParams};
use crate::cpu::particle::Particle;
use crate::error::{Result, SimError};
use crate::gravity::field::ScalarField;

/// Smallest density a particle can have: its own kernel contribution.
/// Used as the floor in every division by density.
#[inline]
pub fn density_floor(mass: f32) -> f32 {
    mass * kernel(0.0)
}

/// SPH density estimate at an arbitrary point, self-contribution included when `pos`
/// coincides with a particle.
pub fn density_at(particles: &[Particle], grid: &SpatialHashGrid, pos: Vec2, mass: f32) -> f32 {
    let h = grid.kernel_radius();
    let mut rho = 0.0;
    grid.for_each_neighbour(particles, pos, |_, other| {
        let d = pos.distance(other.position);
        if d < h {
            rho += mass * kernel(d / h);
        }
    });
    rho
}

/// Density pass. Reads positions only, writes `density` of every particle.
pub fn update_densities(particles: &mut [Particle], grid: &SpatialHashGrid) {
    let mass = 1.0 / particles.len() as f32;
    let densities: Vec<f32> = {
        let snapshot: &[Particle] = particles;
        snapshot
            .par_iter()
            .map(|p| density_at(snapshot, grid, p.position, mass))
            .collect()
    };
    particles
        .par_iter_mut()
        .zip(densities)
        .for_each(|(p, rho)| p.density = rho);
}

#[inline]
pub fn drag_acceleration(pos: Vec2, drag: &DragInteraction) -> Vec2 {
    if !drag.active {
        return Vec2::ZERO;
    }
    let to_center = drag.center - pos;
    let d = to_center.length();
    if d <= 0.0 || d >= drag.radius {
        return Vec2::ZERO;
    }
    drag.strength * (1.0 - d / drag.radius) * to_center / d
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ForceReport {
    /// particles whose acceleration or XSPH velocity was non-finite and got zeroed
    pub non_finite: usize,
}

/// Force pass: acceleration (gravity, pressure, cohesion, friction, drag, self-gravity)
/// and the XSPH velocity correction. Densities must be current.
pub fn update_accelerations(
    particles: &mut [Particle],
    grid: &SpatialHashGrid,
    params: &SimulationParams,
    potential: Option<&ScalarField>,
) -> Result<ForceReport> {
    let n = particles.len();
    let mass = 1.0 / n as f32;
    let h = grid.kernel_radius();
    let floor = density_floor(mass);

    let updates: Vec<(Vec2, Vec2)> = {
        let snapshot: &[Particle] = particles;

        // P / rho^2 per particle
        let pressure_terms: Vec<f32> = snapshot
            .par_iter()
            .map(|p| {
                let rho = p.density.max(floor);
                params.pressure(rho) / (rho * rho)
            })
            .collect();

        (0..n)
            .into_par_iter()
            .map(|i| {
                let pi = &snapshot[i];
                let rho_i = pi.density.max(floor);
                let mut acc = params.gravity - params.friction * pi.velocity;
                let mut xsph = Vec2::ZERO;

                grid.for_each_neighbour(snapshot, pi.position, |j, pj| {
                    if j == i {
                        return;
                    }
                    let r = pi.position - pj.position;
                    let d = r.length();
                    // coincident pairs have no direction
                    if d <= 0.0 || d >= h {
                        return;
                    }
                    let q = d / h;
                    let w = kernel(q);
                    let dir = r / d;

                    // W_ij = m kernel(d / h), so its gradient carries m / h
                    let grad_w = mass * kernel_grad(q) / h;
                    acc -= grad_w * (pressure_terms[i] + pressure_terms[j]) * dir;
                    acc -= params.cohesion * mass * w * r;

                    let rho_j = pj.density.max(floor);
                    xsph += w * pj.velocity / (rho_i + rho_j);
                });

                acc += drag_acceleration(pi.position, &params.drag);
                if let Some(phi) = potential {
                    acc -= phi.gradient_at(pi.position);
                }
                let xsph = if params.xsph_strength > 0.0 {
                    2.0 * params.xsph_strength * xsph
                } else {
                    Vec2::ZERO
                };
                (acc, xsph)
            })
            .collect()
    };

    let non_finite = updates
        .par_iter()
        .filter(|(acc, xsph)| !(acc.is_finite() && xsph.is_finite()))
        .count();

    if non_finite > 0 {
        if params.halt_on_divergence {
            return Err(SimError::NumericalDivergence {
                stage: "force evaluation",
                particles: non_finite,
            });
        }
        error!("force evaluation produced {non_finite} non-finite accelerations, zeroing them");
    }

    particles
        .par_iter_mut()
        .zip(updates)
        .for_each(|(p, (acc, xsph))| {
            if acc.is_finite() && xsph.is_finite() {
                p.acceleration = acc;
                p.xsph_velocity = xsph;
            } else {
                p.acceleration = Vec2::ZERO;
                p.xsph_velocity = Vec2::ZERO;
            }
        });

    Ok(ForceReport { non_finite })
}
