// time integration and wall collision on the unit square
use bevy::log::error;
use glam::Vec2;
use rayon::prelude::*;

use crate::error::{Result, SimError};
use crate::cpu::particle::Particle;

pub const DOMAIN_MIN: f32 = 0.0;
pub const DOMAIN_MAX: f32 = 1.0;

/// Explicit Euler: v += a dt, then x += (v + xsph) dt.
pub fn euler_step(particles: &mut [Particle], dt: f32) {
    particles.par_iter_mut().for_each(|p| {
        p.velocity += p.acceleration * dt;
        p.position += (p.velocity + p.xsph_velocity) * dt;
    });
}

/// One half of a kick-drift-kick step.
///
/// First phase (`second_phase == false`) kicks with the acceleration of the previous step
/// and drifts the position. Second phase only kicks, with the freshly computed acceleration.
pub fn leapfrog_partial_step(particles: &mut [Particle], dt: f32, second_phase: bool) {
    let half_dt = 0.5 * dt;
    particles.par_iter_mut().for_each(|p| {
        p.velocity += p.acceleration * half_dt;
        if !second_phase {
            p.position += (p.velocity + p.xsph_velocity) * dt;
        }
    });
}

/// Clamp into the unit square; a clamped axis reflects its velocity scaled by `damping`.
pub fn resolve_wall_collisions(particles: &mut [Particle], damping: f32) {
    particles.par_iter_mut().for_each(|p| {
        reflect_axis(&mut p.position.x, &mut p.velocity.x, damping);
        reflect_axis(&mut p.position.y, &mut p.velocity.y, damping);
    });
}

#[inline]
fn reflect_axis(pos: &mut f32, vel: &mut f32, damping: f32) {
    if *pos < DOMAIN_MIN {
        *pos = DOMAIN_MIN;
        *vel *= -damping;
    } else if *pos > DOMAIN_MAX {
        *pos = DOMAIN_MAX;
        *vel *= -damping;
    }
}

/// Zero non-finite velocities (and pin non-finite positions to the domain center).
/// Returns how many particles had to be repaired, or an error when `halt` is set.
pub fn check_velocities(particles: &mut [Particle], halt: bool) -> Result<usize> {
    let broken = particles
        .par_iter()
        .filter(|p| !(p.velocity.is_finite() && p.position.is_finite()))
        .count();
    if broken == 0 {
        return Ok(0);
    }
    if halt {
        return Err(SimError::NumericalDivergence {
            stage: "integration",
            particles: broken,
        });
    }
    error!("integration produced {broken} non-finite particle states, resetting them");
    particles.par_iter_mut().for_each(|p| {
        if !p.velocity.is_finite() {
            p.velocity = Vec2::ZERO;
        }
        if !p.position.is_finite() {
            p.position = Vec2::splat(0.5 * (DOMAIN_MIN + DOMAIN_MAX));
            p.velocity = Vec2::ZERO;
        }
    });
    Ok(broken)
}
