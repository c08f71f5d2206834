use bytemuck::{Pod, Zeroable};

use crate::cpu::particle::Particle;
use crate::gravity::field::ScalarField;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct RenderParticle {
    // plain arrays instead of glam so the layout matches WGSL/MSL structs
    pub pos: [f32; 2],
    pub vel: [f32; 2],
    pub rho: f32,
    pub _pad: f32,
}

impl From<&Particle> for RenderParticle {
    fn from(p: &Particle) -> Self {
        Self {
            pos: p.position.to_array(),
            vel: p.velocity.to_array(),
            rho: p.density,
            _pad: 0.0,
        }
    }
}

/// Copy the particle buffer into a GPU-uploadable layout.
pub fn pack_particles(particles: &[Particle]) -> Vec<RenderParticle> {
    particles.iter().map(RenderParticle::from).collect()
}

/// Refill an existing upload buffer, growing or shrinking it to the particle count.
pub fn pack_particles_into(particles: &[Particle], out: &mut Vec<RenderParticle>) {
    out.clear();
    out.extend(particles.iter().map(RenderParticle::from));
}

pub fn particle_bytes(packed: &[RenderParticle]) -> &[u8] {
    bytemuck::cast_slice(packed)
}

/// Raw texel bytes of a scalar field (row-major `f32`).
pub fn scalar_field_bytes(field: &ScalarField) -> &[u8] {
    bytemuck::cast_slice(field.data())
}
