use bevy_sph_fluid::ffi::{RenderParticle, pack_particles, pack_particles_into, particle_bytes, scalar_field_bytes};
use bevy_sph_fluid::gravity::field::ScalarField;
use bevy_sph_fluid::{FluidSim, Particle, SimulationParams};
use glam::{UVec2, Vec2};

#[test]
fn render_particle_is_tightly_packed() {
    assert_eq!(std::mem::size_of::<RenderParticle>(), 24);
    assert_eq!(std::mem::align_of::<RenderParticle>(), 4);
}

#[test]
fn packed_bytes_follow_particle_order() {
    let mut p = Particle::new(Vec2::new(0.25, 0.5)).with_velocity(Vec2::new(-1.0, 2.0));
    p.density = 3.0;
    let packed = pack_particles(&[p, Particle::new(Vec2::ONE)]);
    let bytes = particle_bytes(&packed);
    assert_eq!(bytes.len(), 48);

    let floats: &[f32] = bytemuck::cast_slice(bytes);
    assert_eq!(&floats[..6], &[0.25, 0.5, -1.0, 2.0, 3.0, 0.0]);
    assert_eq!(&floats[6..8], &[1.0, 1.0]);
}

#[test]
fn upload_buffer_tracks_particle_count() {
    let mut sim = FluidSim::new(SimulationParams::default(), 100).unwrap();
    let mut buffer = Vec::new();
    pack_particles_into(sim.particles(), &mut buffer);
    assert_eq!(buffer.len(), 100);

    sim.set_particle_count(40).unwrap();
    pack_particles_into(sim.particles(), &mut buffer);
    assert_eq!(buffer.len(), 40);
    assert_eq!(buffer[0].pos, sim.particles()[0].position.to_array());
}

#[test]
fn field_bytes_are_row_major() {
    let mut field = ScalarField::new(UVec2::new(4, 2), 0.0).unwrap();
    field.set(1, 1, 7.0);
    let floats: &[f32] = bytemuck::cast_slice(scalar_field_bytes(&field));
    assert_eq!(floats.len(), 8);
    assert_eq!(floats[5], 7.0);
}
