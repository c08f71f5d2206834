// smoothed particle hydrodynamics in 2D, one step = hash grid -> density -> forces -> integrate
use bevy::log::{debug, info};
use bevy::prelude::Resource;
use glam::Vec2;

use crate::cpu::forces::{density_floor, update_accelerations, update_densities};
use crate::cpu::grid::SpatialHashGrid;
use crate::cpu::integrator::{
    check_velocities, euler_step, leapfrog_partial_step, resolve_wall_collisions,
};
use crate::cpu::params::{IntegrationScheme, SimulationParams};
use crate::cpu::particle::{Particle, ParticleStore};
use crate::error::{Result, SimError};
use crate::gravity::fft::Complex;
use crate::gravity::field::{Field2, ScalarField, VectorField};
use crate::gravity::spectral::GravityFields;

/// Wall-clock frame delta turned into a step size: bounded above by `max_step`,
/// non-finite or negative deltas give a zero step.
#[inline]
pub fn clamp_step(delta_secs: f32, max_step: f32) -> f32 {
    if delta_secs.is_finite() && delta_secs > 0.0 {
        delta_secs.min(max_step)
    } else {
        0.0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StepReport {
    pub dt: f32,
    /// particles whose forces were non-finite and got zeroed
    pub non_finite_forces: usize,
    /// particles whose velocity/position was non-finite after integration
    pub non_finite_states: usize,
}

#[derive(Resource)]
pub struct FluidSim {
    params: SimulationParams,
    store: ParticleStore,
    grid: SpatialHashGrid,
    fields: Option<GravityFields>,
    running: bool,
    step_count: u64,
    seed: Option<u64>,
}

impl FluidSim {
    pub fn new(params: SimulationParams, particle_count: usize) -> Result<Self> {
        params.validate()?;
        let (store, seed) = ParticleStore::seeded(particle_count, params.reseed)?;
        let mut sim = Self::with_store(params, store)?;
        sim.seed = Some(seed);
        info!("fluid simulation with {particle_count} particles (seed {seed})");
        Ok(sim)
    }

    pub fn from_particles(params: SimulationParams, particles: Vec<Particle>) -> Result<Self> {
        params.validate()?;
        Self::with_store(params, ParticleStore::from_particles(particles)?)
    }

    /// Regular lattice of n_x * n_y particles starting at `origin`.
    pub fn block(
        params: SimulationParams,
        n_x: usize,
        n_y: usize,
        spacing: f32,
        origin: Vec2,
    ) -> Result<Self> {
        params.validate()?;
        Self::with_store(params, ParticleStore::block(n_x, n_y, spacing, origin)?)
    }

    fn with_store(params: SimulationParams, store: ParticleStore) -> Result<Self> {
        let grid = SpatialHashGrid::new(store.len(), params.kernel_radius)?;
        let fields = if params.needs_fields() {
            Some(GravityFields::new(&params)?)
        } else {
            None
        };
        let mut sim = Self {
            params,
            store,
            grid,
            fields,
            running: true,
            step_count: 0,
            seed: None,
        };
        // index and densities are valid before the first step
        sim.refresh();
        Ok(sim)
    }

    fn refresh(&mut self) {
        let particles = self.store.as_mut_slice();
        self.grid.rebuild(particles, self.params.kernel_radius);
        update_densities(particles, &self.grid);
    }

    // ------------------------------------------------------------ configuration

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    /// Replace every parameter at once. Nothing is applied if validation or a field
    /// reallocation fails.
    pub fn set_params(&mut self, mut params: SimulationParams) -> Result<()> {
        params.validate()?;
        let fields = match self.fields.take() {
            Some(fields) if params.needs_fields() && fields.matches(&params) => Some(fields),
            previous if params.needs_fields() => match GravityFields::new(&params) {
                Ok(fields) => Some(fields),
                Err(err) => {
                    self.fields = previous;
                    return Err(err);
                }
            },
            _ => None,
        };
        let radius_changed = params.kernel_radius != self.params.kernel_radius;
        params.step_size = self.params.step_size;
        self.params = params;
        self.fields = fields;
        if radius_changed {
            self.refresh();
        }
        Ok(())
    }

    fn update_params(&mut self, edit: impl FnOnce(&mut SimulationParams)) -> Result<()> {
        let mut params = self.params.clone();
        edit(&mut params);
        self.set_params(params)
    }

    pub fn set_kernel_radius(&mut self, h: f32) -> Result<()> {
        self.update_params(|p| p.kernel_radius = h)
    }

    pub fn set_stiffness(&mut self, k: f32) -> Result<()> {
        self.update_params(|p| p.stiffness = k)
    }

    pub fn set_friction(&mut self, friction: f32) -> Result<()> {
        self.update_params(|p| p.friction = friction)
    }

    pub fn set_xsph_strength(&mut self, strength: f32) -> Result<()> {
        self.update_params(|p| p.xsph_strength = strength)
    }

    pub fn set_wall_damping(&mut self, damping: f32) -> Result<()> {
        self.update_params(|p| p.wall_damping = damping)
    }

    /// Downward gravity of the given magnitude.
    pub fn set_gravity_strength(&mut self, g: f32) -> Result<()> {
        self.update_params(|p| p.gravity = Vec2::new(0.0, -g))
    }

    pub fn set_integration_scheme(&mut self, scheme: IntegrationScheme) -> Result<()> {
        self.update_params(|p| p.scheme = scheme)
    }

    pub fn set_self_gravity(&mut self, enabled: bool) -> Result<()> {
        self.update_params(|p| p.self_gravity = enabled)
    }

    /// Push particles away from the interaction point instead of pulling them in.
    pub fn set_push_mode(&mut self, push: bool) {
        let magnitude = self.params.drag.strength.abs();
        self.params.drag.strength = if push { -magnitude } else { magnitude };
    }

    pub fn push_mode(&self) -> bool {
        self.params.drag.strength < 0.0
    }

    /// Drag/push location in domain coordinates, `None` releases it.
    pub fn set_interaction(&mut self, point: Option<Vec2>) {
        match point {
            Some(center) if center.is_finite() => {
                self.params.drag.center = center;
                self.params.drag.active = true;
            }
            _ => self.params.drag.active = false,
        }
    }

    pub fn interaction(&self) -> Option<Vec2> {
        self.params.drag.active.then_some(self.params.drag.center)
    }

    /// Reallocate and reseed for a new particle count. The old state survives any error.
    pub fn set_particle_count(&mut self, count: usize) -> Result<()> {
        if count == 0 {
            return Err(SimError::InvalidParticleCount(count));
        }
        let (store, seed) = ParticleStore::seeded(count, self.params.reseed)?;
        let grid = SpatialHashGrid::new(count, self.params.kernel_radius)?;
        self.store = store;
        self.grid = grid;
        self.seed = Some(seed);
        self.refresh();
        info!("reseeded {count} particles (seed {seed})");
        Ok(())
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    // ------------------------------------------------------------ stepping

    /// Advance by a measured wall-clock delta. Does nothing while paused.
    pub fn tick(&mut self, delta_secs: f32) -> Result<Option<StepReport>> {
        let dt = clamp_step(delta_secs, self.params.max_step_size);
        self.params.step_size = dt;
        if !self.running {
            return Ok(None);
        }
        self.step(dt).map(Some)
    }

    /// One full step of size `dt`.
    pub fn step(&mut self, dt: f32) -> Result<StepReport> {
        let mut report = StepReport { dt, ..Default::default() };
        if !(dt.is_finite() && dt > 0.0) {
            return Ok(report);
        }
        self.params.step_size = dt;

        let params = &self.params;
        let particles = self.store.as_mut_slice();

        if params.scheme == IntegrationScheme::Leapfrog {
            // kick-drift with last step's acceleration
            leapfrog_partial_step(particles, dt, false);
            resolve_wall_collisions(particles, params.wall_damping);
        }

        self.grid.rebuild(particles, params.kernel_radius);
        update_densities(particles, &self.grid);

        let potential = match self.fields.as_mut() {
            Some(fields) => fields.update(particles, &self.grid, params),
            None => None,
        };

        let forces = update_accelerations(particles, &self.grid, params, potential)?;
        report.non_finite_forces = forces.non_finite;

        match params.scheme {
            IntegrationScheme::Euler => euler_step(particles, dt),
            IntegrationScheme::Leapfrog => leapfrog_partial_step(particles, dt, true),
        }
        resolve_wall_collisions(particles, params.wall_damping);
        report.non_finite_states = check_velocities(particles, params.halt_on_divergence)?;

        self.step_count += 1;
        if self.step_count % 600 == 0 {
            debug!(
                "step {}: dt = {dt:.5}, kinetic energy = {:.6}",
                self.step_count,
                self.kinetic_energy()
            );
        }
        Ok(report)
    }

    // ------------------------------------------------------------ read-only views

    /// Particles in hash-sorted order; the order carries no meaning across steps.
    pub fn particles(&self) -> &[Particle] {
        self.store.as_slice()
    }

    pub fn particle_count(&self) -> usize {
        self.store.len()
    }

    pub fn particle_mass(&self) -> f32 {
        self.store.particle_mass()
    }

    pub fn cell_start(&self) -> &[u32] {
        self.grid.cell_start()
    }

    pub fn grid(&self) -> &SpatialHashGrid {
        &self.grid
    }

    pub fn density_field(&self) -> Option<&ScalarField> {
        self.fields.as_ref().map(GravityFields::density)
    }

    pub fn velocity_field(&self) -> Option<&VectorField> {
        self.fields.as_ref().map(GravityFields::velocity)
    }

    pub fn potential_field(&self) -> Option<&ScalarField> {
        self.fields.as_ref().and_then(GravityFields::potential)
    }

    pub fn frequency_field(&self) -> Option<&Field2<Complex>> {
        self.fields.as_ref().and_then(GravityFields::spectrum)
    }

    pub fn current_step_size(&self) -> f32 {
        self.params.step_size
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Seed of the last reseed, `None` for hand-built particle sets.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    // ------------------------------------------------------------ diagnostics

    pub fn kinetic_energy(&self) -> f32 {
        let m = self.particle_mass();
        self.particles()
            .iter()
            .map(|p| 0.5 * m * p.velocity.length_squared())
            .sum()
    }

    /// Sum of m u(rho) over the particles, using the densities of the last evaluation.
    pub fn internal_energy(&self) -> f32 {
        let m = self.particle_mass();
        let floor = density_floor(m);
        self.particles()
            .iter()
            .map(|p| m * self.params.specific_internal_energy(p.density.max(floor)))
            .sum()
    }

    // demo function ----------------------------------------------
    pub fn demo_5k() -> Result<Self> {
        Self::new(SimulationParams::default(), 5000)
    }
    // ------------------------------------------------------------
}
