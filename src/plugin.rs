use bevy::prelude::*;
use glam::Vec2;

use crate::cpu::sph2d::{FluidSim, StepReport};

// ==================== events ==========================================

/// Reallocate and reseed the particle store.
#[derive(Event, Clone, Copy, Debug)]
pub struct ResizeParticles(pub usize);

/// Drag/push location in domain coordinates, `None` releases it.
#[derive(Event, Clone, Copy, Debug)]
pub struct SetInteraction(pub Option<Vec2>);

#[derive(Event, Clone, Copy, Debug)]
pub struct SetRunning(pub bool);

// ==================== resources =======================================

#[derive(Resource, Default, Debug)]
pub struct LastStepReport(pub Option<StepReport>);

// ==================== systems =========================================

fn apply_requests(
    mut sim: ResMut<FluidSim>,
    mut resize: EventReader<ResizeParticles>,
    mut interaction: EventReader<SetInteraction>,
    mut running: EventReader<SetRunning>,
) {
    // only the latest request of each kind matters
    if let Some(ResizeParticles(count)) = resize.read().last().copied() {
        if let Err(err) = sim.set_particle_count(count) {
            warn!("ignoring resize request: {err}");
        }
    }
    if let Some(SetInteraction(point)) = interaction.read().last().copied() {
        sim.set_interaction(point);
    }
    if let Some(SetRunning(run)) = running.read().last().copied() {
        sim.set_running(run);
    }
}

fn step_fluid(mut sim: ResMut<FluidSim>, mut last: ResMut<LastStepReport>, time: Res<Time>) {
    match sim.tick(time.delta_secs()) {
        Ok(Some(report)) => {
            if report.non_finite_forces + report.non_finite_states > 0 {
                warn!("step repaired non-finite particle state: {report:?}");
            }
            last.0 = Some(report);
        }
        Ok(None) => {}
        Err(err) => {
            error!("fluid step failed, pausing simulation: {err}");
            sim.set_running(false);
            last.0 = None;
        }
    }
}

// ==================== plugin ==========================================

/// Steps the `FluidSim` resource once per frame from the frame delta.
/// The resource itself is inserted by the application.
pub struct FluidSimPlugin;

impl Plugin for FluidSimPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<ResizeParticles>()
            .add_event::<SetInteraction>()
            .add_event::<SetRunning>()
            .init_resource::<LastStepReport>()
            .add_systems(
                Update,
                (apply_requests, step_fluid)
                    .chain()
                    .run_if(resource_exists::<FluidSim>),
            );
    }
}
