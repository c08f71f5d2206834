use std::time::Duration;

use bevy::prelude::*;
use bevy_sph_fluid::plugin::LastStepReport;
use bevy_sph_fluid::{FluidSim, FluidSimPlugin, ResizeParticles, SetInteraction, SetRunning, SimulationParams};

fn app_with_sim(count: usize) -> App {
    let mut app = App::new();
    app.init_resource::<Time>();
    app.insert_resource(FluidSim::new(SimulationParams::default(), count).unwrap());
    app.add_plugins(FluidSimPlugin);
    app
}

fn frame(app: &mut App, millis: u64) {
    app.world_mut()
        .resource_mut::<Time>()
        .advance_by(Duration::from_millis(millis));
    app.update();
}

#[test]
fn steps_once_per_frame() {
    let mut app = app_with_sim(128);
    frame(&mut app, 5);
    frame(&mut app, 5);

    assert_eq!(app.world().resource::<FluidSim>().step_count(), 2);
    let report = app.world().resource::<LastStepReport>().0.unwrap();
    assert!((report.dt - 0.005).abs() < 1e-6);
}

#[test]
fn long_frames_are_clamped() {
    let mut app = app_with_sim(64);
    frame(&mut app, 250);
    let sim = app.world().resource::<FluidSim>();
    assert_eq!(sim.current_step_size(), 1.0 / 60.0);
}

#[test]
fn events_reach_the_simulation() {
    let mut app = app_with_sim(64);

    app.world_mut().send_event(ResizeParticles(200));
    app.world_mut()
        .send_event(SetInteraction(Some(glam::Vec2::new(0.25, 0.75))));
    frame(&mut app, 5);
    {
        let sim = app.world().resource::<FluidSim>();
        assert_eq!(sim.particle_count(), 200);
        assert_eq!(sim.interaction(), Some(glam::Vec2::new(0.25, 0.75)));
    }

    app.world_mut().send_event(SetRunning(false));
    frame(&mut app, 5);
    frame(&mut app, 5);
    let sim = app.world().resource::<FluidSim>();
    assert!(!sim.is_running());
    assert_eq!(sim.step_count(), 1);
}

#[test]
fn bad_resize_keeps_old_particles() {
    let mut app = app_with_sim(64);
    app.world_mut().send_event(ResizeParticles(0));
    frame(&mut app, 5);
    assert_eq!(app.world().resource::<FluidSim>().particle_count(), 64);
}

#[test]
fn plugin_idles_without_simulation() {
    let mut app = App::new();
    app.init_resource::<Time>();
    app.add_plugins(FluidSimPlugin);
    frame(&mut app, 5);
    assert!(app.world().resource::<LastStepReport>().0.is_none());
}
