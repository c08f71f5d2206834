pub mod error;
pub mod ffi;
pub mod plugin;

pub mod cpu {
    pub mod forces;
    pub mod grid;
    pub mod integrator;
    pub mod kernel;
    pub mod params;
    pub mod particle;
    pub mod sph2d;
}

pub mod gravity {
    pub mod fft;
    pub mod field;
    pub mod spectral;
}

pub use cpu::params::{
    DragInteraction, EquationOfState, IntegrationScheme, ReseedMode, SimulationParams,
};
pub use cpu::particle::Particle;
pub use cpu::sph2d::{FluidSim, StepReport};
pub use error::{Result, SimError};
pub use plugin::{FluidSimPlugin, ResizeParticles, SetInteraction, SetRunning};
