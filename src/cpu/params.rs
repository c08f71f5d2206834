// simulation parameters ("uniforms") shared by every stage of the step
use bevy::prelude::Resource;
use glam::{UVec2, Vec2};

use crate::error::{Result, SimError};

pub const DEFAULT_SEED: u64 = 31415;

/// Largest field resolution accepted on either axis.
pub const MAX_FIELD_DIM: u32 = 4096;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntegrationScheme {
    /// v += a dt, x += v dt
    Euler,
    /// kick-drift-kick; Velocity Verlet is the same update order
    Leapfrog,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EquationOfState {
    /// P = k rho^gamma
    Polytropic,
    /// P = k ((rho / rho_0)^gamma - 1), clamped at zero
    Tait,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReseedMode {
    Seeded(u64),
    Random,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragInteraction {
    pub center: Vec2,
    pub radius: f32,
    /// positive pulls particles towards the center, negative pushes them away
    pub strength: f32,
    pub active: bool,
}

impl Default for DragInteraction {
    fn default() -> Self {
        Self {
            center: Vec2::new(0.5, 0.5),
            radius: 0.1,
            strength: 10.0,
            active: false,
        }
    }
}

#[derive(Clone, Debug, Resource)]
pub struct SimulationParams {
    pub kernel_radius: f32, // h, in domain units
    pub gravity: Vec2,
    pub stiffness: f32, // k
    pub rest_density: f32, // rho_0
    pub gamma: f32, // polytropic exponent
    pub equation_of_state: EquationOfState,
    pub cohesion: f32,
    pub friction: f32,
    pub xsph_strength: f32,
    pub wall_damping: f32,
    pub drag: DragInteraction,
    pub scheme: IntegrationScheme,
    pub step_size: f32, // last step actually taken
    pub max_step_size: f32,
    pub field_size: UVec2,
    pub self_gravity: bool,
    pub gravity_constant: f32,
    pub rasterize_fields: bool,
    pub reseed: ReseedMode,
    pub halt_on_divergence: bool,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            kernel_radius: 0.04,
            gravity: Vec2::new(0.0, -1.0),
            stiffness: 0.1,
            rest_density: 1000.0,
            gamma: 1.4,
            equation_of_state: EquationOfState::Polytropic,
            cohesion: 1.0,
            friction: 1e-2,
            xsph_strength: 0.0,
            wall_damping: 1.0,
            drag: DragInteraction::default(),
            scheme: IntegrationScheme::Leapfrog,
            step_size: 0.0,
            max_step_size: 1.0 / 60.0,
            field_size: UVec2::new(128, 128),
            self_gravity: false,
            gravity_constant: 1.0,
            rasterize_fields: false,
            reseed: ReseedMode::Seeded(DEFAULT_SEED),
            halt_on_divergence: false,
        }
    }
}

impl SimulationParams {
    /// Frictionless, gravity-free fluid; handy for conservation checks.
    pub fn isolated() -> Self {
        Self {
            gravity: Vec2::ZERO,
            cohesion: 0.0,
            friction: 0.0,
            xsph_strength: 0.0,
            wall_damping: 1.0,
            ..Self::default()
        }
    }

    /// Self-gravitating blob with the density/potential fields switched on.
    pub fn self_gravitating() -> Self {
        Self {
            gravity: Vec2::ZERO,
            self_gravity: true,
            rasterize_fields: true,
            ..Self::default()
        }
    }

    pub fn with_scheme(mut self, scheme: IntegrationScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_kernel_radius(mut self, h: f32) -> Self {
        self.kernel_radius = h;
        self
    }

    pub fn with_reseed(mut self, reseed: ReseedMode) -> Self {
        self.reseed = reseed;
        self
    }

    /// Fields are needed either for self-gravity or for visualisation.
    pub fn needs_fields(&self) -> bool {
        self.self_gravity || self.rasterize_fields
    }

    pub fn validate(&self) -> Result<()> {
        let h = self.kernel_radius;
        if !(h > 0.0 && h < 1.0) {
            return Err(SimError::param("kernel_radius", h, "must lie in (0, 1)"));
        }
        if !self.gravity.is_finite() {
            return Err(SimError::param("gravity", self.gravity.length(), "must be finite"));
        }
        non_negative("stiffness", self.stiffness)?;
        non_negative("cohesion", self.cohesion)?;
        non_negative("xsph_strength", self.xsph_strength)?;
        non_negative("wall_damping", self.wall_damping)?;
        non_negative("gravity_constant", self.gravity_constant)?;
        if !(0.0..=1.0).contains(&self.friction) {
            return Err(SimError::param("friction", self.friction, "must lie in [0, 1]"));
        }
        if !(self.gamma.is_finite() && self.gamma > 0.0) {
            return Err(SimError::param("gamma", self.gamma, "must be positive"));
        }
        if !(self.rest_density.is_finite() && self.rest_density > 0.0) {
            return Err(SimError::param("rest_density", self.rest_density, "must be positive"));
        }
        if !(self.max_step_size.is_finite() && self.max_step_size > 0.0) {
            return Err(SimError::param("max_step_size", self.max_step_size, "must be positive"));
        }
        if !(self.drag.radius.is_finite() && self.drag.radius > 0.0) {
            return Err(SimError::param("drag.radius", self.drag.radius, "must be positive"));
        }
        if !(self.drag.strength.is_finite() && self.drag.center.is_finite()) {
            return Err(SimError::param("drag.strength", self.drag.strength, "must be finite"));
        }
        let UVec2 { x: width, y: height } = self.field_size;
        let in_range = |n: u32| n.is_power_of_two() && n <= MAX_FIELD_DIM;
        if !(in_range(width) && in_range(height)) {
            return Err(SimError::InvalidFieldSize { width, height });
        }
        Ok(())
    }

    /// Pressure from density according to the selected equation of state.
    #[inline]
    pub fn pressure(&self, rho: f32) -> f32 {
        match self.equation_of_state {
            EquationOfState::Polytropic => self.stiffness * rho.max(0.0).powf(self.gamma),
            EquationOfState::Tait => {
                let ratio = rho.max(0.0) / self.rest_density;
                (self.stiffness * (ratio.powf(self.gamma) - 1.0)).max(0.0)
            }
        }
    }

    /// Internal energy per unit mass, u(rho) = integral of P / rho^2 d rho.
    pub fn specific_internal_energy(&self, rho: f32) -> f32 {
        let rho = rho.max(f32::MIN_POSITIVE);
        let (k, g) = (self.stiffness, self.gamma);
        let near_isothermal = (g - 1.0).abs() < 1e-6;
        match self.equation_of_state {
            EquationOfState::Polytropic if near_isothermal => k * rho.ln(),
            EquationOfState::Polytropic => k * rho.powf(g - 1.0) / (g - 1.0),
            EquationOfState::Tait => {
                let rho_0 = self.rest_density;
                if rho <= rho_0 {
                    return 0.0;
                }
                let power_term = if near_isothermal {
                    (rho / rho_0).ln() / rho_0
                } else {
                    (rho.powf(g - 1.0) - rho_0.powf(g - 1.0)) / (rho_0.powf(g) * (g - 1.0))
                };
                k * (power_term + 1.0 / rho - 1.0 / rho_0)
            }
        }
    }
}

fn non_negative(name: &'static str, value: f32) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SimError::param(name, value, "must be finite and non-negative"))
    }
}
