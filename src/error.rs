use thiserror::Error;

pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error("particle count must be positive, got {0}")]
    InvalidParticleCount(usize),

    #[error("invalid parameter `{name}` = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f32,
        reason: &'static str,
    },

    #[error("field size {width}x{height} must be a power of two of at most 4096 on both axes")]
    InvalidFieldSize { width: u32, height: u32 },

    #[error("numerical divergence in {stage}: {particles} particle(s) produced non-finite values")]
    NumericalDivergence {
        stage: &'static str,
        particles: usize,
    },

    #[error("failed to allocate {what} for {requested} elements")]
    Allocation { what: &'static str, requested: usize },
}

impl SimError {
    pub(crate) fn param(name: &'static str, value: f32, reason: &'static str) -> Self {
        Self::InvalidParameter {
            name,
            value,
            reason,
        }
    }
}

/// Allocate a vector of exactly `len` copies of `value`, reporting failure instead of aborting.
pub(crate) fn try_alloc<T: Clone>(what: &'static str, len: usize, value: T) -> Result<Vec<T>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| SimError::Allocation { what, requested: len })?;
    buf.resize(len, value);
    Ok(buf)
}
