// compact quadratic smoothing kernel on the unit disk, r = distance / h
use std::f32::consts::PI;

/// 1 / integral over the unit disk of (1 - r)^2, which is pi / 6
pub const KERNEL_NORMALISATION_2D: f32 = 6.0 / PI;

#[inline]
pub fn kernel(r: f32) -> f32 {
    if !(0.0..1.0).contains(&r) {
        return 0.0;
    }
    KERNEL_NORMALISATION_2D * (r - 1.0) * (r - 1.0)
}

/// d kernel / d r. Never positive, zero outside the support.
#[inline]
pub fn kernel_grad(r: f32) -> f32 {
    if !(0.0..1.0).contains(&r) {
        return 0.0;
    }
    (KERNEL_NORMALISATION_2D * 2.0 * (r - 1.0)).min(0.0)
}
