//! Fixed-point inversion of forward-only transforms
//!
//! Given a forward transform `F` and a target point, the solver looks for a
//! source point with `F(source) ≈ target` by repeatedly adding the
//! horizontal residual to its guess. Height is never iterated: the forward
//! transform is evaluated at height zero so its height output is the height
//! correction, which is subtracted from the target height once at the end.

use crate::core::{GeoPoint, ShiftResult, ShiftStatus};
use log::warn;
use serde::{Deserialize, Serialize};

/// Iteration limits for an inverse computation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InverseSettings {
    pub max_iterations: u32,
    /// Residual (degrees) below which an axis counts as converged
    pub convergence: f64,
    /// Looser residual (degrees) accepted with a degraded status
    pub error_tolerance: f64,
}

impl Default for InverseSettings {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            convergence: 1.0e-9,
            error_tolerance: 1.0e-6,
        }
    }
}

/// Invert `forward` at `target`
///
/// - A fatal forward status aborts with `Fatal` and the target unchanged
/// - A degraded forward status (no coverage) returns `Degraded` and the
///   target unchanged
/// - A fallback forward status is remembered and reported on success
/// - Exhausting the iterations returns `Degraded` with the last guess when
///   the residual is within `error_tolerance`, else `Fatal`
///
/// # Examples
/// ```
/// use datum_shift::{solve_inverse, GeoPoint, InverseSettings, ShiftResult, ShiftStatus};
/// let shift = |p: GeoPoint| ShiftResult::success(GeoPoint::new(p.lng + 0.5, p.lat - 0.25, p.hgt + 3.0));
/// let target = GeoPoint::new(10.5, 19.75, 100.0);
/// let result = solve_inverse(target, &InverseSettings::default(), shift);
/// assert_eq!(result.status, ShiftStatus::Success);
/// assert!((result.point.lng - 10.0).abs() < 1e-9);
/// assert!((result.point.lat - 20.0).abs() < 1e-9);
/// assert!((result.point.hgt - 97.0).abs() < 1e-9);
/// ```
pub fn solve_inverse<F>(target: GeoPoint, settings: &InverseSettings, mut forward: F) -> ShiftResult
where
    F: FnMut(GeoPoint) -> ShiftResult,
{
    let mut guess = GeoPoint::new(target.lng, target.lat, 0.0);
    let mut height_correction = 0.0;
    let mut fallback_used = false;
    let mut residual = (f64::INFINITY, f64::INFINITY);

    for _ in 0..settings.max_iterations {
        let step = forward(guess);
        match step.status {
            ShiftStatus::Fatal => return ShiftResult::fatal(target),
            ShiftStatus::Degraded => return ShiftResult::degraded(target),
            ShiftStatus::FallbackUsed => fallback_used = true,
            ShiftStatus::Success => {}
        }
        height_correction = step.point.hgt;

        residual = (target.lng - step.point.lng, target.lat - step.point.lat);
        let lng_done = residual.0.abs() <= settings.convergence;
        let lat_done = residual.1.abs() <= settings.convergence;
        if !lng_done {
            guess.lng += residual.0;
        }
        if !lat_done {
            guess.lat += residual.1;
        }
        if lng_done && lat_done {
            let point = GeoPoint::new(guess.lng, guess.lat, target.hgt - height_correction);
            let status = if fallback_used {
                ShiftStatus::FallbackUsed
            } else {
                ShiftStatus::Success
            };
            return ShiftResult::new(point, status);
        }
    }

    warn!(
        "inverse did not converge at ({}, {}): residual ({:e}, {:e}) after {} iterations",
        target.lng, target.lat, residual.0, residual.1, settings.max_iterations
    );
    if residual.0.abs() <= settings.error_tolerance && residual.1.abs() <= settings.error_tolerance {
        ShiftResult::degraded(GeoPoint::new(guess.lng, guess.lat, target.hgt - height_correction))
    } else {
        ShiftResult::fatal(target)
    }
}
