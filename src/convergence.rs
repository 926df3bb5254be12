//! Scale-invariant stopping criterion shared by every minimizer.
//!
//! Both the step and the gradient are measured relative to the magnitude of
//! the current coordinate, `max(|x_i|, 1)`, so variables with large absolute
//! values neither stop early nor run long.

use num_traits::Float;

use crate::result::TerminationReason;

/// Relative step below which a run is considered converged.
pub const TOLERANCE_DELTA_X: f64 = 1e-7;

fn delta_tolerance<F: Float>() -> F {
    F::from(TOLERANCE_DELTA_X).unwrap_or_else(F::epsilon)
}

/// `max` that returns NaN if either side is NaN, unlike [`Float::max`].
fn nan_max<F: Float>(a: F, b: F) -> F {
    if a.is_nan() || b.is_nan() {
        F::nan()
    } else {
        a.max(b)
    }
}

/// Largest `|gradient_i| * max(|x_i|, 1) / max(f, 1)` over all coordinates.
///
/// Without a function value the denominator is 1. Any NaN input makes the
/// result NaN, which never passes a tolerance test.
pub fn relative_gradient<F: Float>(x: &[F], f: Option<F>, gradient: &[F]) -> F {
    debug_assert_eq!(x.len(), gradient.len());
    let denom = f.map_or(F::one(), |v| nan_max(v, F::one()));
    let mut largest = F::zero();
    for (&xi, &gi) in x.iter().zip(gradient) {
        let normalized = nan_max(xi.abs(), F::one());
        largest = nan_max(largest, gi.abs() * normalized / denom);
    }
    largest
}

/// Largest `|delta_i| / max(|x_i|, 1)` over all coordinates; NaN if any
/// input is NaN.
pub fn relative_step<F: Float>(x: &[F], delta: &[F]) -> F {
    debug_assert_eq!(x.len(), delta.len());
    let mut largest = F::zero();
    for (&xi, &di) in x.iter().zip(delta) {
        let normalized = nan_max(xi.abs(), F::one());
        largest = nan_max(largest, di.abs() / normalized);
    }
    largest
}

/// Which half of the criterion fired, if any.
///
/// The gradient test takes precedence when both pass.
pub fn check_convergence<F: Float>(
    x: &[F],
    f: Option<F>,
    gradient: &[F],
    delta: &[F],
    tolerance: F,
) -> Option<TerminationReason> {
    if relative_gradient(x, f, gradient) < tolerance {
        Some(TerminationReason::GradientNorm)
    } else if relative_step(x, delta) < delta_tolerance() {
        Some(TerminationReason::StepSize)
    } else {
        None
    }
}

/// `true` when the relative step is below [`TOLERANCE_DELTA_X`] or the
/// relative gradient is below `tolerance`.
pub fn convergence<F: Float>(
    x: &[F],
    f: Option<F>,
    gradient: &[F],
    delta: &[F],
    tolerance: F,
) -> bool {
    check_convergence(x, f, gradient, delta, tolerance).is_some()
}

/// Gradient half of the criterion alone, used before any step exists.
pub fn gradient_converged<F: Float>(x: &[F], f: Option<F>, gradient: &[F], tolerance: F) -> bool {
    relative_gradient(x, f, gradient) < tolerance
}
