//! One-dimensional minimization along a search direction.
//!
//! Outer algorithms hand a [`DirectionalFunction`] plus the value and gradient
//! at its offset to a [`LineMinimizer`], and get back a new point. A line
//! minimizer that already evaluated the gradient at that point returns it in
//! [`LineMinimum::last_gradient`] so the caller can skip a re-evaluation.

mod backtracking;
mod wolfe;

use num_traits::Float;

pub use backtracking::{ArmijoParams, BacktrackingLineMinimizer};
pub use wolfe::{WolfeLineMinimizer, WolfeParams};

use crate::objective::{DirectionalFunction, Objective};

/// Gradient evaluated by the line minimizer, keyed by the input it was taken at.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedGradient<F> {
    pub input: Vec<F>,
    pub gradient: Vec<F>,
}

impl<F: Float> CachedGradient<F> {
    /// The cached gradient, if it was taken at exactly `x`.
    pub fn take_if_at(self, x: &[F]) -> Option<Vec<F>> {
        if self.input.as_slice() == x {
            Some(self.gradient)
        } else {
            None
        }
    }
}

/// Accepted point of a line search.
#[derive(Debug, Clone)]
pub struct LineMinimum<F> {
    /// Accepted point `offset + step * direction`.
    pub input: Vec<F>,
    /// Objective value at `input`.
    pub output: F,
    /// Accepted step along the direction.
    pub step: F,
    /// Objective evaluations spent.
    pub evals: usize,
    /// Gradient at the last point the search differentiated, if any.
    pub last_gradient: Option<CachedGradient<F>>,
}

/// Minimizes an objective approximately along a ray.
pub trait LineMinimizer<F: Float> {
    /// Search along `line` starting from `t = 0`, where the objective has
    /// `value` and `gradient`.
    ///
    /// Returns `None` when the direction is not a descent direction or no
    /// point with sufficient decrease was found.
    fn minimize_along<O: Objective<F>>(
        &mut self,
        line: &mut DirectionalFunction<'_, F, O>,
        value: F,
        gradient: &[F],
    ) -> Option<LineMinimum<F>>;
}
