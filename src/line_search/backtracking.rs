use log::trace;
use num_traits::Float;

use super::{LineMinimizer, LineMinimum};
use crate::error::{MinimizeError, Result};
use crate::objective::{DirectionalFunction, Objective};

/// Parameters for the backtracking Armijo line search.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArmijoParams<F> {
    /// Sufficient decrease parameter (default: 1e-4).
    pub c: F,
    /// Backtracking factor (default: 0.5).
    pub rho: F,
    /// Initial step size (default: 1.0).
    pub alpha_init: F,
    /// Minimum step size before declaring failure (default: 1e-16).
    pub alpha_min: F,
}

impl Default for ArmijoParams<f64> {
    fn default() -> Self {
        ArmijoParams {
            c: 1e-4,
            rho: 0.5,
            alpha_init: 1.0,
            alpha_min: 1e-16,
        }
    }
}

impl Default for ArmijoParams<f32> {
    fn default() -> Self {
        ArmijoParams {
            c: 1e-4,
            rho: 0.5,
            alpha_init: 1.0,
            alpha_min: 1e-8,
        }
    }
}

impl<F: Float> ArmijoParams<F> {
    /// Check `0 < c < 1`, `0 < rho < 1`, `alpha_init > 0`, `alpha_min >= 0`.
    pub fn validate(&self) -> Result<()> {
        let unit = |v: F| v > F::zero() && v < F::one();
        if !unit(self.c) {
            return Err(MinimizeError::InvalidLineSearch {
                name: "c",
                reason: "must lie in (0, 1)",
            });
        }
        if !unit(self.rho) {
            return Err(MinimizeError::InvalidLineSearch {
                name: "rho",
                reason: "must lie in (0, 1)",
            });
        }
        if !(self.alpha_init > F::zero()) {
            return Err(MinimizeError::InvalidLineSearch {
                name: "alpha_init",
                reason: "must be positive",
            });
        }
        if !(self.alpha_min >= F::zero()) {
            return Err(MinimizeError::InvalidLineSearch {
                name: "alpha_min",
                reason: "must be non-negative",
            });
        }
        Ok(())
    }
}

/// Derivative-free backtracking line search on the Armijo condition.
///
/// Searches for `alpha` such that `f(x + alpha*d) <= f(x) + c * alpha * g^T d`
/// using function values only, so it never reports a cached gradient.
#[derive(Debug, Clone)]
pub struct BacktrackingLineMinimizer<F> {
    params: ArmijoParams<F>,
}

impl<F: Float> BacktrackingLineMinimizer<F> {
    pub fn new(params: ArmijoParams<F>) -> Result<Self> {
        params.validate()?;
        Ok(BacktrackingLineMinimizer { params })
    }

    pub fn params(&self) -> &ArmijoParams<F> {
        &self.params
    }
}

impl<F: Float> Default for BacktrackingLineMinimizer<F>
where
    ArmijoParams<F>: Default,
{
    fn default() -> Self {
        BacktrackingLineMinimizer {
            params: ArmijoParams::default(),
        }
    }
}

impl<F: Float> LineMinimizer<F> for BacktrackingLineMinimizer<F> {
    fn minimize_along<O: Objective<F>>(
        &mut self,
        line: &mut DirectionalFunction<'_, F, O>,
        value: F,
        gradient: &[F],
    ) -> Option<LineMinimum<F>> {
        let dg = line.initial_slope(gradient);

        // Not a descent direction; caller should handle this
        if !(dg < F::zero()) {
            return None;
        }

        let p = &self.params;
        let mut alpha = p.alpha_init;
        loop {
            if alpha < p.alpha_min {
                trace!("armijo: step fell below alpha_min");
                return None;
            }

            let (x_new, f_new) = line.value(alpha);

            if f_new <= value + p.c * alpha * dg {
                return Some(LineMinimum {
                    input: x_new,
                    output: f_new,
                    step: alpha,
                    evals: line.evals(),
                    last_gradient: None,
                });
            }

            alpha = alpha * p.rho;
        }
    }
}
