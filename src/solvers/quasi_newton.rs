use log::debug;
use num_traits::Float;

use crate::anytime::{
    is_finite_point, AnytimeMinimizer, AnytimeState, MinimizerSettings, StepStatus,
};
use crate::convergence::check_convergence;
use crate::error::{MinimizeError, Result};
use crate::line_search::{LineMinimizer, LineMinimum, WolfeLineMinimizer, WolfeParams};
use crate::linalg::{dot, negate, norm_squared, sub, Matrix};
use crate::objective::{DirectionalFunction, Objective};
use crate::result::TerminationReason;

/// Default gradient tolerance for the quasi-Newton minimizers.
pub const QUASI_NEWTON_DEFAULT_TOLERANCE: f64 = 1e-7;

/// Strategy for updating the inverse-Hessian estimate after a step.
pub trait HessianUpdate<F: Float> {
    /// Update `h` in place from the step `delta = x_new - x_old` and the
    /// gradient change `gamma = g_new - g_old`.
    ///
    /// Returns `Ok(false)` when the update was skipped and `h` is unchanged.
    fn update(&self, h: &mut Matrix<F>, delta: &[F], gamma: &[F], tolerance: F) -> Result<bool>;
}

fn check_lengths<F: Float>(h: &Matrix<F>, delta: &[F], gamma: &[F]) -> Result<()> {
    let n = h.dim();
    for v in [delta, gamma] {
        if v.len() != n {
            return Err(MinimizeError::DimensionMismatch {
                expected: n,
                found: v.len(),
            });
        }
    }
    Ok(())
}

/// `true` when `delta · gamma` is too small to trust as a curvature estimate:
/// `sqrt(tolerance * |delta|^2 * |gamma|^2) >= |delta · gamma|`.
fn near_singular<F: Float>(delta: &[F], gamma: &[F], delta_t_gamma: F, tolerance: F) -> bool {
    let guard = (tolerance * norm_squared(delta) * norm_squared(gamma)).sqrt();
    !(guard < delta_t_gamma.abs())
}

/// Rank-2 BFGS update of the inverse Hessian (Fletcher, *Practical Methods of
/// Optimization*, eq. 3.2.12).
///
/// Only the lower triangle is computed; every off-diagonal change is written
/// to both halves, so a symmetric `h` stays exactly symmetric. Returns
/// `Ok(false)` without touching `h` when `delta · gamma` is near zero.
pub fn bfgs_update_rule<F: Float>(
    h: &mut Matrix<F>,
    delta: &[F],
    gamma: &[F],
    tolerance: F,
) -> Result<bool> {
    check_lengths(h, delta, gamma)?;

    let h_gamma = h.mul_vec(gamma)?;
    let delta_t_gamma = dot(delta, gamma);
    if near_singular(delta, gamma, delta_t_gamma, tolerance) {
        return Ok(false);
    }

    let term1 = F::one() + dot(gamma, &h_gamma) / delta_t_gamma;
    for i in 0..h.dim() {
        for j in 0..=i {
            let change = (term1 * delta[i] * delta[j]
                - delta[i] * h_gamma[j]
                - h_gamma[i] * delta[j])
                / delta_t_gamma;
            h.set_symmetric(i, j, h.get(i, j) + change);
        }
    }
    Ok(true)
}

/// Davidon-Fletcher-Powell update of the inverse Hessian:
/// `H += delta delta^T / (delta · gamma) - (H gamma)(H gamma)^T / (gamma · H gamma)`.
///
/// Skipped under the same near-singular test as BFGS, and also when
/// `gamma · H gamma` is not positive.
pub fn dfp_update_rule<F: Float>(
    h: &mut Matrix<F>,
    delta: &[F],
    gamma: &[F],
    tolerance: F,
) -> Result<bool> {
    check_lengths(h, delta, gamma)?;

    let h_gamma = h.mul_vec(gamma)?;
    let delta_t_gamma = dot(delta, gamma);
    if near_singular(delta, gamma, delta_t_gamma, tolerance) {
        return Ok(false);
    }
    let gamma_h_gamma = dot(gamma, &h_gamma);
    if !(gamma_h_gamma > F::zero()) {
        return Ok(false);
    }

    for i in 0..h.dim() {
        for j in 0..=i {
            let change = delta[i] * delta[j] / delta_t_gamma
                - h_gamma[i] * h_gamma[j] / gamma_h_gamma;
            h.set_symmetric(i, j, h.get(i, j) + change);
        }
    }
    Ok(true)
}

/// [`bfgs_update_rule`] as a [`HessianUpdate`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BfgsUpdate;

impl<F: Float> HessianUpdate<F> for BfgsUpdate {
    fn update(&self, h: &mut Matrix<F>, delta: &[F], gamma: &[F], tolerance: F) -> Result<bool> {
        bfgs_update_rule(h, delta, gamma, tolerance)
    }
}

/// [`dfp_update_rule`] as a [`HessianUpdate`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DfpUpdate;

impl<F: Float> HessianUpdate<F> for DfpUpdate {
    fn update(&self, h: &mut Matrix<F>, delta: &[F], gamma: &[F], tolerance: F) -> Result<bool> {
        dfp_update_rule(h, delta, gamma, tolerance)
    }
}

/// Quasi-Newton minimizer keeping an explicit inverse-Hessian estimate.
///
/// Each step searches along `-H g`, then updates `H` with the configured
/// [`HessianUpdate`]. The estimate starts at the identity unless one is
/// supplied with [`with_hessian_inverse`](Self::with_hessian_inverse).
pub struct QuasiNewton<F, U, L> {
    state: AnytimeState<F>,
    update: U,
    line_minimizer: L,
    initial_hessian_inverse: Option<Matrix<F>>,
    hessian_inverse: Matrix<F>,
    skipped_updates: usize,
    resets: usize,
}

/// BFGS with the strong-Wolfe line minimizer.
pub type BfgsMinimizer<F> = QuasiNewton<F, BfgsUpdate, WolfeLineMinimizer<F>>;

/// DFP with the strong-Wolfe line minimizer.
pub type DfpMinimizer<F> = QuasiNewton<F, DfpUpdate, WolfeLineMinimizer<F>>;

impl<F: Float, U: HessianUpdate<F>, L: LineMinimizer<F>> QuasiNewton<F, U, L> {
    pub fn new(update: U, line_minimizer: L, settings: MinimizerSettings<F>) -> Self {
        QuasiNewton {
            state: AnytimeState::new(settings),
            update,
            line_minimizer,
            initial_hessian_inverse: None,
            hessian_inverse: Matrix::identity(0),
            skipped_updates: 0,
            resets: 0,
        }
    }

    /// Start every run from `h` instead of the identity.
    ///
    /// `h` must be symmetric; its size is checked against the objective when
    /// a run starts.
    pub fn with_hessian_inverse(mut self, h: Matrix<F>) -> Result<Self> {
        if let Some((row, col)) = h.first_asymmetry() {
            return Err(MinimizeError::AsymmetricMatrix { row, col });
        }
        self.initial_hessian_inverse = Some(h);
        Ok(self)
    }

    /// Current inverse-Hessian estimate.
    pub fn hessian_inverse(&self) -> &Matrix<F> {
        &self.hessian_inverse
    }

    /// Updates skipped as near-singular in the current run.
    pub fn skipped_updates(&self) -> usize {
        self.skipped_updates
    }

    /// Times the estimate was reset to the identity because `-H g` was not
    /// a descent direction.
    pub fn resets(&self) -> usize {
        self.resets
    }

    pub fn line_minimizer(&self) -> &L {
        &self.line_minimizer
    }
}

impl<F: Float> BfgsMinimizer<F>
where
    WolfeParams<F>: Default,
{
    /// BFGS with default tolerance, budget and line search.
    pub fn bfgs() -> Self {
        QuasiNewton::new(
            BfgsUpdate,
            WolfeLineMinimizer::default(),
            MinimizerSettings::defaults(QUASI_NEWTON_DEFAULT_TOLERANCE),
        )
    }
}

impl<F: Float> DfpMinimizer<F>
where
    WolfeParams<F>: Default,
{
    /// DFP with default tolerance, budget and line search.
    pub fn dfp() -> Self {
        QuasiNewton::new(
            DfpUpdate,
            WolfeLineMinimizer::default(),
            MinimizerSettings::defaults(QUASI_NEWTON_DEFAULT_TOLERANCE),
        )
    }
}

impl<F: Float, U: HessianUpdate<F>, L: LineMinimizer<F>> AnytimeMinimizer<F>
    for QuasiNewton<F, U, L>
{
    fn state(&self) -> &AnytimeState<F> {
        &self.state
    }

    fn state_mut(&mut self) -> &mut AnytimeState<F> {
        &mut self.state
    }

    fn start<O: Objective<F>>(&mut self, obj: &mut O) -> Result<StepStatus> {
        let n = obj.dim();
        self.hessian_inverse = match &self.initial_hessian_inverse {
            Some(h) if h.dim() != n => {
                return Err(MinimizeError::DimensionMismatch {
                    expected: n,
                    found: h.dim(),
                })
            }
            Some(h) => h.clone(),
            None => Matrix::identity(n),
        };
        self.skipped_updates = 0;
        self.resets = 0;
        self.state.begin(obj)
    }

    fn advance<O: Objective<F>>(&mut self, obj: &mut O) -> Result<StepStatus> {
        let tolerance = self.state.settings().tolerance();
        let (x, value) = match self.state.best() {
            Some(best) => (best.input.clone(), best.output),
            None => return Err(MinimizeError::NotInitialized),
        };
        let gradient = self.state.gradient().to_vec();

        let mut direction = negate(&self.hessian_inverse.mul_vec(&gradient)?);
        if !(dot(&gradient, &direction) < F::zero()) {
            debug!("quasi-newton: -H g is not a descent direction, resetting H");
            self.hessian_inverse = Matrix::identity(x.len());
            self.resets += 1;
            direction = negate(&gradient);
        }

        let minimum = {
            let mut line = DirectionalFunction::new(obj, &x, &direction);
            self.line_minimizer.minimize_along(&mut line, value, &gradient)
        };
        let LineMinimum {
            input: x_new,
            output: value_new,
            evals,
            last_gradient,
            ..
        } = match minimum {
            Some(m) => m,
            None => return Ok(StepStatus::Finished(TerminationReason::LineSearchFailed)),
        };

        let (gradient_new, extra) = match last_gradient.and_then(|c| c.take_if_at(&x_new)) {
            Some(g) => (g, 0),
            None => (obj.differentiate(&x_new), 1),
        };
        if gradient_new.len() != x_new.len() {
            return Err(MinimizeError::DimensionMismatch {
                expected: x_new.len(),
                found: gradient_new.len(),
            });
        }
        if !is_finite_point(value_new, &gradient_new) {
            debug!("quasi-newton: non-finite value or gradient at the new point");
            self.state.count_evals(evals + extra);
            return Ok(StepStatus::Finished(TerminationReason::NumericalError));
        }

        let delta = sub(&x_new, &x);
        let gamma = sub(&gradient_new, &gradient);
        if !self
            .update
            .update(&mut self.hessian_inverse, &delta, &gamma, tolerance)?
        {
            self.skipped_updates += 1;
            debug!("quasi-newton: near-singular update skipped");
        }

        let reason = check_convergence(&x_new, Some(value_new), &gradient_new, &delta, tolerance);
        self.state.accept(x_new, value_new, gradient_new, evals + extra);

        Ok(match reason {
            Some(reason) => StepStatus::Finished(reason),
            None => StepStatus::Continue,
        })
    }
}
