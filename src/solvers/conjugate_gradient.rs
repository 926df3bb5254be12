use log::debug;
use num_traits::Float;

use crate::anytime::{
    is_finite_point, AnytimeMinimizer, AnytimeState, MinimizerSettings, StepStatus,
};
use crate::convergence::check_convergence;
use crate::error::{MinimizeError, Result};
use crate::line_search::{LineMinimizer, LineMinimum, WolfeLineMinimizer, WolfeParams};
use crate::linalg::{dot, negate, norm_squared, sub};
use crate::objective::{DirectionalFunction, Objective};
use crate::result::TerminationReason;

/// Default gradient tolerance for the conjugate gradient minimizers.
pub const CONJUGATE_GRADIENT_DEFAULT_TOLERANCE: f64 = 1e-5;

/// Formula for the coefficient `beta` in `d_new = beta * d_old - g_new`.
pub trait ScaleFactor<F: Float> {
    fn scale_factor(&self, gradient: &[F], gradient_old: &[F], direction_old: &[F]) -> F;
}

/// Liu-Storey: `beta = -((g - g_old) · g) / (g_old · d_old)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiuStorey;

impl<F: Float> ScaleFactor<F> for LiuStorey {
    fn scale_factor(&self, gradient: &[F], gradient_old: &[F], direction_old: &[F]) -> F {
        let delta_gradient = sub(gradient, gradient_old);
        F::zero() - dot(&delta_gradient, gradient) / dot(gradient_old, direction_old)
    }
}

/// Polak-Ribiere: `beta = ((g - g_old) · g) / |g_old|^2`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolakRibiere;

impl<F: Float> ScaleFactor<F> for PolakRibiere {
    fn scale_factor(&self, gradient: &[F], gradient_old: &[F], _direction_old: &[F]) -> F {
        let delta_gradient = sub(gradient, gradient_old);
        dot(&delta_gradient, gradient) / norm_squared(gradient_old)
    }
}

/// Fletcher-Reeves: `beta = |g|^2 / |g_old|^2`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FletcherReeves;

impl<F: Float> ScaleFactor<F> for FletcherReeves {
    fn scale_factor(&self, gradient: &[F], gradient_old: &[F], _direction_old: &[F]) -> F {
        norm_squared(gradient) / norm_squared(gradient_old)
    }
}

/// Nonlinear conjugate gradient with a pluggable [`ScaleFactor`].
///
/// The search restarts along steepest descent every `2 * n` iterations, and
/// whenever `beta` comes out non-finite.
pub struct ConjugateGradient<F, S, L> {
    state: AnytimeState<F>,
    scale_factor: S,
    line_minimizer: L,
    direction: Vec<F>,
    last_beta: Option<F>,
    restarts: usize,
}

/// Liu-Storey CG with the strong-Wolfe line minimizer.
pub type LiuStoreyMinimizer<F> = ConjugateGradient<F, LiuStorey, WolfeLineMinimizer<F>>;

/// Polak-Ribiere CG with the strong-Wolfe line minimizer.
pub type PolakRibiereMinimizer<F> = ConjugateGradient<F, PolakRibiere, WolfeLineMinimizer<F>>;

/// Fletcher-Reeves CG with the strong-Wolfe line minimizer.
pub type FletcherReevesMinimizer<F> =
    ConjugateGradient<F, FletcherReeves, WolfeLineMinimizer<F>>;

impl<F: Float, S: ScaleFactor<F>, L: LineMinimizer<F>> ConjugateGradient<F, S, L> {
    pub fn new(scale_factor: S, line_minimizer: L, settings: MinimizerSettings<F>) -> Self {
        ConjugateGradient {
            state: AnytimeState::new(settings),
            scale_factor,
            line_minimizer,
            direction: Vec::new(),
            last_beta: None,
            restarts: 0,
        }
    }

    /// Search direction for the next step.
    pub fn direction(&self) -> &[F] {
        &self.direction
    }

    /// `beta` used to build the current direction; `None` before the first step.
    pub fn last_beta(&self) -> Option<F> {
        self.last_beta
    }

    /// Steepest-descent restarts taken in the current run.
    pub fn restarts(&self) -> usize {
        self.restarts
    }

    /// Iterations between forced restarts for an `n`-dimensional problem.
    pub fn restart_period(n: usize) -> usize {
        2 * n
    }

    pub fn line_minimizer(&self) -> &L {
        &self.line_minimizer
    }
}

impl<F: Float> ConjugateGradient<F, LiuStorey, WolfeLineMinimizer<F>>
where
    WolfeParams<F>: Default,
{
    /// Liu-Storey CG with default tolerance, budget and line search.
    pub fn liu_storey() -> Self {
        ConjugateGradient::new(
            LiuStorey,
            WolfeLineMinimizer::default(),
            MinimizerSettings::defaults(CONJUGATE_GRADIENT_DEFAULT_TOLERANCE),
        )
    }
}

impl<F: Float> ConjugateGradient<F, PolakRibiere, WolfeLineMinimizer<F>>
where
    WolfeParams<F>: Default,
{
    /// Polak-Ribiere CG with default tolerance, budget and line search.
    pub fn polak_ribiere() -> Self {
        ConjugateGradient::new(
            PolakRibiere,
            WolfeLineMinimizer::default(),
            MinimizerSettings::defaults(CONJUGATE_GRADIENT_DEFAULT_TOLERANCE),
        )
    }
}

impl<F: Float> ConjugateGradient<F, FletcherReeves, WolfeLineMinimizer<F>>
where
    WolfeParams<F>: Default,
{
    /// Fletcher-Reeves CG with default tolerance, budget and line search.
    pub fn fletcher_reeves() -> Self {
        ConjugateGradient::new(
            FletcherReeves,
            WolfeLineMinimizer::default(),
            MinimizerSettings::defaults(CONJUGATE_GRADIENT_DEFAULT_TOLERANCE),
        )
    }
}

impl<F: Float, S: ScaleFactor<F>, L: LineMinimizer<F>> AnytimeMinimizer<F>
    for ConjugateGradient<F, S, L>
{
    fn state(&self) -> &AnytimeState<F> {
        &self.state
    }

    fn state_mut(&mut self) -> &mut AnytimeState<F> {
        &mut self.state
    }

    fn start<O: Objective<F>>(&mut self, obj: &mut O) -> Result<StepStatus> {
        let status = self.state.begin(obj)?;
        self.direction = negate(self.state.gradient());
        self.last_beta = None;
        self.restarts = 0;
        Ok(status)
    }

    fn advance<O: Objective<F>>(&mut self, obj: &mut O) -> Result<StepStatus> {
        let tolerance = self.state.settings().tolerance();
        let (x_old, value) = match self.state.best() {
            Some(best) => (best.input.clone(), best.output),
            None => return Err(MinimizeError::NotInitialized),
        };
        let gradient_old = self.state.gradient().to_vec();

        if !(dot(&gradient_old, &self.direction) < F::zero()) {
            debug!("conjugate gradient: direction lost descent, restarting");
            self.direction = negate(&gradient_old);
            self.restarts += 1;
        }

        let minimum = {
            let mut line = DirectionalFunction::new(obj, &x_old, &self.direction);
            self.line_minimizer
                .minimize_along(&mut line, value, &gradient_old)
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

        // Reuse the line minimizer's gradient only if it was taken at x_new.
        let (gradient, extra) = match last_gradient.and_then(|c| c.take_if_at(&x_new)) {
            Some(g) => (g, 0),
            None => (obj.differentiate(&x_new), 1),
        };
        if gradient.len() != x_new.len() {
            return Err(MinimizeError::DimensionMismatch {
                expected: x_new.len(),
                found: gradient.len(),
            });
        }
        if !is_finite_point(value_new, &gradient) {
            debug!("conjugate gradient: non-finite value or gradient at the new point");
            self.state.count_evals(evals + extra);
            return Ok(StepStatus::Finished(TerminationReason::NumericalError));
        }

        let delta = sub(&x_new, &x_old);
        let reason = check_convergence(&x_new, Some(value_new), &gradient, &delta, tolerance);
        if let Some(reason) = reason {
            self.state.accept(x_new, value_new, gradient, evals + extra);
            return Ok(StepStatus::Finished(reason));
        }

        let period = Self::restart_period(x_new.len());
        let beta = if (self.state.iteration() + 1) % period == 0 {
            self.restarts += 1;
            F::zero()
        } else {
            let beta = self
                .scale_factor
                .scale_factor(&gradient, &gradient_old, &self.direction);
            if beta.is_finite() {
                beta
            } else {
                debug!("conjugate gradient: non-finite beta, restarting");
                self.restarts += 1;
                F::zero()
            }
        };

        for (d, &g) in self.direction.iter_mut().zip(&gradient) {
            *d = *d * beta - g;
        }
        self.last_beta = Some(beta);
        self.state.accept(x_new, value_new, gradient, evals + extra);

        Ok(StepStatus::Continue)
    }
}
