//! Shared iterate/converge loop for every minimizer.
//!
//! A minimizer implements [`AnytimeMinimizer::start`] (set up a run) and
//! [`AnytimeMinimizer::advance`] (one outer iteration). The provided methods
//! own the iteration counter and budget, so a caller can either call
//! [`learn`](AnytimeMinimizer::learn) or drive [`step`](AnytimeMinimizer::step)
//! by hand and poll [`current_best`](AnytimeMinimizer::current_best) in between.

use log::debug;
use num_traits::Float;

use crate::convergence::gradient_converged;
use crate::error::{MinimizeError, Result};
use crate::linalg::norm;
use crate::objective::Objective;
use crate::result::{Iterate, OptimResult, TerminationReason};

/// Default iteration budget.
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

/// `true` when the value and every gradient component are finite.
pub(crate) fn is_finite_point<F: Float>(value: F, gradient: &[F]) -> bool {
    value.is_finite() && gradient.iter().all(|g| g.is_finite())
}

/// Validated configuration common to all minimizers.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(
        try_from = "RawSettings<F>",
        bound(deserialize = "F: Float + serde::Deserialize<'de>")
    )
)]
pub struct MinimizerSettings<F> {
    initial_guess: Option<Vec<F>>,
    tolerance: F,
    max_iterations: usize,
}

impl<F: Float> MinimizerSettings<F> {
    pub fn new(tolerance: F, max_iterations: usize) -> Result<Self> {
        let mut settings = MinimizerSettings {
            initial_guess: None,
            tolerance: F::zero(),
            max_iterations: 1,
        };
        settings.set_tolerance(tolerance)?;
        settings.set_max_iterations(max_iterations)?;
        Ok(settings)
    }

    /// Settings built from constants known to be valid.
    pub(crate) fn defaults(tolerance: f64) -> Self {
        MinimizerSettings {
            initial_guess: None,
            tolerance: F::from(tolerance).unwrap_or_else(F::epsilon),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Builder form of [`set_initial_guess`](Self::set_initial_guess).
    pub fn with_initial_guess(mut self, guess: Vec<F>) -> Self {
        self.initial_guess = Some(guess);
        self
    }

    pub fn tolerance(&self) -> F {
        self.tolerance
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn initial_guess(&self) -> Option<&[F]> {
        self.initial_guess.as_deref()
    }

    /// Rejects negative or NaN tolerances.
    pub fn set_tolerance(&mut self, tolerance: F) -> Result<()> {
        if !(tolerance >= F::zero()) {
            return Err(MinimizeError::InvalidTolerance {
                tolerance: tolerance.to_f64().unwrap_or(f64::NAN),
            });
        }
        self.tolerance = tolerance;
        Ok(())
    }

    /// Rejects a zero budget.
    pub fn set_max_iterations(&mut self, max_iterations: usize) -> Result<()> {
        if max_iterations == 0 {
            return Err(MinimizeError::InvalidMaxIterations { max_iterations });
        }
        self.max_iterations = max_iterations;
        Ok(())
    }

    /// Starting point for the next run. `None` starts from the origin.
    pub fn set_initial_guess(&mut self, guess: Option<Vec<F>>) {
        self.initial_guess = guess;
    }

    /// The starting point for an objective of dimension `dim`.
    pub(crate) fn starting_point(&self, dim: usize) -> Result<Vec<F>> {
        if dim == 0 {
            return Err(MinimizeError::EmptyProblem);
        }
        match &self.initial_guess {
            Some(guess) if guess.len() != dim => Err(MinimizeError::DimensionMismatch {
                expected: dim,
                found: guess.len(),
            }),
            Some(guess) => Ok(guess.clone()),
            None => Ok(vec![F::zero(); dim]),
        }
    }
}

/// Unchecked wire form of [`MinimizerSettings`]; deserialization goes
/// through the same validation as [`MinimizerSettings::new`].
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawSettings<F> {
    initial_guess: Option<Vec<F>>,
    tolerance: F,
    max_iterations: usize,
}

#[cfg(feature = "serde")]
impl<F: Float> TryFrom<RawSettings<F>> for MinimizerSettings<F> {
    type Error = MinimizeError;

    fn try_from(raw: RawSettings<F>) -> Result<Self> {
        let mut settings = MinimizerSettings::new(raw.tolerance, raw.max_iterations)?;
        settings.set_initial_guess(raw.initial_guess);
        Ok(settings)
    }
}

/// Outcome of a single outer iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// More iterations are wanted.
    Continue,
    /// The run is over.
    Finished(TerminationReason),
}

/// Settings plus the per-run state every minimizer carries.
#[derive(Debug, Clone)]
pub struct AnytimeState<F> {
    settings: MinimizerSettings<F>,
    iteration: usize,
    best: Option<Iterate<F>>,
    gradient: Vec<F>,
    func_evals: usize,
    termination: Option<TerminationReason>,
}

impl<F: Float> AnytimeState<F> {
    pub fn new(settings: MinimizerSettings<F>) -> Self {
        AnytimeState {
            settings,
            iteration: 0,
            best: None,
            gradient: Vec::new(),
            func_evals: 0,
            termination: None,
        }
    }

    pub fn settings(&self) -> &MinimizerSettings<F> {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut MinimizerSettings<F> {
        &mut self.settings
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Current iterate, once a run has started.
    pub fn best(&self) -> Option<&Iterate<F>> {
        self.best.as_ref()
    }

    /// Gradient at the current iterate.
    pub fn gradient(&self) -> &[F] {
        &self.gradient
    }

    pub fn func_evals(&self) -> usize {
        self.func_evals
    }

    pub fn termination(&self) -> Option<TerminationReason> {
        self.termination
    }

    /// Begin a fresh run: evaluate the objective at the starting point and
    /// check whether it is already a minimum. The starting point is then
    /// available through [`best`](Self::best).
    pub(crate) fn begin<O: Objective<F>>(&mut self, obj: &mut O) -> Result<StepStatus> {
        let x0 = self.settings.starting_point(obj.dim())?;
        let (value, gradient) = obj.eval_grad(&x0);
        if gradient.len() != x0.len() {
            return Err(MinimizeError::DimensionMismatch {
                expected: x0.len(),
                found: gradient.len(),
            });
        }

        self.iteration = 0;
        self.func_evals = 1;
        self.termination = None;

        let finite = is_finite_point(value, &gradient);
        let at_minimum =
            finite && gradient_converged(&x0, Some(value), &gradient, self.settings.tolerance);

        self.best = Some(Iterate::new(x0, value));
        self.gradient = gradient;

        if !finite {
            return Ok(self.finish(TerminationReason::NumericalError));
        }
        if at_minimum {
            return Ok(self.finish(TerminationReason::GradientNorm));
        }
        Ok(StepStatus::Continue)
    }

    /// Replace the current iterate and gradient after a step.
    pub(crate) fn accept(&mut self, x: Vec<F>, value: F, gradient: Vec<F>, evals: usize) {
        self.best = Some(Iterate::new(x, value));
        self.gradient = gradient;
        self.func_evals += evals;
    }

    /// Count evaluations spent on a step whose point was rejected.
    pub(crate) fn count_evals(&mut self, evals: usize) {
        self.func_evals += evals;
    }

    pub(crate) fn finish(&mut self, reason: TerminationReason) -> StepStatus {
        self.termination = Some(reason);
        StepStatus::Finished(reason)
    }

    /// Snapshot of the run as an [`OptimResult`].
    ///
    /// While a run is still going the termination reads `MaxIterations`.
    pub fn result(&self) -> Option<OptimResult<F>> {
        let best = self.best.as_ref()?;
        Some(OptimResult {
            x: best.input.clone(),
            value: best.output,
            gradient: self.gradient.clone(),
            gradient_norm: norm(&self.gradient),
            iterations: self.iteration,
            func_evals: self.func_evals,
            termination: self.termination.unwrap_or(TerminationReason::MaxIterations),
        })
    }
}

/// An iterative minimizer with anytime semantics.
pub trait AnytimeMinimizer<F: Float> {
    fn state(&self) -> &AnytimeState<F>;

    fn state_mut(&mut self) -> &mut AnytimeState<F>;

    /// Reset all per-run state and evaluate the starting point.
    fn start<O: Objective<F>>(&mut self, obj: &mut O) -> Result<StepStatus>;

    /// Perform one outer iteration.
    fn advance<O: Objective<F>>(&mut self, obj: &mut O) -> Result<StepStatus>;

    /// Begin a run. Call before driving [`step`](Self::step) by hand.
    fn initialize<O: Objective<F>>(&mut self, obj: &mut O) -> Result<StepStatus> {
        self.start(obj)
    }

    /// Perform one iteration, counting it against the budget.
    ///
    /// A step that ends in `LineSearchFailed` or `NumericalError` is not a
    /// completed step, so it does not advance [`iteration`](Self::iteration).
    ///
    /// Once the run has terminated (or the budget is spent) this returns the
    /// final status without touching the objective.
    fn step<O: Objective<F>>(&mut self, obj: &mut O) -> Result<StepStatus> {
        if self.state().best().is_none() {
            return Err(MinimizeError::NotInitialized);
        }
        if let Some(reason) = self.state().termination() {
            return Ok(StepStatus::Finished(reason));
        }
        if self.state().iteration() >= self.state().settings().max_iterations() {
            return Ok(self.state_mut().finish(TerminationReason::MaxIterations));
        }

        let status = self.advance(obj)?;
        let state = self.state_mut();
        // Rejected steps leave the iterate where it was and do not count.
        let rejected = matches!(
            status,
            StepStatus::Finished(
                TerminationReason::LineSearchFailed | TerminationReason::NumericalError
            )
        );
        if !rejected {
            state.iteration += 1;
        }
        if let Some(best) = state.best() {
            debug!(
                "iteration {}: f = {:?}",
                state.iteration,
                best.output.to_f64()
            );
        }
        match status {
            StepStatus::Finished(reason) => Ok(state.finish(reason)),
            StepStatus::Continue if state.iteration >= state.settings.max_iterations => {
                Ok(state.finish(TerminationReason::MaxIterations))
            }
            StepStatus::Continue => Ok(StepStatus::Continue),
        }
    }

    /// Minimize `obj` from the configured initial guess until convergence or
    /// the iteration budget runs out.
    fn learn<O: Objective<F>>(&mut self, obj: &mut O) -> Result<OptimResult<F>> {
        let mut status = self.initialize(obj)?;
        while status == StepStatus::Continue {
            status = self.step(obj)?;
        }
        self.result().ok_or(MinimizeError::NotInitialized)
    }

    /// Completed iterations in the current run.
    fn iteration(&self) -> usize {
        self.state().iteration()
    }

    /// Best iterate so far; available mid-run.
    fn current_best(&self) -> Option<&Iterate<F>> {
        self.state().best()
    }

    /// Snapshot of the current run.
    fn result(&self) -> Option<OptimResult<F>> {
        self.state().result()
    }

    fn settings(&self) -> &MinimizerSettings<F> {
        self.state().settings()
    }

    fn set_tolerance(&mut self, tolerance: F) -> Result<()> {
        self.state_mut().settings_mut().set_tolerance(tolerance)
    }

    fn set_max_iterations(&mut self, max_iterations: usize) -> Result<()> {
        self.state_mut().settings_mut().set_max_iterations(max_iterations)
    }

    fn set_initial_guess(&mut self, guess: Option<Vec<F>>) {
        self.state_mut().settings_mut().set_initial_guess(guess)
    }
}
