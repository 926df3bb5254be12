use std::fmt;

/// An input vector paired with the objective value at that input.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Iterate<F> {
    pub input: Vec<F>,
    pub output: F,
}

impl<F> Iterate<F> {
    pub fn new(input: Vec<F>, output: F) -> Self {
        Iterate { input, output }
    }
}

/// Result of a minimization run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OptimResult<F> {
    /// Solution point.
    pub x: Vec<F>,
    /// Objective value at the solution.
    pub value: F,
    /// Gradient at the solution.
    pub gradient: Vec<F>,
    /// Norm of the gradient at the solution.
    pub gradient_norm: F,
    /// Number of outer iterations performed.
    pub iterations: usize,
    /// Total number of objective evaluations.
    pub func_evals: usize,
    /// Reason for termination.
    pub termination: TerminationReason,
}

impl<F: Clone> OptimResult<F> {
    /// The `(input, output)` pair at the solution.
    pub fn iterate(&self) -> Iterate<F> {
        Iterate::new(self.x.clone(), self.value.clone())
    }
}

/// Why the minimizer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TerminationReason {
    /// Scaled gradient fell below tolerance.
    GradientNorm,
    /// Scaled step fell below the fixed step tolerance.
    StepSize,
    /// Reached the maximum number of iterations.
    MaxIterations,
    /// Line minimizer could not find an acceptable point.
    LineSearchFailed,
    /// Objective produced a non-finite value or gradient at the start.
    NumericalError,
}

impl TerminationReason {
    /// Whether the stopping criterion was met.
    pub fn is_converged(self) -> bool {
        matches!(
            self,
            TerminationReason::GradientNorm | TerminationReason::StepSize
        )
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::GradientNorm => write!(f, "gradient below tolerance"),
            TerminationReason::StepSize => write!(f, "step size below tolerance"),
            TerminationReason::MaxIterations => write!(f, "maximum iterations reached"),
            TerminationReason::LineSearchFailed => write!(f, "line search failed"),
            TerminationReason::NumericalError => write!(f, "numerical error"),
        }
    }
}
