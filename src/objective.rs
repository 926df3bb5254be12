use num_traits::Float;

use crate::linalg::{axpy, dot};

/// Trait for minimization objectives.
///
/// Implementors provide function evaluation and gradient computation.
/// Methods take `&mut self` to allow caching, eval counting, and internal buffers.
pub trait Objective<F: Float> {
    /// Number of input variables.
    fn dim(&self) -> usize;

    /// Evaluate the objective and its gradient at `x`.
    ///
    /// Returns `(f(x), ∇f(x))`.
    fn eval_grad(&mut self, x: &[F]) -> (F, Vec<F>);

    /// Evaluate `f(x)` alone.
    ///
    /// Defaults to discarding the gradient from [`eval_grad`](Self::eval_grad);
    /// override when the value is cheaper on its own.
    fn evaluate(&mut self, x: &[F]) -> F {
        self.eval_grad(x).0
    }

    /// Evaluate `∇f(x)` alone.
    fn differentiate(&mut self, x: &[F]) -> Vec<F> {
        self.eval_grad(x).1
    }
}

/// Adapter wrapping a closure `x -> (f(x), ∇f(x))` as an [`Objective`].
pub struct FnObjective<G> {
    dim: usize,
    func: G,
    func_evals: usize,
}

impl<G> FnObjective<G> {
    /// Wrap `func`, which takes inputs of length `dim`.
    pub fn new(dim: usize, func: G) -> Self {
        FnObjective {
            dim,
            func,
            func_evals: 0,
        }
    }

    /// Number of evaluations performed so far.
    pub fn func_evals(&self) -> usize {
        self.func_evals
    }
}

impl<F, G> Objective<F> for FnObjective<G>
where
    F: Float,
    G: FnMut(&[F]) -> (F, Vec<F>),
{
    fn dim(&self) -> usize {
        self.dim
    }

    fn eval_grad(&mut self, x: &[F]) -> (F, Vec<F>) {
        self.func_evals += 1;
        (self.func)(x)
    }
}

/// One sample of a [`DirectionalFunction`].
#[derive(Debug, Clone)]
pub struct LineSample<F> {
    /// Step along the direction.
    pub t: F,
    /// `offset + t * direction`.
    pub x: Vec<F>,
    /// `f(x)`.
    pub value: F,
    /// `∇f(x)`.
    pub gradient: Vec<F>,
    /// `∇f(x) · direction`, the derivative of `phi` at `t`.
    pub slope: F,
}

/// The restriction `phi(t) = f(offset + t * direction)` of an objective to a ray.
pub struct DirectionalFunction<'a, F, O> {
    objective: &'a mut O,
    offset: &'a [F],
    direction: &'a [F],
    evals: usize,
}

impl<'a, F: Float, O: Objective<F>> DirectionalFunction<'a, F, O> {
    pub fn new(objective: &'a mut O, offset: &'a [F], direction: &'a [F]) -> Self {
        debug_assert_eq!(offset.len(), direction.len());
        DirectionalFunction {
            objective,
            offset,
            direction,
            evals: 0,
        }
    }

    pub fn offset(&self) -> &[F] {
        self.offset
    }

    pub fn direction(&self) -> &[F] {
        self.direction
    }

    /// Objective evaluations made through this restriction.
    pub fn evals(&self) -> usize {
        self.evals
    }

    /// `offset + t * direction`.
    pub fn point(&self, t: F) -> Vec<F> {
        axpy(self.offset, t, self.direction)
    }

    /// `phi(t)`, value only.
    pub fn value(&mut self, t: F) -> (Vec<F>, F) {
        let x = self.point(t);
        self.evals += 1;
        let value = self.objective.evaluate(&x);
        (x, value)
    }

    /// `phi(t)` together with the full gradient and `phi'(t)`.
    pub fn sample(&mut self, t: F) -> LineSample<F> {
        let x = self.point(t);
        self.evals += 1;
        let (value, gradient) = self.objective.eval_grad(&x);
        let slope = dot(&gradient, self.direction);
        LineSample {
            t,
            x,
            value,
            gradient,
            slope,
        }
    }

    /// `phi'(0)` given the gradient already known at the offset.
    pub fn initial_slope(&self, gradient: &[F]) -> F {
        dot(gradient, self.direction)
    }
}
