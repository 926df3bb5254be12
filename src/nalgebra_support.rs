//! nalgebra adapters for the dense minimizers.
//!
//! Conversions between [`Matrix`] and `DMatrix<F>`, plus an objective wrapper
//! for closures written against `DVector<F>`.

use nalgebra::{DMatrix, DVector, Scalar};
use num_traits::Float;

use crate::error::{MinimizeError, Result};
use crate::linalg::Matrix;
use crate::objective::Objective;

/// Copy a [`Matrix`] into a `DMatrix`.
pub fn to_dmatrix<F: Float + Scalar>(m: &Matrix<F>) -> DMatrix<F> {
    let n = m.dim();
    DMatrix::from_fn(n, n, |i, j| m.get(i, j))
}

/// Copy a square `DMatrix` into a [`Matrix`].
pub fn from_dmatrix<F: Float + Scalar>(m: &DMatrix<F>) -> Result<Matrix<F>> {
    if m.nrows() != m.ncols() {
        return Err(MinimizeError::DimensionMismatch {
            expected: m.nrows(),
            found: m.ncols(),
        });
    }
    let rows = (0..m.nrows())
        .map(|i| (0..m.ncols()).map(|j| m[(i, j)]).collect())
        .collect();
    Matrix::from_rows(rows)
}

/// Adapter wrapping a closure `&DVector -> (f(x), ∇f(x))` as an [`Objective`].
pub struct DVectorObjective<G> {
    dim: usize,
    func: G,
}

impl<G> DVectorObjective<G> {
    pub fn new(dim: usize, func: G) -> Self {
        DVectorObjective { dim, func }
    }
}

impl<F, G> Objective<F> for DVectorObjective<G>
where
    F: Float + Scalar,
    G: FnMut(&DVector<F>) -> (F, DVector<F>),
{
    fn dim(&self) -> usize {
        self.dim
    }

    fn eval_grad(&mut self, x: &[F]) -> (F, Vec<F>) {
        let (value, gradient) = (self.func)(&DVector::from_column_slice(x));
        (value, gradient.as_slice().to_vec())
    }
}
