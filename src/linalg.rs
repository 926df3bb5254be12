use num_traits::Float;

use crate::error::{MinimizeError, Result};

/// Compute the dot product of two vectors.
pub fn dot<F: Float>(a: &[F], b: &[F]) -> F {
    debug_assert_eq!(a.len(), b.len());
    let mut s = F::zero();
    for i in 0..a.len() {
        s = s + a[i] * b[i];
    }
    s
}

/// Compute the L2 norm of a vector.
pub fn norm<F: Float>(v: &[F]) -> F {
    let mut s = F::zero();
    for &x in v {
        s = s + x * x;
    }
    s.sqrt()
}

/// Squared L2 norm, without the square root.
pub fn norm_squared<F: Float>(v: &[F]) -> F {
    dot(v, v)
}

/// Compute the L1 norm of a vector.
pub fn norm1<F: Float>(v: &[F]) -> F {
    v.iter().fold(F::zero(), |acc, &x| acc + x.abs())
}

/// `v * s`, element-wise.
pub fn scale<F: Float>(v: &[F], s: F) -> Vec<F> {
    v.iter().map(|&x| x * s).collect()
}

/// `a - b`, element-wise.
pub fn sub<F: Float>(a: &[F], b: &[F]) -> Vec<F> {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(&x, &y)| x - y).collect()
}

/// `x + t * d`.
pub fn axpy<F: Float>(x: &[F], t: F, d: &[F]) -> Vec<F> {
    debug_assert_eq!(x.len(), d.len());
    x.iter().zip(d).map(|(&xi, &di)| xi + t * di).collect()
}

/// `-v`.
pub fn negate<F: Float>(v: &[F]) -> Vec<F> {
    v.iter().map(|&x| F::zero() - x).collect()
}

/// Dense square matrix, stored as `rows[row][col]`.
///
/// Used for the inverse-Hessian estimate, which is kept symmetric by writing
/// through [`Matrix::set_symmetric`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Matrix<F> {
    rows: Vec<Vec<F>>,
}

impl<F: Float> Matrix<F> {
    /// The `n x n` identity.
    pub fn identity(n: usize) -> Self {
        let mut rows = vec![vec![F::zero(); n]; n];
        for (i, row) in rows.iter_mut().enumerate() {
            row[i] = F::one();
        }
        Matrix { rows }
    }

    /// Build from rows. Every row must have as many entries as there are rows.
    pub fn from_rows(rows: Vec<Vec<F>>) -> Result<Self> {
        let n = rows.len();
        if let Some(bad) = rows.iter().find(|r| r.len() != n) {
            return Err(MinimizeError::DimensionMismatch {
                expected: n,
                found: bad.len(),
            });
        }
        Ok(Matrix { rows })
    }

    /// Number of rows (and columns).
    pub fn dim(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, row: usize, col: usize) -> F {
        self.rows[row][col]
    }

    /// Write `value` at `(row, col)` and `(col, row)`.
    pub fn set_symmetric(&mut self, row: usize, col: usize, value: F) {
        self.rows[row][col] = value;
        if row != col {
            self.rows[col][row] = value;
        }
    }

    /// Borrow the row storage.
    pub fn rows(&self) -> &[Vec<F>] {
        &self.rows
    }

    /// `self * v`.
    pub fn mul_vec(&self, v: &[F]) -> Result<Vec<F>> {
        if v.len() != self.dim() {
            return Err(MinimizeError::DimensionMismatch {
                expected: self.dim(),
                found: v.len(),
            });
        }
        Ok(self.rows.iter().map(|row| dot(row, v)).collect())
    }

    /// Exact symmetry check.
    pub fn is_symmetric(&self) -> bool {
        self.first_asymmetry().is_none()
    }

    /// First `(row, col)` with `row > col` where the mirror entry differs.
    pub fn first_asymmetry(&self) -> Option<(usize, usize)> {
        let n = self.dim();
        for i in 0..n {
            for j in 0..i {
                if self.rows[i][j] != self.rows[j][i] {
                    return Some((i, j));
                }
            }
        }
        None
    }
}
