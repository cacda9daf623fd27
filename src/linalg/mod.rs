//! Dense linear-algebra primitives for symmetric positive definite systems
//!
//! Everything the trainers need from a matrix library: Cholesky
//! factorization with a jitter-and-retry policy, triangular solves, SPD
//! inversion, and a cheap reciprocal-condition estimate.

use crate::core::{Result, RvmError};
use ndarray::{Array1, Array2};

/// Largest diagonal jitter tried before a factorization failure becomes
/// fatal. The retry loop starts at machine epsilon and doubles per attempt.
pub const JITTER_CEILING: f64 = 1e-3;

/// Lower-triangular Cholesky factor L of an SPD matrix A = L·Lᵀ
#[derive(Debug, Clone)]
pub struct Cholesky {
    l: Array2<f64>,
}

impl Cholesky {
    /// Factor an SPD matrix
    ///
    /// Fails with `NumericalBreakdown` on a non-positive pivot. Only the
    /// lower triangle of `a` is read.
    pub fn factor(a: &Array2<f64>) -> Result<Self> {
        let n = a.nrows();
        if a.ncols() != n {
            return Err(RvmError::DimensionMismatch {
                expected: n,
                actual: a.ncols(),
            });
        }

        let mut l = Array2::zeros((n, n));
        for j in 0..n {
            let mut diag = a[(j, j)];
            for k in 0..j {
                diag -= l[(j, k)] * l[(j, k)];
            }
            if diag <= 0.0 || !diag.is_finite() {
                return Err(RvmError::NumericalBreakdown(format!(
                    "non-positive pivot {diag:e} at column {j} during Cholesky factorization"
                )));
            }
            let ljj = diag.sqrt();
            l[(j, j)] = ljj;

            for i in (j + 1)..n {
                let mut sum = a[(i, j)];
                for k in 0..j {
                    sum -= l[(i, k)] * l[(j, k)];
                }
                l[(i, j)] = sum / ljj;
            }
        }
        Ok(Self { l })
    }

    /// Factor with the jitter-and-retry policy
    ///
    /// On failure, retries with `a + σ²I` where σ² starts at machine epsilon
    /// and doubles per attempt up to [`JITTER_CEILING`]. Returns the factor
    /// and the jitter that was needed (0.0 when none was). Failure past the
    /// ceiling is fatal.
    pub fn factor_regularized(a: &Array2<f64>) -> Result<(Self, f64)> {
        if let Ok(chol) = Self::factor(a) {
            return Ok((chol, 0.0));
        }

        let n = a.nrows();
        let mut jitter = f64::EPSILON;
        while jitter <= JITTER_CEILING {
            let mut regularized = a.clone();
            for i in 0..n {
                regularized[(i, i)] += jitter;
            }
            if let Ok(chol) = Self::factor(&regularized) {
                return Ok((chol, jitter));
            }
            jitter *= 2.0;
        }
        Err(RvmError::NumericalBreakdown(format!(
            "Cholesky factorization failed for all diagonal jitters up to {JITTER_CEILING:e}"
        )))
    }

    /// Matrix dimension
    pub fn dim(&self) -> usize {
        self.l.nrows()
    }

    /// The lower-triangular factor L
    pub fn factor_matrix(&self) -> &Array2<f64> {
        &self.l
    }

    /// Forward substitution: solve L·z = b
    pub fn solve_lower(&self, b: &Array1<f64>) -> Array1<f64> {
        let n = self.dim();
        let mut z = Array1::zeros(n);
        for i in 0..n {
            let mut sum = b[i];
            for k in 0..i {
                sum -= self.l[(i, k)] * z[k];
            }
            z[i] = sum / self.l[(i, i)];
        }
        z
    }

    /// Back substitution: solve Lᵀ·x = b
    pub fn solve_lower_transpose(&self, b: &Array1<f64>) -> Array1<f64> {
        let n = self.dim();
        let mut x = Array1::zeros(n);
        for i in (0..n).rev() {
            let mut sum = b[i];
            for k in (i + 1)..n {
                sum -= self.l[(k, i)] * x[k];
            }
            x[i] = sum / self.l[(i, i)];
        }
        x
    }

    /// Solve A·x = b via the two triangular solves
    pub fn solve(&self, b: &Array1<f64>) -> Array1<f64> {
        let z = self.solve_lower(b);
        self.solve_lower_transpose(&z)
    }

    /// Full SPD inverse A⁻¹, symmetrized against round-off
    pub fn inverse(&self) -> Array2<f64> {
        let n = self.dim();
        let mut inv = Array2::zeros((n, n));
        let mut e = Array1::zeros(n);
        for j in 0..n {
            e[j] = 1.0;
            let column = self.solve(&e);
            for i in 0..n {
                inv[(i, j)] = column[i];
            }
            e[j] = 0.0;
        }
        // symmetrize: the two triangles can disagree in the last bits
        for i in 0..n {
            for j in (i + 1)..n {
                let mean = 0.5 * (inv[(i, j)] + inv[(j, i)]);
                inv[(i, j)] = mean;
                inv[(j, i)] = mean;
            }
        }
        inv
    }
}

/// Cheap reciprocal-condition estimate for an SPD matrix
///
/// Returns 0.0 when the factorization fails outright; otherwise
/// `(min diag L / max diag L)²`, a pivot-ratio proxy for λ_min/λ_max that is
/// adequate to drive a regularization loop.
pub fn rcond_estimate(a: &Array2<f64>) -> f64 {
    let chol = match Cholesky::factor(a) {
        Ok(chol) => chol,
        Err(_) => return 0.0,
    };
    let diag = chol.factor_matrix().diag();
    let mut min = f64::INFINITY;
    let mut max = 0.0_f64;
    for &d in diag.iter() {
        min = min.min(d);
        max = max.max(d);
    }
    if max == 0.0 {
        return 0.0;
    }
    let ratio = min / max;
    ratio * ratio
}
