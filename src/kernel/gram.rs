//! Gram matrix construction
//!
//! Thin façade between the trainers and the kernel instances: builds the
//! full N×nBasis matrix, a contiguous column block of it, or a single
//! column, always in the stable basis order.

use crate::kernel::KernelInstance;
use ndarray::{Array1, Array2, ArrayView2};

/// Builds Gram matrices from centered kernel instances
#[derive(Debug, Clone, Copy, Default)]
pub struct GramBuilder;

impl GramBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Full Gram matrix: column j is `kernels[j]` evaluated at every row
    /// of `x`
    pub fn gram(&self, x: ArrayView2<'_, f64>, kernels: &[Box<dyn KernelInstance>]) -> Array2<f64> {
        self.gram_block(x, kernels, 0, kernels.len())
    }

    /// Columns `start..start + len` of the Gram matrix
    pub fn gram_block(
        &self,
        x: ArrayView2<'_, f64>,
        kernels: &[Box<dyn KernelInstance>],
        start: usize,
        len: usize,
    ) -> Array2<f64> {
        let end = (start + len).min(kernels.len());
        let mut block = Array2::zeros((x.nrows(), end.saturating_sub(start)));
        for (out_col, kernel) in kernels[start..end].iter().enumerate() {
            let column = kernel.evaluate(x);
            block.column_mut(out_col).assign(&column);
        }
        block
    }

    /// A single Gram column
    pub fn gram_column(
        &self,
        x: ArrayView2<'_, f64>,
        kernels: &[Box<dyn KernelInstance>],
        j: usize,
    ) -> Array1<f64> {
        kernels[j].evaluate(x)
    }
}
