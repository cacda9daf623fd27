//! Kernel trait definitions
//!
//! A kernel enters training in two stages. A [`KernelTemplate`] describes a
//! family of basis functions ("an RBF at every training point", "a constant
//! bias"); centering it on a dataset yields concrete [`KernelInstance`]s,
//! each of which evaluates to one column of the Gram matrix.

use crate::core::Dataset;
use ndarray::{Array1, ArrayView2};
use std::fmt;

/// A candidate-basis template that can be centered on a dataset
pub trait KernelTemplate: fmt::Debug + Send + Sync {
    /// Produce the concrete basis functions this template contributes,
    /// in a stable order
    fn center(&self, dataset: &dyn Dataset) -> Vec<Box<dyn KernelInstance>>;
}

/// A concrete basis function: one column of the Gram matrix
pub trait KernelInstance: fmt::Debug + Send + Sync {
    /// Evaluate the basis at each query row, one output entry per row
    fn evaluate(&self, x: ArrayView2<'_, f64>) -> Array1<f64>;

    /// Clone behind the trait object
    fn clone_box(&self) -> Box<dyn KernelInstance>;
}

impl Clone for Box<dyn KernelInstance> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
