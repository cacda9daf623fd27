//! Constant (DC bias) kernel

use crate::core::Dataset;
use crate::kernel::{KernelInstance, KernelTemplate};
use ndarray::{Array1, ArrayView2};

/// Template contributing a single constant basis function
///
/// The bias column lets the classifier shift its decision boundary away
/// from the origin; it is the first entry of the default candidate basis.
#[derive(Debug, Clone, Copy, Default)]
pub struct DcBias;

impl DcBias {
    pub fn new() -> Self {
        Self
    }
}

impl KernelTemplate for DcBias {
    fn center(&self, _dataset: &dyn Dataset) -> Vec<Box<dyn KernelInstance>> {
        vec![Box::new(BiasInstance)]
    }
}

/// The centered bias basis: constant 1 at every observation
#[derive(Debug, Clone, Copy)]
pub struct BiasInstance;

impl KernelInstance for BiasInstance {
    fn evaluate(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        Array1::ones(x.nrows())
    }

    fn clone_box(&self) -> Box<dyn KernelInstance> {
        Box::new(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Dataset;
    use crate::data::MatrixDataset;
    use ndarray::arr2;

    #[test]
    fn test_bias_centers_to_single_instance() {
        let dataset =
            MatrixDataset::new(arr2(&[[1.0, 2.0], [3.0, 4.0]]), vec![1.0, -1.0]).unwrap();
        let instances = DcBias::new().center(&dataset);
        assert_eq!(instances.len(), 1);
    }

    #[test]
    fn test_bias_evaluates_to_ones() {
        let dataset =
            MatrixDataset::new(arr2(&[[1.0, 2.0], [3.0, 4.0]]), vec![1.0, -1.0]).unwrap();
        let instances = DcBias::new().center(&dataset);
        let column = instances[0].evaluate(dataset.observations(None).view());
        assert_eq!(column, Array1::ones(2));
    }
}
