//! Concrete dataset types

use crate::core::{Dataset, Result, RvmError};
use ndarray::{Array2, Axis};

/// In-memory dataset over a dense N×D observation matrix and ±1 labels
#[derive(Debug, Clone)]
pub struct MatrixDataset {
    observations: Array2<f64>,
    labels: Vec<f64>,
}

impl MatrixDataset {
    /// Create a dataset from an observation matrix and labels
    ///
    /// Fails on an empty matrix or a label/row count mismatch. Label values
    /// are not validated here; training rejects non-binary labels before any
    /// computation.
    pub fn new(observations: Array2<f64>, labels: Vec<f64>) -> Result<Self> {
        if observations.nrows() == 0 {
            return Err(RvmError::EmptyDataset);
        }
        if labels.len() != observations.nrows() {
            return Err(RvmError::DimensionMismatch {
                expected: observations.nrows(),
                actual: labels.len(),
            });
        }
        Ok(Self {
            observations,
            labels,
        })
    }

    /// Build a dataset from row slices, one per observation
    pub fn from_rows(rows: &[Vec<f64>], labels: Vec<f64>) -> Result<Self> {
        if rows.is_empty() {
            return Err(RvmError::EmptyDataset);
        }
        let dim = rows[0].len();
        let mut observations = Array2::zeros((rows.len(), dim));
        for (i, row) in rows.iter().enumerate() {
            if row.len() != dim {
                return Err(RvmError::DimensionMismatch {
                    expected: dim,
                    actual: row.len(),
                });
            }
            for (j, &value) in row.iter().enumerate() {
                observations[(i, j)] = value;
            }
        }
        Self::new(observations, labels)
    }
}

impl Dataset for MatrixDataset {
    fn n_observations(&self) -> usize {
        self.observations.nrows()
    }

    fn n_features(&self) -> usize {
        self.observations.ncols()
    }

    fn observations(&self, indices: Option<&[usize]>) -> Array2<f64> {
        match indices {
            None => self.observations.clone(),
            Some(rows) => self.observations.select(Axis(0), rows),
        }
    }

    fn labels(&self) -> &[f64] {
        &self.labels
    }
}
