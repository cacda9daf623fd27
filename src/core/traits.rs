//! Core traits for RVM training

use ndarray::Array2;

/// Dataset abstraction consumed by the training core
///
/// The core only needs a dense observation matrix and ±1 labels; how the
/// data got there (files, databases, another framework) is the caller's
/// concern.
pub trait Dataset {
    /// Number of observations N
    fn n_observations(&self) -> usize;

    /// Number of features D
    fn n_features(&self) -> usize;

    /// Observation matrix, either all rows (`None`) or the given row subset,
    /// as an N×D (or |indices|×D) matrix
    fn observations(&self, indices: Option<&[usize]>) -> Array2<f64>;

    /// Labels, one per observation, each −1.0 or +1.0
    fn labels(&self) -> &[f64];

    /// Targets as an N×2 one-hot matrix, column 0 for the −1 class and
    /// column 1 for the +1 class
    fn binary_targets(&self) -> Array2<f64> {
        let labels = self.labels();
        let mut targets = Array2::zeros((labels.len(), 2));
        for (i, &y) in labels.iter().enumerate() {
            let col = usize::from(y > 0.0);
            targets[(i, col)] = 1.0;
        }
        targets
    }

    /// Whether every label is −1 or +1
    fn is_binary(&self) -> bool {
        self.labels().iter().all(|&y| y == 1.0 || y == -1.0)
    }

    /// Whether the dataset holds no observations
    fn is_empty(&self) -> bool {
        self.n_observations() == 0
    }
}
