//! High-level API for RVM training and evaluation
//!
//! # Quick Start
//!
//! ```rust
//! use ndarray::array;
//! use rrvm::api::Rvm;
//! use rrvm::core::Algorithm;
//! use rrvm::data::MatrixDataset;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let observations = array![[-2.0], [-1.5], [-1.8], [1.5], [1.8], [2.0]];
//! let labels = vec![-1.0, -1.0, -1.0, 1.0, 1.0, 1.0];
//! let dataset = MatrixDataset::new(observations, labels)?;
//!
//! let model = Rvm::new()
//!     .with_algorithm(Algorithm::SequentialInMemory)
//!     .train(&dataset)?;
//!
//! println!("relevant bases: {}", model.n_relevant());
//! println!("train accuracy: {:.2}%", model.evaluate(&dataset) * 100.0);
//! # Ok(())
//! # }
//! ```

use crate::core::{Algorithm, Dataset, Result, TrainConfig};
use crate::kernel::{DcBias, KernelTemplate, RbfTemplate};
use crate::trainer::{RvmTrainer, TrainedRvm};

/// RVM builder with the default candidate basis (a DC bias plus an RBF
/// centered at every training point, width scaled by √D)
#[derive(Debug)]
pub struct Rvm {
    kernels: Vec<Box<dyn KernelTemplate>>,
    config: TrainConfig,
}

impl Rvm {
    /// New builder with default kernels and configuration
    pub fn new() -> Self {
        Self {
            kernels: vec![
                Box::new(DcBias::new()),
                Box::new(RbfTemplate::scaled_by_sqrt_dim()),
            ],
            config: TrainConfig::default(),
        }
    }

    /// Replace the candidate basis templates (centered in this order)
    pub fn with_kernels(mut self, kernels: Vec<Box<dyn KernelTemplate>>) -> Self {
        self.kernels = kernels;
        self
    }

    /// Select the training algorithm
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.config.algorithm = algorithm;
        self
    }

    /// Select the training algorithm by name; unknown names are rejected
    /// without touching the builder state
    pub fn with_algorithm_name(self, name: &str) -> Result<Self> {
        let algorithm = name.parse::<Algorithm>()?;
        Ok(self.with_algorithm(algorithm))
    }

    /// Cap on outer training iterations
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Convergence tolerance (relative weight change / Δ log α)
    pub fn with_beta_converged_tolerance(mut self, tolerance: f64) -> Self {
        self.config.beta_converged_tolerance = tolerance;
        self
    }

    /// Pruning threshold as a fraction of the largest weight (Figueiredo)
    pub fn with_beta_relevant_tolerance(mut self, tolerance: f64) -> Self {
        self.config.beta_relevant_tolerance = tolerance;
        self
    }

    /// Smallest marginal-likelihood gain that counts as progress
    /// (Sequential)
    pub fn with_likelihood_increase_threshold(mut self, threshold: f64) -> Self {
        self.config.likelihood_increase_threshold = threshold;
        self
    }

    /// Gram column block size for the streaming Sequential algorithm
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.config.sequential_block_size = block_size.max(1);
        self
    }

    /// Emit per-iteration progress diagnostics through `log`
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    /// Current configuration
    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Train on a dataset
    pub fn train<D: Dataset>(self, dataset: &D) -> Result<TrainedRvm> {
        RvmTrainer::new(self.kernels, self.config).train(dataset)
    }
}

impl Default for Rvm {
    fn default() -> Self {
        Self::new()
    }
}

impl TrainedRvm {
    /// Confusion-matrix evaluation against a labeled dataset
    pub fn evaluate_detailed<D: Dataset>(&self, dataset: &D) -> EvaluationMetrics {
        let predictions = self.predict(dataset.observations(None).view());
        EvaluationMetrics::from_predictions(
            predictions.iter().copied(),
            dataset.labels().iter().copied(),
        )
    }
}

/// Binary confusion matrix with the usual derived scores
///
/// Rows index the actual class, columns the predicted class (0 = negative,
/// 1 = positive). NaN predictions, as produced by a model with no relevant
/// features, land in the predicted-negative column.
#[derive(Debug, Clone, Default)]
pub struct EvaluationMetrics {
    counts: [[usize; 2]; 2],
}

impl EvaluationMetrics {
    /// Tally predicted ±1 labels against the actual ones in one pass
    pub fn from_predictions<P, A>(predicted: P, actual: A) -> Self
    where
        P: IntoIterator<Item = f64>,
        A: IntoIterator<Item = f64>,
    {
        let mut counts = [[0usize; 2]; 2];
        for (p, a) in predicted.into_iter().zip(actual) {
            counts[usize::from(a > 0.0)][usize::from(p > 0.0)] += 1;
        }
        Self { counts }
    }

    pub fn true_positives(&self) -> usize {
        self.counts[1][1]
    }

    pub fn true_negatives(&self) -> usize {
        self.counts[0][0]
    }

    pub fn false_positives(&self) -> usize {
        self.counts[0][1]
    }

    pub fn false_negatives(&self) -> usize {
        self.counts[1][0]
    }

    /// Fraction of predictions that hit the actual class
    pub fn accuracy(&self) -> f64 {
        let total: usize = self.counts.iter().flatten().sum();
        Self::ratio(self.counts[0][0] + self.counts[1][1], total)
    }

    /// Fraction of the predicted positive class that is really positive
    pub fn precision(&self) -> f64 {
        Self::ratio(self.counts[1][1], self.counts[0][1] + self.counts[1][1])
    }

    /// Fraction of the actual positive class that was found
    pub fn recall(&self) -> f64 {
        Self::ratio(self.counts[1][1], self.counts[1][0] + self.counts[1][1])
    }

    /// Harmonic mean of precision and recall
    pub fn f1_score(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    /// Fraction of the actual negative class that stayed negative
    pub fn specificity(&self) -> f64 {
        Self::ratio(self.counts[0][0], self.counts[0][0] + self.counts[0][1])
    }

    // empty classes score 0 rather than dividing by zero
    fn ratio(numerator: usize, denominator: usize) -> f64 {
        if denominator == 0 {
            0.0
        } else {
            numerator as f64 / denominator as f64
        }
    }
}

/// Shorthand entry points that skip the builder
pub mod quick {
    use super::*;
    use crate::data::MatrixDataset;
    use ndarray::Array2;

    /// Train with all defaults on a matrix and labels
    pub fn train(observations: Array2<f64>, labels: Vec<f64>) -> Result<TrainedRvm> {
        let dataset = MatrixDataset::new(observations, labels)?;
        Rvm::new().train(&dataset)
    }

    /// Train with a named algorithm on a matrix and labels
    pub fn train_with_algorithm(
        observations: Array2<f64>,
        labels: Vec<f64>,
        algorithm: &str,
    ) -> Result<TrainedRvm> {
        let dataset = MatrixDataset::new(observations, labels)?;
        Rvm::new().with_algorithm_name(algorithm)?.train(&dataset)
    }
}
