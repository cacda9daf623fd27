//! Training orchestration and the trained model
//!
//! [`RvmTrainer`] validates the input, centers the candidate kernel
//! templates over the dataset in declared order, dispatches to the selected
//! algorithm, and packages the sparse result as a [`TrainedRvm`] that scores
//! queries through the probit link.

use crate::core::{
    Algorithm, Dataset, ExitReason, LearningResults, Result, RvmError, TrainConfig, TrainWarning,
};
use crate::kernel::{GramBuilder, KernelInstance, KernelTemplate};
use crate::solver::{FigueiredoSolver, InMemoryGram, SequentialSolver, StreamingGram};
use crate::utils::links::normal_cdf;
use crate::utils::validation;
use log::{info, warn};
use ndarray::{s, Array1, Array2, ArrayView2};

/// Query rows scored per block to bound peak memory
pub const SCORING_BLOCK_ROWS: usize = 1000;

/// Orchestrates one training run
pub struct RvmTrainer {
    kernels: Vec<Box<dyn KernelTemplate>>,
    config: TrainConfig,
}

impl RvmTrainer {
    pub fn new(kernels: Vec<Box<dyn KernelTemplate>>, config: TrainConfig) -> Self {
        Self { kernels, config }
    }

    /// Train a model on the dataset
    ///
    /// Structural input errors (non-binary labels, empty data) surface
    /// before any Gram computation.
    pub fn train<D: Dataset>(&self, dataset: &D) -> Result<TrainedRvm> {
        validation::validate_binary_labels(dataset)?;
        if dataset.is_empty() {
            return Err(RvmError::EmptyDataset);
        }

        let mut instances: Vec<Box<dyn KernelInstance>> = Vec::new();
        for template in &self.kernels {
            instances.extend(template.center(dataset));
        }
        if self.config.verbose {
            info!(
                "training {} on {} observations, {} candidate bases",
                self.config.algorithm,
                dataset.n_observations(),
                instances.len()
            );
        }

        let observations = dataset.observations(None);
        let labels = dataset.labels();

        let (beta, selected, sigma, converged, results, mut warnings) =
            match self.config.algorithm {
                Algorithm::Figueiredo => {
                    let phi = GramBuilder::new().gram(observations.view(), &instances);
                    let outcome =
                        FigueiredoSolver::new(self.config.clone()).solve(&phi, labels)?;
                    (
                        outcome.beta,
                        outcome.active.indices().to_vec(),
                        None,
                        outcome.converged,
                        outcome.results,
                        outcome.warnings,
                    )
                }
                Algorithm::Sequential => {
                    let mut gram = StreamingGram::new(
                        observations,
                        &instances,
                        self.config.sequential_block_size,
                    );
                    let outcome =
                        SequentialSolver::new(self.config.clone()).solve(&mut gram, labels)?;
                    (
                        outcome.beta,
                        outcome.active.indices().to_vec(),
                        Some(outcome.sigma),
                        outcome.converged,
                        outcome.results,
                        outcome.warnings,
                    )
                }
                Algorithm::SequentialInMemory => {
                    let phi = GramBuilder::new().gram(observations.view(), &instances);
                    let mut gram = InMemoryGram::from_raw(phi);
                    let outcome =
                        SequentialSolver::new(self.config.clone()).solve(&mut gram, labels)?;
                    (
                        outcome.beta,
                        outcome.active.indices().to_vec(),
                        Some(outcome.sigma),
                        outcome.converged,
                        outcome.results,
                        outcome.warnings,
                    )
                }
            };

        if selected.is_empty() && !warnings.contains(&TrainWarning::NoRelevantFeatures) {
            warn!("training ended with an empty active set");
            warnings.push(TrainWarning::NoRelevantFeatures);
        }

        let sparse_beta = Array1::from_iter(selected.iter().map(|&j| beta[j]));
        let sparse_kernels: Vec<Box<dyn KernelInstance>> =
            selected.iter().map(|&j| instances[j].clone()).collect();

        Ok(TrainedRvm {
            sparse_beta,
            sparse_kernels,
            selected_indices: selected,
            beta,
            sigma,
            converged,
            results,
            warnings,
        })
    }
}

/// A trained RVM: a sparse set of kernels, their weights, and the training
/// outcome. Read-only after training.
pub struct TrainedRvm {
    sparse_beta: Array1<f64>,
    sparse_kernels: Vec<Box<dyn KernelInstance>>,
    selected_indices: Vec<usize>,
    beta: Array1<f64>,
    sigma: Option<Array2<f64>>,
    converged: bool,
    results: LearningResults,
    warnings: Vec<TrainWarning>,
}

impl TrainedRvm {
    /// Positive-class probability for each query row
    ///
    /// Rows are processed in blocks of [`SCORING_BLOCK_ROWS`]. With no
    /// relevant features every score is NaN.
    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        let n = x.nrows();
        let mut scores = Array1::from_elem(n, f64::NAN);
        if self.sparse_kernels.is_empty() {
            return scores;
        }

        let builder = GramBuilder::new();
        let mut start = 0;
        while start < n {
            let end = (start + SCORING_BLOCK_ROWS).min(n);
            let gamma = builder.gram(x.slice(s![start..end, ..]), &self.sparse_kernels);
            let linear = gamma.dot(&self.sparse_beta);
            for (offset, &value) in linear.iter().enumerate() {
                scores[start + offset] = normal_cdf(value);
            }
            start = end;
        }
        scores
    }

    /// Hard ±1 labels from the probability scores; NaN scores stay NaN
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        self.predict_proba(x).mapv(|p| {
            if p.is_nan() {
                f64::NAN
            } else if p >= 0.5 {
                1.0
            } else {
                -1.0
            }
        })
    }

    /// Accuracy against a labeled dataset
    pub fn evaluate<D: Dataset>(&self, dataset: &D) -> f64 {
        let predictions = self.predict(dataset.observations(None).view());
        let labels = dataset.labels();
        let correct = predictions
            .iter()
            .zip(labels.iter())
            .filter(|(&p, &y)| p == y)
            .count();
        correct as f64 / labels.len() as f64
    }

    /// Weights of the relevant bases, in sorted-index order
    pub fn sparse_beta(&self) -> &Array1<f64> {
        &self.sparse_beta
    }

    /// The relevant basis functions, in sorted-index order
    pub fn sparse_kernels(&self) -> &[Box<dyn KernelInstance>] {
        &self.sparse_kernels
    }

    /// Indices of the relevant bases inside the candidate ordering
    pub fn selected_indices(&self) -> &[usize] {
        &self.selected_indices
    }

    /// Full weight vector, zero at pruned bases
    pub fn beta(&self) -> &Array1<f64> {
        &self.beta
    }

    /// Posterior covariance over the active weights (Sequential only)
    pub fn sigma(&self) -> Option<&Array2<f64>> {
        self.sigma.as_ref()
    }

    /// Whether a convergence criterion was met
    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn results(&self) -> &LearningResults {
        &self.results
    }

    pub fn warnings(&self) -> &[TrainWarning] {
        &self.warnings
    }

    /// Number of relevant bases
    pub fn n_relevant(&self) -> usize {
        self.sparse_kernels.len()
    }

    /// Whether training ended at the iteration cap
    pub fn hit_iteration_cap(&self) -> bool {
        self.results.exit_reason == ExitReason::MaxIterations
    }
}
