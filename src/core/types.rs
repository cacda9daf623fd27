//! Core type definitions for RVM training

use crate::core::error::RvmError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Training algorithm selection
///
/// Three strategies share the same training contract but not the same
/// implementation:
/// - `Figueiredo`: EM-style fixed point with a Jeffreys prior, prunes by
///   weight magnitude. Builds the full Gram matrix once.
/// - `Sequential`: Tipping-Faul fast marginal likelihood maximization with
///   add/delete/re-estimate moves; recomputes Gram columns in blocks.
/// - `SequentialInMemory`: same moves as `Sequential` over a single
///   precomputed Gram matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Algorithm {
    Figueiredo,
    Sequential,
    SequentialInMemory,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Figueiredo => write!(f, "Figueiredo"),
            Algorithm::Sequential => write!(f, "Sequential"),
            Algorithm::SequentialInMemory => write!(f, "SequentialInMemory"),
        }
    }
}

impl FromStr for Algorithm {
    type Err = RvmError;

    /// Parse an algorithm name; unknown names are rejected so that a bad
    /// configuration never reaches training.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Figueiredo" => Ok(Algorithm::Figueiredo),
            "Sequential" => Ok(Algorithm::Sequential),
            "SequentialInMemory" => Ok(Algorithm::SequentialInMemory),
            other => Err(RvmError::InvalidAlgorithm(other.to_string())),
        }
    }
}

/// Configuration for RVM training
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Training algorithm
    pub algorithm: Algorithm,
    /// Hard cap on outer training iterations
    pub max_iterations: usize,
    /// Convergence threshold (relative change of the weight vector for
    /// Figueiredo, max |Δ log α| for the Sequential algorithms)
    pub beta_converged_tolerance: f64,
    /// Pruning threshold as a fraction of the largest |weight| (Figueiredo)
    pub beta_relevant_tolerance: f64,
    /// Smallest marginal-likelihood increase that still counts as progress
    /// (Sequential algorithms)
    pub likelihood_increase_threshold: f64,
    /// Number of Gram columns recomputed per block in the streaming
    /// Sequential algorithm
    pub sequential_block_size: usize,
    /// Emit per-iteration progress diagnostics through the `log` crate
    pub verbose: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Figueiredo,
            max_iterations: 1000,
            beta_converged_tolerance: 1e-3,
            beta_relevant_tolerance: 1e-3,
            likelihood_increase_threshold: 1e-6,
            sequential_block_size: 1000,
            verbose: false,
        }
    }
}

/// Why training stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    /// Sequential: no candidate move improves the marginal likelihood enough
    NoGoodActions,
    /// Sequential: all precisions stable between iterations
    AlphaNotChanging,
    /// Figueiredo: relative change of the weight vector below tolerance
    BetaNotChanging,
    /// Iteration cap reached without meeting a convergence criterion
    MaxIterations,
    /// Every basis was pruned; the model has no relevant features
    NoRelevantFeatures,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::NoGoodActions => write!(f, "No Good Actions"),
            ExitReason::AlphaNotChanging => write!(f, "Alpha Not Changing"),
            ExitReason::BetaNotChanging => write!(f, "Beta Not Changing"),
            ExitReason::MaxIterations => write!(f, "Max Iterations"),
            ExitReason::NoRelevantFeatures => write!(f, "No Relevant Features"),
        }
    }
}

/// Outcome of a training run
///
/// `exit_value` carries the measure that triggered the exit: the best
/// available likelihood increase for `NoGoodActions`, the largest
/// |Δ log α| for `AlphaNotChanging`, the relative weight change for
/// `BetaNotChanging`, and the final convergence measure of the algorithm
/// when the iteration cap was hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningResults {
    pub exit_reason: ExitReason,
    pub exit_value: f64,
    /// Outer iterations actually performed
    pub iterations: usize,
}

/// Recoverable conditions reported on the trained model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainWarning {
    /// The Gram product was ill-conditioned and a diagonal regularization
    /// was applied (Figueiredo)
    IllConditionedGram,
    /// Training ended with an empty active set; predictions are NaN
    NoRelevantFeatures,
}
