//! Figueiredo EM trainer
//!
//! Closed-form least-squares initialization followed by the Jeffreys-prior
//! EM fixed point for sparse linear models, adapted to classification
//! through probit surrogate responses. Bases whose weights collapse below a
//! fraction of the largest weight are pruned each sweep.

use crate::core::{
    ExitReason, LearningResults, Result, RvmError, TrainConfig, TrainWarning,
};
use crate::linalg::{rcond_estimate, Cholesky};
use crate::solver::ActiveSet;
use crate::utils::links::inverse_mills;
use log::{debug, warn};
use ndarray::{Array1, Array2, Axis};

/// Reciprocal-condition floor below which the Gram product is regularized
const RCOND_MIN: f64 = 1e-6;

/// Give up on conditioning the Gram product past this diagonal load
const REGULARIZATION_CEILING: f64 = 1.0;

/// Result of a Figueiredo training run
#[derive(Debug, Clone)]
pub struct FigueiredoOutcome {
    /// Full weight vector, exactly 0 at inactive bases
    pub beta: Array1<f64>,
    /// Surviving basis indices
    pub active: ActiveSet,
    pub converged: bool,
    pub results: LearningResults,
    pub warnings: Vec<TrainWarning>,
}

/// Figueiredo EM solver over a precomputed Gram matrix
pub struct FigueiredoSolver {
    config: TrainConfig,
}

impl FigueiredoSolver {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Train on the full N×nBasis Gram matrix and ±1 labels
    pub fn solve(&self, phi: &Array2<f64>, labels: &[f64]) -> Result<FigueiredoOutcome> {
        let n_basis = phi.ncols();
        let y = Array1::from_iter(labels.iter().copied());
        let mut warnings = Vec::new();

        if n_basis == 0 {
            warn!("candidate basis is empty; no relevant features");
            warnings.push(TrainWarning::NoRelevantFeatures);
            return Ok(FigueiredoOutcome {
                beta: Array1::zeros(0),
                active: ActiveSet::new(),
                converged: false,
                results: LearningResults {
                    exit_reason: ExitReason::NoRelevantFeatures,
                    exit_value: 0.0,
                    iterations: 0,
                },
                warnings,
            });
        }

        // least-squares initialization, conditioning the Gram product first
        let mut gram = phi.t().dot(phi);
        let mut sigma_sq = f64::EPSILON;
        let mut regularized = false;
        while rcond_estimate(&gram) < RCOND_MIN {
            if !regularized {
                warn!("Gram product is ill-conditioned; applying diagonal regularization");
                warnings.push(TrainWarning::IllConditionedGram);
                regularized = true;
            }
            for i in 0..n_basis {
                gram[(i, i)] += sigma_sq;
            }
            sigma_sq *= 2.0;
            if sigma_sq > REGULARIZATION_CEILING {
                return Err(RvmError::NumericalBreakdown(format!(
                    "Gram product could not be conditioned below rcond {RCOND_MIN:e}"
                )));
            }
        }
        let chol = Cholesky::factor(&gram)?;
        let mut beta = chol.solve(&phi.t().dot(&y));

        let mut active =
            ActiveSet::from_indices((0..n_basis).filter(|&j| beta[j].abs() > 0.0).collect());

        let mut beta_prev = beta.clone();
        let mut last_rel_change = f64::NAN;
        let mut iterations = 0;
        let mut converged = false;
        let mut exit_reason = ExitReason::MaxIterations;

        for it in 1..=self.config.max_iterations {
            iterations = it;
            let indices = active.indices().to_vec();
            let phi_a = phi.select(Axis(1), &indices);
            let beta_a = Array1::from_iter(indices.iter().map(|&j| beta[j]));

            // probit surrogate responses
            let mut scores = phi_a.dot(&beta_a);
            for (s, &yi) in scores.iter_mut().zip(labels.iter()) {
                if yi > 0.0 {
                    *s += inverse_mills(*s);
                } else {
                    *s -= inverse_mills(-*s);
                }
            }

            // fixed-point step: solve (I + UΦᵀΦU)z = UΦᵀS, then β = Uz
            let u = beta_a.mapv(f64::abs);
            let mut phi_au = phi_a.clone();
            for (mut column, &ui) in phi_au.axis_iter_mut(Axis(1)).zip(u.iter()) {
                column.mapv_inplace(|v| v * ui);
            }
            let mut system = phi_au.t().dot(&phi_au);
            for i in 0..indices.len() {
                system[(i, i)] += 1.0;
            }
            let (system_chol, _) = Cholesky::factor_regularized(&system)?;
            let z = system_chol.solve(&phi_au.t().dot(&scores));

            beta.fill(0.0);
            for (pos, &j) in indices.iter().enumerate() {
                beta[j] = u[pos] * z[pos];
            }

            // prune by weight magnitude
            let max_abs = beta.iter().fold(0.0_f64, |acc, b| acc.max(b.abs()));
            let threshold = max_abs * self.config.beta_relevant_tolerance;
            let mut surviving = Vec::new();
            for j in 0..n_basis {
                if beta[j].abs() > threshold {
                    surviving.push(j);
                } else {
                    beta[j] = 0.0;
                }
            }
            active = ActiveSet::from_indices(surviving);

            if active.is_empty() {
                warn!("all bases pruned; no relevant features");
                warnings.push(TrainWarning::NoRelevantFeatures);
                exit_reason = ExitReason::NoRelevantFeatures;
                last_rel_change = 0.0;
                break;
            }

            let prev_norm = beta_prev.dot(&beta_prev).sqrt();
            let diff = &beta - &beta_prev;
            let diff_norm = diff.dot(&diff).sqrt();
            let rel_change = if prev_norm > 0.0 {
                diff_norm / prev_norm
            } else if diff_norm == 0.0 {
                0.0
            } else {
                f64::INFINITY
            };
            last_rel_change = rel_change;

            if self.config.verbose {
                debug!(
                    "figueiredo iteration {it}: |A| = {}, relative change = {rel_change:.3e}",
                    active.len()
                );
            }

            if rel_change < self.config.beta_converged_tolerance {
                converged = true;
                exit_reason = ExitReason::BetaNotChanging;
                break;
            }
            beta_prev = beta.clone();
        }

        let exit_value = if last_rel_change.is_finite() {
            last_rel_change
        } else {
            0.0
        };
        Ok(FigueiredoOutcome {
            beta,
            active,
            converged,
            results: LearningResults {
                exit_reason,
                exit_value,
                iterations,
            },
            warnings,
        })
    }
}
