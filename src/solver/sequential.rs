//! Sequential (Tipping-Faul) fast marginal-likelihood trainer
//!
//! Starts from a single seed basis and grows/shrinks the active set one
//! move at a time: each outer iteration scores every candidate basis for an
//! add, remove, or re-estimate move from the marginal sufficient statistics
//! S and Q, applies the best move as a rank-1 warm start, then refreshes the
//! Laplace approximation with a full IRLS pass.
//!
//! The trainer is generic over a [`GramSource`]: [`InMemoryGram`] holds one
//! precomputed matrix, [`StreamingGram`] recomputes columns in blocks
//! through the kernel instances with an LRU block cache. Both serve
//! unit-L2-normalized columns; weights are rescaled back to raw-kernel
//! scale on termination so that scoring can use plain kernel evaluations.

use crate::cache::GramBlockCache;
use crate::core::{ExitReason, LearningResults, Result, RvmError, TrainConfig, TrainWarning};
use crate::kernel::{GramBuilder, KernelInstance};
use crate::linalg::Cholesky;
use crate::solver::irls::{penalized_irls, IrlsOutcome};
use crate::solver::ActiveSet;
use crate::utils::links::logit;
use log::{debug, warn};
use ndarray::{s, Array1, Array2, ArrayView2, Axis};
use std::sync::Arc;

/// Default memory budget for the streaming block cache (bytes)
const DEFAULT_CACHE_BYTES: usize = 100_000_000;

/// Abstract source of unit-normalized Gram columns
pub trait GramSource {
    /// Total number of basis functions
    fn n_basis(&self) -> usize;

    /// Visit every column block as `(first_column_index, block)`; the
    /// in-memory source visits one block, the streaming source visits
    /// `ceil(n_basis / block_size)` of them
    fn for_each_block(&mut self, visit: &mut dyn FnMut(usize, ArrayView2<'_, f64>));

    /// A single normalized column
    fn column(&mut self, j: usize) -> Array1<f64>;

    /// The raw L2 norm that column `j` was divided by
    fn column_norm(&self, j: usize) -> f64;
}

/// Gram source over a single precomputed matrix
pub struct InMemoryGram {
    phi: Array2<f64>,
    norms: Array1<f64>,
}

impl InMemoryGram {
    /// Take a raw N×nBasis Gram matrix and normalize its columns
    pub fn from_raw(mut phi: Array2<f64>) -> Self {
        let mut norms = Array1::ones(phi.ncols());
        for (j, mut column) in phi.axis_iter_mut(Axis(1)).enumerate() {
            let norm = column.dot(&column).sqrt();
            if norm > 0.0 {
                norms[j] = norm;
                column.mapv_inplace(|v| v / norm);
            }
        }
        Self { phi, norms }
    }
}

impl GramSource for InMemoryGram {
    fn n_basis(&self) -> usize {
        self.phi.ncols()
    }

    fn for_each_block(&mut self, visit: &mut dyn FnMut(usize, ArrayView2<'_, f64>)) {
        visit(0, self.phi.view());
    }

    fn column(&mut self, j: usize) -> Array1<f64> {
        self.phi.column(j).to_owned()
    }

    fn column_norm(&self, j: usize) -> f64 {
        self.norms[j]
    }
}

/// Gram source that recomputes column blocks through the kernel instances
pub struct StreamingGram<'a> {
    x: Array2<f64>,
    kernels: &'a [Box<dyn KernelInstance>],
    builder: GramBuilder,
    norms: Array1<f64>,
    block_size: usize,
    cache: GramBlockCache,
}

impl<'a> StreamingGram<'a> {
    /// Create the source and run the one-time norm pass over all blocks
    pub fn new(x: Array2<f64>, kernels: &'a [Box<dyn KernelInstance>], block_size: usize) -> Self {
        let block_size = block_size.max(1);
        let n_basis = kernels.len();
        let builder = GramBuilder::new();
        let mut cache = GramBlockCache::with_memory_limit(
            DEFAULT_CACHE_BYTES,
            x.nrows().max(1),
            block_size,
        );

        let mut norms = Array1::ones(n_basis);
        let mut start = 0;
        let mut block_index = 0;
        while start < n_basis {
            let mut block = builder.gram_block(x.view(), kernels, start, block_size);
            for (c, mut column) in block.axis_iter_mut(Axis(1)).enumerate() {
                let norm = column.dot(&column).sqrt();
                if norm > 0.0 {
                    norms[start + c] = norm;
                    column.mapv_inplace(|v| v / norm);
                }
            }
            cache.put(block_index, Arc::new(block));
            start += block_size;
            block_index += 1;
        }

        Self {
            x,
            kernels,
            builder,
            norms,
            block_size,
            cache,
        }
    }

    /// Block cache statistics (for diagnostics)
    pub fn cache_stats(&self) -> crate::cache::CacheStats {
        self.cache.stats()
    }

    fn normalized_block(&mut self, block_index: usize) -> Arc<Array2<f64>> {
        if let Some(block) = self.cache.get(block_index) {
            return block;
        }
        let start = block_index * self.block_size;
        let mut block = self
            .builder
            .gram_block(self.x.view(), self.kernels, start, self.block_size);
        for (c, mut column) in block.axis_iter_mut(Axis(1)).enumerate() {
            let norm = self.norms[start + c];
            column.mapv_inplace(|v| v / norm);
        }
        let block = Arc::new(block);
        self.cache.put(block_index, Arc::clone(&block));
        block
    }
}

impl GramSource for StreamingGram<'_> {
    fn n_basis(&self) -> usize {
        self.kernels.len()
    }

    fn for_each_block(&mut self, visit: &mut dyn FnMut(usize, ArrayView2<'_, f64>)) {
        let n_basis = self.n_basis();
        let n_blocks = n_basis.div_ceil(self.block_size);
        for block_index in 0..n_blocks {
            let block = self.normalized_block(block_index);
            visit(block_index * self.block_size, block.view());
        }
    }

    fn column(&mut self, j: usize) -> Array1<f64> {
        let mut column = self.builder.gram_column(self.x.view(), self.kernels, j);
        let norm = self.norms[j];
        column.mapv_inplace(|v| v / norm);
        column
    }

    fn column_norm(&self, j: usize) -> f64 {
        self.norms[j]
    }
}

/// Result of a Sequential training run, in raw-kernel scale
#[derive(Debug, Clone)]
pub struct SequentialOutcome {
    /// Posterior-mean weights of the active bases, sorted-index order
    pub mu: Array1<f64>,
    /// Surviving basis indices
    pub active: ActiveSet,
    /// Full precision vector; +∞ exactly at inactive bases
    pub alpha: Array1<f64>,
    /// Posterior covariance over the active weights
    pub sigma: Array2<f64>,
    /// Full weight vector, zero-padded at inactive bases
    pub beta: Array1<f64>,
    pub converged: bool,
    pub results: LearningResults,
    pub warnings: Vec<TrainWarning>,
}

/// One candidate move on the active set
#[derive(Debug, Clone, Copy, PartialEq)]
enum Move {
    Add(usize),
    Remove(usize),
    Modify(usize),
}

/// Per-basis move scores for one iteration
struct MoveScores {
    /// ΔL of the best add, with its basis
    add: (f64, Option<usize>),
    /// ΔL of the best remove, with its basis
    remove: (f64, Option<usize>),
    /// ΔL of the best re-estimate, with its basis
    modify: (f64, Option<usize>),
    /// ΔL of the re-estimate move for every basis (0 when ineligible)
    modify_all: Array1<f64>,
    /// Candidate precision s²/θ for every basis (NaN when θ ≤ 0)
    alpha_candidate: Array1<f64>,
}

/// Sequential solver; the Gram source decides streaming vs in-memory
pub struct SequentialSolver {
    config: TrainConfig,
}

impl SequentialSolver {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Train on normalized Gram columns and ±1 labels
    pub fn solve(
        &self,
        gram: &mut dyn GramSource,
        labels: &[f64],
    ) -> Result<SequentialOutcome> {
        let n_basis = gram.n_basis();
        let mut warnings = Vec::new();
        if n_basis == 0 {
            warn!("candidate basis is empty; no relevant features");
            warnings.push(TrainWarning::NoRelevantFeatures);
            return Ok(Self::empty_outcome(0, warnings));
        }

        let y = Array1::from_iter(labels.iter().copied());
        let y01 = y.mapv(|v| (v + 1.0) / 2.0);

        // seed: the basis best correlated with the labels
        let mut seed = 0;
        let mut seed_score = f64::NEG_INFINITY;
        gram.for_each_block(&mut |start, block| {
            for (c, column) in block.axis_iter(Axis(1)).enumerate() {
                let score = column.dot(&y).abs();
                if score > seed_score {
                    seed_score = score;
                    seed = start + c;
                }
            }
        });

        // least squares against the logit of shrunken labels
        let shrunk = y.mapv(|v| logit((v * 0.9 + 1.0) / 2.0));
        let phi_seed = gram.column(seed);
        let mu_seed = phi_seed.dot(&shrunk) / phi_seed.dot(&phi_seed);
        let mut alpha_seed = 1.0 / (mu_seed * mu_seed);
        if !alpha_seed.is_finite() || alpha_seed <= 0.0 {
            alpha_seed = 1.0;
        }

        let mut active = ActiveSet::from_indices(vec![seed]);
        let mut alpha = Array1::from_elem(n_basis, f64::INFINITY);
        alpha[seed] = alpha_seed;

        let mut phi_active = phi_seed.insert_axis(Axis(1));
        let mut irls = penalized_irls(
            &y01,
            &phi_active,
            Array1::from_elem(1, mu_seed),
            &Array1::from_elem(1, alpha_seed),
        )?;
        let mut mu = irls.mu.clone();

        let mut beta = Array1::zeros(n_basis);
        beta[seed] = mu[0];

        let mut converged = false;
        let mut exit_reason = ExitReason::MaxIterations;
        let mut exit_value = 0.0;
        let mut last_measure = 0.0;
        let mut iterations = 0;
        let mut emptied = false;

        for it in 1..=self.config.max_iterations {
            iterations = it;
            let alpha_prev = alpha.clone();

            let (s_stats, q_stats) = sufficient_statistics(gram, &y01, &phi_active, &irls);
            let scores = score_moves(&s_stats, &q_stats, &alpha, &active);

            let (chosen, delta) = select_move(it, &scores);
            last_measure = delta;
            let chosen = match chosen {
                Some(chosen) if delta >= self.config.likelihood_increase_threshold => chosen,
                _ => {
                    converged = true;
                    exit_reason = ExitReason::NoGoodActions;
                    exit_value = delta;
                    break;
                }
            };
            if self.config.verbose {
                debug!("sequential iteration {it}: {chosen:?} with gain {delta:.3e}");
            }

            match chosen {
                Move::Add(j) => {
                    let alpha_new = scores.alpha_candidate[j];
                    let phi_j = gram.column(j);

                    // rank-1 warm start; IRLS below refines it
                    let sigma_jj = 1.0 / (alpha_new + s_stats[j]);
                    let mu_new = sigma_jj * q_stats[j];
                    let weighted = &phi_j * &irls.obs_noise_var;
                    let v = phi_active.t().dot(&weighted);
                    let shift = irls.hessian_chol.solve(&v).mapv(|t| t * mu_new);
                    mu -= &shift;

                    let pos = active.insert(j);
                    mu = insert_entry(&mu, pos, mu_new);
                    phi_active = insert_column(&phi_active, pos, &phi_j);
                    alpha[j] = alpha_new;
                }
                Move::Remove(j) => {
                    let pos = active.position(j).ok_or_else(|| {
                        RvmError::NumericalBreakdown(format!(
                            "remove move selected basis {j} outside the active set"
                        ))
                    })?;
                    let sigma_col = posterior_column(&irls.hessian_chol, pos);
                    let scale = mu[pos] / sigma_col[pos];
                    mu += &sigma_col.mapv(|v| v * scale);

                    active.remove(j);
                    mu = remove_entry(&mu, pos);
                    phi_active = remove_column(&phi_active, pos);
                    alpha[j] = f64::INFINITY;

                    if active.is_empty() {
                        warn!("last basis removed; no relevant features");
                        warnings.push(TrainWarning::NoRelevantFeatures);
                        exit_reason = ExitReason::NoRelevantFeatures;
                        exit_value = delta;
                        emptied = true;
                        break;
                    }
                }
                Move::Modify(j) => {
                    let pos = active.position(j).ok_or_else(|| {
                        RvmError::NumericalBreakdown(format!(
                            "re-estimate move selected basis {j} outside the active set"
                        ))
                    })?;
                    let alpha_new = scores.alpha_candidate[j];
                    let sigma_col = posterior_column(&irls.hessian_chol, pos);
                    let kappa = 1.0 / (sigma_col[pos] + 1.0 / (alpha_new - alpha[j]));
                    let scale = kappa * mu[pos];
                    mu -= &sigma_col.mapv(|v| v * scale);
                    alpha[j] = alpha_new;
                }
            }

            let alpha_active =
                Array1::from_iter(active.indices().iter().map(|&j| alpha[j]));
            irls = penalized_irls(&y01, &phi_active, mu.clone(), &alpha_active)?;
            mu = irls.mu.clone();

            beta.fill(0.0);
            for (pos, &j) in active.indices().iter().enumerate() {
                beta[j] = mu[pos];
            }

            let max_tau = max_log_alpha_change(&alpha, &alpha_prev);
            if max_tau.is_finite() {
                last_measure = max_tau;
            }
            if it > 1 && max_tau < self.config.beta_converged_tolerance {
                converged = true;
                exit_reason = ExitReason::AlphaNotChanging;
                exit_value = max_tau;
                break;
            }
        }

        if emptied {
            let mut outcome = Self::empty_outcome(n_basis, warnings);
            outcome.results = LearningResults {
                exit_reason,
                exit_value,
                iterations,
            };
            return Ok(outcome);
        }

        if !converged && exit_reason == ExitReason::MaxIterations {
            exit_value = last_measure;
        }

        // back to raw-kernel scale: column norms fold into the weights
        let norms =
            Array1::from_iter(active.indices().iter().map(|&j| gram.column_norm(j)));
        for (pos, value) in mu.iter_mut().enumerate() {
            *value /= norms[pos];
        }
        for (pos, &j) in active.indices().iter().enumerate() {
            beta[j] = mu[pos];
        }
        let mut sigma = irls.hessian_chol.inverse();
        for p in 0..sigma.nrows() {
            for q in 0..sigma.ncols() {
                sigma[(p, q)] /= norms[p] * norms[q];
            }
        }

        Ok(SequentialOutcome {
            mu,
            active,
            alpha,
            sigma,
            beta,
            converged,
            results: LearningResults {
                exit_reason,
                exit_value,
                iterations,
            },
            warnings,
        })
    }

    fn empty_outcome(n_basis: usize, warnings: Vec<TrainWarning>) -> SequentialOutcome {
        SequentialOutcome {
            mu: Array1::zeros(0),
            active: ActiveSet::new(),
            alpha: Array1::from_elem(n_basis, f64::INFINITY),
            sigma: Array2::zeros((0, 0)),
            beta: Array1::zeros(n_basis),
            converged: false,
            results: LearningResults {
                exit_reason: ExitReason::NoRelevantFeatures,
                exit_value: 0.0,
                iterations: 0,
            },
            warnings,
        }
    }
}

/// S and Q for every basis under the current Laplace approximation
fn sufficient_statistics(
    gram: &mut dyn GramSource,
    y01: &Array1<f64>,
    phi_active: &Array2<f64>,
    irls: &IrlsOutcome,
) -> (Array1<f64>, Array1<f64>) {
    let n_basis = gram.n_basis();
    let weights = &irls.obs_noise_var;
    let residual = y01 - &irls.y_hat;

    let mut weighted_active = phi_active.to_owned();
    for (mut row, &w) in weighted_active.outer_iter_mut().zip(weights.iter()) {
        row.mapv_inplace(|v| v * w);
    }

    let mut s_stats = Array1::zeros(n_basis);
    let mut q_stats = Array1::zeros(n_basis);
    gram.for_each_block(&mut |start, block| {
        for (c, column) in block.axis_iter(Axis(1)).enumerate() {
            let m = start + c;
            let mut quad = 0.0;
            for (i, &p) in column.iter().enumerate() {
                quad += weights[i] * p * p;
            }
            let v = weighted_active.t().dot(&column);
            let z = irls.hessian_chol.solve_lower(&v);
            s_stats[m] = quad - z.dot(&z);
            q_stats[m] = column.dot(&residual);
        }
    });
    (s_stats, q_stats)
}

/// Score every candidate move from S, Q, and the current precisions
fn score_moves(
    s_stats: &Array1<f64>,
    q_stats: &Array1<f64>,
    alpha: &Array1<f64>,
    active: &ActiveSet,
) -> MoveScores {
    let n_basis = alpha.len();
    let mut scores = MoveScores {
        add: (0.0, None),
        remove: (0.0, None),
        modify: (0.0, None),
        modify_all: Array1::zeros(n_basis),
        alpha_candidate: Array1::from_elem(n_basis, f64::NAN),
    };

    for m in 0..n_basis {
        let (s_big, q_big) = (s_stats[m], q_stats[m]);
        let is_active = active.contains(m);
        let (s_small, q_small) = if is_active {
            let denom = alpha[m] - s_big;
            (alpha[m] * s_big / denom, alpha[m] * q_big / denom)
        } else {
            (s_big, q_big)
        };
        let theta = q_small * q_small - s_small;
        if theta > 0.0 {
            scores.alpha_candidate[m] = s_small * s_small / theta;
        }

        if !is_active {
            if theta > 0.0 {
                let gain = 0.5 * (theta / s_big + (s_big / (q_big * q_big)).ln());
                if gain.is_finite() && gain > scores.add.0 {
                    scores.add = (gain, Some(m));
                }
            }
            continue;
        }

        // corrected removal form (the published one is off)
        let gain_remove = -0.5
            * (q_small * q_small / (s_small + alpha[m]) - (1.0 + s_small / alpha[m]).ln());
        if gain_remove.is_finite() && gain_remove > scores.remove.0 {
            scores.remove = (gain_remove, Some(m));
        }

        if theta > 0.0 {
            let alpha_new = scores.alpha_candidate[m];
            let delta_inv = 1.0 / alpha_new - 1.0 / alpha[m];
            let gain = 0.5
                * (delta_inv * q_big * q_big / (delta_inv * s_big + 1.0)
                    - (1.0 + s_big * delta_inv).ln());
            if gain.is_finite() {
                scores.modify_all[m] = gain;
                if gain > scores.modify.0 {
                    scores.modify = (gain, Some(m));
                }
            }
        }
    }
    scores
}

/// Pick the move for this iteration
///
/// Iteration 1 never removes. Afterwards, a positive removal gain narrows
/// the choice to removing or re-estimating that same basis, whichever
/// raises the likelihood more; otherwise the best of all three wins.
fn select_move(iteration: usize, scores: &MoveScores) -> (Option<Move>, f64) {
    if iteration == 1 {
        return if scores.add.0 >= scores.modify.0 {
            (scores.add.1.map(Move::Add), scores.add.0)
        } else {
            (scores.modify.1.map(Move::Modify), scores.modify.0)
        };
    }

    if scores.remove.0 > 0.0 {
        if let Some(jr) = scores.remove.1 {
            let modify_here = scores.modify_all[jr];
            return if modify_here > scores.remove.0 {
                (Some(Move::Modify(jr)), modify_here)
            } else {
                (Some(Move::Remove(jr)), scores.remove.0)
            };
        }
    }

    let mut best = (scores.add.1.map(Move::Add), scores.add.0);
    if scores.remove.0 > best.1 {
        best = (scores.remove.1.map(Move::Remove), scores.remove.0);
    }
    if scores.modify.0 > best.1 {
        best = (scores.modify.1.map(Move::Modify), scores.modify.0);
    }
    best
}

/// Largest |Δ log α| between two precision vectors; ∞ precisions on both
/// sides count as no change
fn max_log_alpha_change(alpha: &Array1<f64>, alpha_prev: &Array1<f64>) -> f64 {
    let mut max_tau = 0.0_f64;
    for (&a, &p) in alpha.iter().zip(alpha_prev.iter()) {
        let tau = if a.is_infinite() && p.is_infinite() {
            0.0
        } else if a.is_infinite() || p.is_infinite() {
            f64::INFINITY
        } else {
            (a.ln() - p.ln()).abs()
        };
        max_tau = max_tau.max(tau);
    }
    max_tau
}

/// Column `pos` of the posterior covariance, from the Hessian factor
fn posterior_column(chol: &Cholesky, pos: usize) -> Array1<f64> {
    let mut e = Array1::zeros(chol.dim());
    e[pos] = 1.0;
    chol.solve(&e)
}

fn insert_entry(v: &Array1<f64>, pos: usize, value: f64) -> Array1<f64> {
    let mut out = Vec::with_capacity(v.len() + 1);
    out.extend(v.iter().take(pos).copied());
    out.push(value);
    out.extend(v.iter().skip(pos).copied());
    Array1::from(out)
}

fn remove_entry(v: &Array1<f64>, pos: usize) -> Array1<f64> {
    v.iter()
        .enumerate()
        .filter(|&(i, _)| i != pos)
        .map(|(_, &value)| value)
        .collect()
}

fn insert_column(m: &Array2<f64>, pos: usize, column: &Array1<f64>) -> Array2<f64> {
    let (rows, cols) = m.dim();
    let mut out = Array2::zeros((rows, cols + 1));
    out.slice_mut(s![.., ..pos]).assign(&m.slice(s![.., ..pos]));
    out.column_mut(pos).assign(column);
    out.slice_mut(s![.., pos + 1..]).assign(&m.slice(s![.., pos..]));
    out
}

fn remove_column(m: &Array2<f64>, pos: usize) -> Array2<f64> {
    let (rows, cols) = m.dim();
    let mut out = Array2::zeros((rows, cols - 1));
    out.slice_mut(s![.., ..pos]).assign(&m.slice(s![.., ..pos]));
    out.slice_mut(s![.., pos..]).assign(&m.slice(s![.., pos + 1..]));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Dataset;
    use crate::data::MatrixDataset;
    use crate::kernel::{DcBias, KernelTemplate, RbfTemplate};
    use approx::assert_abs_diff_eq;
    use ndarray::arr2;

    fn toy_problem() -> (MatrixDataset, Vec<Box<dyn KernelInstance>>) {
        let dataset = MatrixDataset::new(
            arr2(&[[-2.0], [-1.5], [-1.0], [1.0], [1.5], [2.0]]),
            vec![-1.0, -1.0, -1.0, 1.0, 1.0, 1.0],
        )
        .unwrap();
        let mut kernels = DcBias::new().center(&dataset);
        kernels.extend(RbfTemplate::new(2.0).center(&dataset));
        (dataset, kernels)
    }

    fn raw_gram(dataset: &MatrixDataset, kernels: &[Box<dyn KernelInstance>]) -> Array2<f64> {
        GramBuilder::new().gram(dataset.observations(None).view(), kernels)
    }

    #[test]
    fn test_in_memory_gram_normalizes_columns() {
        let (dataset, kernels) = toy_problem();
        let mut gram = InMemoryGram::from_raw(raw_gram(&dataset, &kernels));

        for j in 0..gram.n_basis() {
            let column = gram.column(j);
            assert_abs_diff_eq!(column.dot(&column).sqrt(), 1.0, epsilon = 1e-12);
            assert!(gram.column_norm(j) > 0.0);
        }
    }

    #[test]
    fn test_streaming_gram_matches_in_memory() {
        let (dataset, kernels) = toy_problem();
        let mut in_memory = InMemoryGram::from_raw(raw_gram(&dataset, &kernels));
        let mut streaming = StreamingGram::new(dataset.observations(None), &kernels, 2);

        assert_eq!(in_memory.n_basis(), streaming.n_basis());
        for j in 0..in_memory.n_basis() {
            let a = in_memory.column(j);
            let b = streaming.column(j);
            assert_abs_diff_eq!(a, b, epsilon = 1e-12);
            assert_abs_diff_eq!(
                in_memory.column_norm(j),
                streaming.column_norm(j),
                epsilon = 1e-12
            );
        }

        // block traversal reassembles the same matrix
        let mut reassembled = Array2::zeros((dataset.n_observations(), streaming.n_basis()));
        streaming.for_each_block(&mut |start, block| {
            for (c, column) in block.axis_iter(Axis(1)).enumerate() {
                reassembled.column_mut(start + c).assign(&column);
            }
        });
        for j in 0..in_memory.n_basis() {
            assert_abs_diff_eq!(
                reassembled.column(j).to_owned(),
                in_memory.column(j),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_sequential_trains_toy_problem() {
        let (dataset, kernels) = toy_problem();
        let mut gram = InMemoryGram::from_raw(raw_gram(&dataset, &kernels));
        let outcome = SequentialSolver::new(TrainConfig::default())
            .solve(&mut gram, dataset.labels())
            .unwrap();

        assert!(outcome.converged);
        assert!(matches!(
            outcome.results.exit_reason,
            ExitReason::NoGoodActions | ExitReason::AlphaNotChanging
        ));
        assert!(!outcome.active.is_empty());
        assert_eq!(outcome.mu.len(), outcome.active.len());
        assert_eq!(outcome.sigma.nrows(), outcome.active.len());

        // precision/activity duality
        for j in 0..gram.n_basis() {
            assert_eq!(outcome.alpha[j].is_infinite(), !outcome.active.contains(j));
        }
        // full beta agrees with the compact weights
        for (pos, &j) in outcome.active.indices().iter().enumerate() {
            assert_eq!(outcome.beta[j], outcome.mu[pos]);
        }
    }

    #[test]
    fn test_sequential_posterior_is_symmetric() {
        let (dataset, kernels) = toy_problem();
        let mut gram = InMemoryGram::from_raw(raw_gram(&dataset, &kernels));
        let outcome = SequentialSolver::new(TrainConfig::default())
            .solve(&mut gram, dataset.labels())
            .unwrap();

        let k = outcome.sigma.nrows();
        for p in 0..k {
            assert!(outcome.sigma[(p, p)] > 0.0);
            for q in 0..p {
                assert_abs_diff_eq!(
                    outcome.sigma[(p, q)],
                    outcome.sigma[(q, p)],
                    epsilon = 1e-12
                );
            }
        }
    }

    #[test]
    fn test_sequential_streaming_equals_in_memory() {
        let (dataset, kernels) = toy_problem();
        let solver = SequentialSolver::new(TrainConfig::default());

        let mut in_memory = InMemoryGram::from_raw(raw_gram(&dataset, &kernels));
        let a = solver.solve(&mut in_memory, dataset.labels()).unwrap();

        let mut streaming = StreamingGram::new(dataset.observations(None), &kernels, 3);
        let b = solver.solve(&mut streaming, dataset.labels()).unwrap();

        assert_eq!(a.active.indices(), b.active.indices());
        assert_abs_diff_eq!(a.beta, b.beta, epsilon = 1e-10);
        assert_eq!(a.results.exit_reason, b.results.exit_reason);
    }

    #[test]
    fn test_sequential_is_deterministic() {
        let (dataset, kernels) = toy_problem();
        let solver = SequentialSolver::new(TrainConfig::default());

        let mut gram1 = InMemoryGram::from_raw(raw_gram(&dataset, &kernels));
        let first = solver.solve(&mut gram1, dataset.labels()).unwrap();
        let mut gram2 = InMemoryGram::from_raw(raw_gram(&dataset, &kernels));
        let second = solver.solve(&mut gram2, dataset.labels()).unwrap();

        assert_eq!(first.active.indices(), second.active.indices());
        assert_eq!(first.beta, second.beta);
    }

    #[test]
    fn test_sequential_empty_basis() {
        let kernels: Vec<Box<dyn KernelInstance>> = Vec::new();
        let mut gram = StreamingGram::new(Array2::zeros((2, 1)), &kernels, 4);
        let outcome = SequentialSolver::new(TrainConfig::default())
            .solve(&mut gram, &[1.0, -1.0])
            .unwrap();

        assert!(outcome.active.is_empty());
        assert_eq!(outcome.warnings, vec![TrainWarning::NoRelevantFeatures]);
    }

    #[test]
    fn test_max_iterations_still_emits_model() {
        let (dataset, kernels) = toy_problem();
        let mut config = TrainConfig::default();
        config.max_iterations = 2;
        let mut gram = InMemoryGram::from_raw(raw_gram(&dataset, &kernels));
        let outcome = SequentialSolver::new(config)
            .solve(&mut gram, dataset.labels())
            .unwrap();

        if !outcome.converged {
            assert_eq!(outcome.results.exit_reason, ExitReason::MaxIterations);
        }
        assert!(!outcome.active.is_empty());
        assert_eq!(outcome.mu.len(), outcome.active.len());
    }

    #[test]
    fn test_entry_and_column_edits() {
        let v = Array1::from(vec![1.0, 3.0]);
        assert_eq!(insert_entry(&v, 1, 2.0).to_vec(), vec![1.0, 2.0, 3.0]);
        assert_eq!(remove_entry(&v, 0).to_vec(), vec![3.0]);

        let m = arr2(&[[1.0, 3.0], [4.0, 6.0]]);
        let with_column = insert_column(&m, 1, &Array1::from(vec![2.0, 5.0]));
        assert_eq!(with_column, arr2(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]));
        assert_eq!(remove_column(&with_column, 1), m);
    }
}
