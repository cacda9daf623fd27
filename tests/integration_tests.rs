//! Integration tests for the rrvm library
//!
//! These tests verify end-to-end behavior across modules on synthetic
//! datasets: the two training algorithm families, their convergence
//! bookkeeping, the warning policy, and the scoring surface.

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rrvm::api::Rvm;
use rrvm::core::{Algorithm, Dataset, ExitReason, RvmError, TrainWarning};
use rrvm::data::MatrixDataset;

/// Standard normal draw via Box-Muller, driven by a seeded RNG
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Two unit-covariance 2-D clusters of `per_class` points each, centered at
/// (−offset, 0) and (+offset, 0)
fn gaussian_clusters(seed: u64, per_class: usize, offset: f64) -> MatrixDataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = 2 * per_class;
    let mut observations = Array2::zeros((n, 2));
    let mut labels = Vec::with_capacity(n);
    for i in 0..n {
        let center = if i < per_class { -offset } else { offset };
        observations[(i, 0)] = center + standard_normal(&mut rng);
        observations[(i, 1)] = standard_normal(&mut rng);
        labels.push(if i < per_class { -1.0 } else { 1.0 });
    }
    MatrixDataset::new(observations, labels).expect("cluster data is well-formed")
}

/// Scenario 1: linearly separable Gaussians, Figueiredo
#[test]
fn test_separable_gaussians_figueiredo() {
    let dataset = gaussian_clusters(42, 100, 2.0);

    let model = Rvm::new()
        .with_algorithm(Algorithm::Figueiredo)
        .train(&dataset)
        .expect("training should succeed");

    assert!(model.converged(), "Figueiredo should converge on easy data");
    assert!(
        model.n_relevant() <= 20,
        "expected a sparse model, got {} relevant bases",
        model.n_relevant()
    );
    let accuracy = model.evaluate(&dataset);
    assert!(
        accuracy >= 0.98,
        "train accuracy should be at least 98%, got {accuracy}"
    );
}

/// Scenario 2: unimodal clusters, streaming Sequential
#[test]
fn test_unimodal_sequential_converges() {
    let dataset = gaussian_clusters(7, 100, 1.5);

    let model = Rvm::new()
        .with_algorithm(Algorithm::Sequential)
        .with_max_iterations(100)
        .with_block_size(64)
        .train(&dataset)
        .expect("training should succeed");

    assert!(model.converged(), "Sequential should converge within 100 iterations");
    assert!(matches!(
        model.results().exit_reason,
        ExitReason::NoGoodActions | ExitReason::AlphaNotChanging
    ));
    assert!(
        model.n_relevant() <= 20,
        "expected at most 20 relevant bases, got {}",
        model.n_relevant()
    );
    assert!(model.evaluate(&dataset) >= 0.8);
    // Sequential exposes the posterior covariance over the active weights
    let sigma = model.sigma().expect("posterior covariance is available");
    assert_eq!(sigma.nrows(), model.n_relevant());
    for p in 0..sigma.nrows() {
        assert!(sigma[(p, p)] > 0.0, "posterior variances must be positive");
    }
}

/// The streaming and in-memory Sequential variants agree
#[test]
fn test_streaming_matches_in_memory() {
    let dataset = gaussian_clusters(11, 30, 1.5);

    let streaming = Rvm::new()
        .with_algorithm(Algorithm::Sequential)
        .with_block_size(13)
        .train(&dataset)
        .expect("streaming training should succeed");
    let in_memory = Rvm::new()
        .with_algorithm(Algorithm::SequentialInMemory)
        .train(&dataset)
        .expect("in-memory training should succeed");

    assert_eq!(streaming.selected_indices(), in_memory.selected_indices());
    assert_eq!(
        streaming.results().exit_reason,
        in_memory.results().exit_reason
    );
    for (a, b) in streaming
        .sparse_beta()
        .iter()
        .zip(in_memory.sparse_beta().iter())
    {
        assert!((a - b).abs() < 1e-8, "weights should agree: {a} vs {b}");
    }
}

/// Scenario 3: degenerate single-point class
#[test]
fn test_single_point_class() {
    let rows: Vec<Vec<f64>> = vec![
        vec![-5.0],
        vec![-4.0],
        vec![-3.0],
        vec![-2.0],
        vec![0.0], // the lone positive
        vec![2.0],
        vec![3.0],
        vec![4.0],
        vec![5.0],
        vec![6.0],
    ];
    let labels = vec![-1.0, -1.0, -1.0, -1.0, 1.0, -1.0, -1.0, -1.0, -1.0, -1.0];
    let dataset = MatrixDataset::from_rows(&rows, labels).unwrap();

    let model = Rvm::new()
        .with_algorithm(Algorithm::Figueiredo)
        .train(&dataset)
        .expect("training should complete on degenerate data");

    let scores = model.predict_proba(dataset.observations(None).view());
    assert!(
        scores[4] > 0.5,
        "the lone positive sample should score above 0.5, got {}",
        scores[4]
    );

    // the Sequential variant also completes here
    Rvm::new()
        .with_algorithm(Algorithm::SequentialInMemory)
        .train(&dataset)
        .expect("Sequential training should complete on degenerate data");
}

/// Scenario 4: all observations identical makes the Gram product singular
#[test]
fn test_ill_conditioned_gram_warns_once() {
    let rows: Vec<Vec<f64>> = (0..10).map(|_| vec![1.0, 1.0]).collect();
    let labels = vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, -1.0, -1.0, -1.0, -1.0];
    let dataset = MatrixDataset::from_rows(&rows, labels).unwrap();

    let model = Rvm::new()
        .with_algorithm(Algorithm::Figueiredo)
        .train(&dataset)
        .expect("training should survive an ill-conditioned Gram");

    let count = model
        .warnings()
        .iter()
        .filter(|&&w| w == TrainWarning::IllConditionedGram)
        .count();
    assert_eq!(count, 1, "the regularization warning fires exactly once");
}

/// Scenario 5: the iteration cap still yields a usable sparse model
#[test]
fn test_max_iterations_cap_emits_model() {
    let dataset = gaussian_clusters(42, 100, 2.0);

    let model = Rvm::new()
        .with_algorithm(Algorithm::Figueiredo)
        .with_max_iterations(2)
        .train(&dataset)
        .expect("training should succeed");

    assert!(!model.converged());
    assert_eq!(model.results().exit_reason, ExitReason::MaxIterations);
    assert_eq!(model.results().iterations, 2);
    assert!(model.n_relevant() > 0, "sparse representation is still emitted");
    assert_eq!(model.sparse_beta().len(), model.n_relevant());

    // scoring works on the partial model
    let scores = model.predict_proba(dataset.observations(None).view());
    assert!(scores.iter().all(|s| s.is_finite()));
}

/// Scenario 6: invalid algorithm names are rejected up front
#[test]
fn test_invalid_algorithm_rejected() {
    let result = Rvm::new().with_algorithm_name("Bogus");
    match result {
        Err(RvmError::InvalidAlgorithm(name)) => assert_eq!(name, "Bogus"),
        other => panic!("expected InvalidAlgorithm, got {other:?}"),
    }

    assert!("NotAnAlgorithm".parse::<Algorithm>().is_err());
}

/// Non-binary labels fail before any computation
#[test]
fn test_non_binary_labels_rejected() {
    let dataset =
        MatrixDataset::from_rows(&[vec![1.0], vec![2.0], vec![3.0]], vec![1.0, 2.0, 3.0]).unwrap();

    for algorithm in [
        Algorithm::Figueiredo,
        Algorithm::Sequential,
        Algorithm::SequentialInMemory,
    ] {
        let result = Rvm::new().with_algorithm(algorithm).train(&dataset);
        assert!(
            matches!(result, Err(RvmError::NonBinaryInput(_))),
            "{algorithm} should reject non-binary labels"
        );
    }
}

/// Training is deterministic: same data, same model
#[test]
fn test_training_is_reproducible() {
    let dataset = gaussian_clusters(3, 40, 2.0);

    for algorithm in [Algorithm::Figueiredo, Algorithm::SequentialInMemory] {
        let first = Rvm::new().with_algorithm(algorithm).train(&dataset).unwrap();
        let second = Rvm::new().with_algorithm(algorithm).train(&dataset).unwrap();

        assert_eq!(first.selected_indices(), second.selected_indices());
        assert_eq!(first.sparse_beta(), second.sparse_beta());

        // predicting twice gives identical outputs
        let x = dataset.observations(None);
        let scores_a = first.predict_proba(x.view());
        let scores_b = first.predict_proba(x.view());
        assert_eq!(scores_a, scores_b);
    }
}

/// A single observation trains and scores without panicking
#[test]
fn test_single_observation() {
    let dataset = MatrixDataset::from_rows(&[vec![1.0, 2.0]], vec![1.0]).unwrap();

    for algorithm in [Algorithm::Figueiredo, Algorithm::SequentialInMemory] {
        let model = Rvm::new()
            .with_algorithm(algorithm)
            .train(&dataset)
            .unwrap_or_else(|e| panic!("{algorithm} should handle N=1, got {e}"));
        let scores = model.predict_proba(dataset.observations(None).view());
        assert_eq!(scores.len(), 1);
    }
}

/// Empty candidate basis: warning plus NaN predictions
#[test]
fn test_empty_candidate_basis() {
    let dataset = gaussian_clusters(5, 10, 2.0);

    let model = Rvm::new()
        .with_kernels(Vec::new())
        .train(&dataset)
        .expect("training with no candidates completes");

    assert_eq!(model.n_relevant(), 0);
    assert!(model.warnings().contains(&TrainWarning::NoRelevantFeatures));
    let scores = model.predict_proba(dataset.observations(None).view());
    assert!(scores.iter().all(|s| s.is_nan()));
    let labels = model.predict(dataset.observations(None).view());
    assert!(labels.iter().all(|l| l.is_nan()));
}

/// Hard labels agree with thresholding the probability scores
#[test]
fn test_predict_consistent_with_proba() {
    let dataset = gaussian_clusters(9, 50, 2.0);
    let model = Rvm::new()
        .with_algorithm(Algorithm::SequentialInMemory)
        .train(&dataset)
        .unwrap();

    let x = dataset.observations(None);
    let probabilities = model.predict_proba(x.view());
    let labels = model.predict(x.view());
    for (&p, &l) in probabilities.iter().zip(labels.iter()) {
        if p >= 0.5 {
            assert_eq!(l, 1.0);
        } else {
            assert_eq!(l, -1.0);
        }
    }
}
