//! RBF (Radial Basis Function) kernel
//!
//! Centering the template places one basis function at every training
//! point: φ_i(x) = exp(−‖x − c_i‖² / σ_eff²). With dimension scaling, the
//! effective width grows with the feature count (σ_eff = σ·√D), which keeps
//! kernel values in a useful range as dimensionality changes.

use crate::core::Dataset;
use crate::kernel::{KernelInstance, KernelTemplate};
use ndarray::{Array1, ArrayView2};

/// RBF basis template, one basis per training point
#[derive(Debug, Clone, Copy)]
pub struct RbfTemplate {
    sigma: f64,
    scale_by_dim: bool,
}

impl RbfTemplate {
    /// RBF template with a fixed width σ
    ///
    /// # Panics
    /// Panics if sigma is not positive
    pub fn new(sigma: f64) -> Self {
        assert!(sigma > 0.0, "Sigma must be positive, got: {}", sigma);
        Self {
            sigma,
            scale_by_dim: false,
        }
    }

    /// RBF template whose effective width is σ·√D for a D-feature dataset
    ///
    /// This is the default basis template.
    pub fn scaled_by_sqrt_dim() -> Self {
        Self {
            sigma: 1.0,
            scale_by_dim: true,
        }
    }

    /// Dimension-scaled template with a base width other than 1
    pub fn scaled_by_sqrt_dim_with_sigma(sigma: f64) -> Self {
        assert!(sigma > 0.0, "Sigma must be positive, got: {}", sigma);
        Self {
            sigma,
            scale_by_dim: true,
        }
    }

    /// The base width σ
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    fn effective_sigma(&self, n_features: usize) -> f64 {
        if self.scale_by_dim {
            self.sigma * (n_features.max(1) as f64).sqrt()
        } else {
            self.sigma
        }
    }
}

impl Default for RbfTemplate {
    fn default() -> Self {
        Self::scaled_by_sqrt_dim()
    }
}

impl KernelTemplate for RbfTemplate {
    fn center(&self, dataset: &dyn Dataset) -> Vec<Box<dyn KernelInstance>> {
        let sigma = self.effective_sigma(dataset.n_features());
        let gamma = 1.0 / (sigma * sigma);
        let observations = dataset.observations(None);
        observations
            .outer_iter()
            .map(|row| {
                Box::new(RbfInstance {
                    center: row.to_owned(),
                    gamma,
                }) as Box<dyn KernelInstance>
            })
            .collect()
    }
}

/// RBF basis centered at one training point
#[derive(Debug, Clone)]
pub struct RbfInstance {
    center: Array1<f64>,
    gamma: f64,
}

impl RbfInstance {
    /// Center of this basis function
    pub fn center(&self) -> &Array1<f64> {
        &self.center
    }

    /// The precision γ = 1/σ_eff²
    pub fn gamma(&self) -> f64 {
        self.gamma
    }
}

impl KernelInstance for RbfInstance {
    fn evaluate(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        x.outer_iter()
            .map(|row| {
                let dist_sq = row
                    .iter()
                    .zip(self.center.iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f64>();
                (-self.gamma * dist_sq).exp()
            })
            .collect()
    }

    fn clone_box(&self) -> Box<dyn KernelInstance> {
        Box::new(self.clone())
    }
}
