//! Utility functions shared by the trainers

/// Link and special functions
pub mod links {
    use statrs::function::erf;

    /// Fitted probabilities are kept inside (0, 1) by this margin so IRLS
    /// weights stay strictly positive.
    pub const PROB_EPS: f64 = 1e-12;

    /// Standard normal probability density φ(x)
    pub fn normal_pdf(x: f64) -> f64 {
        const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;
        INV_SQRT_2PI * (-0.5 * x * x).exp()
    }

    /// Standard normal CDF Φ(x), the probit link
    pub fn normal_cdf(x: f64) -> f64 {
        0.5 * erf::erfc(-x / std::f64::consts::SQRT_2)
    }

    /// Logistic sigmoid σ(x) = 1 / (1 + e^{-x}), evaluated without overflow
    pub fn sigmoid(x: f64) -> f64 {
        if x >= 0.0 {
            1.0 / (1.0 + (-x).exp())
        } else {
            let e = x.exp();
            e / (1.0 + e)
        }
    }

    /// Inverse of the sigmoid: logit(p) = ln(p / (1 − p))
    pub fn logit(p: f64) -> f64 {
        (p / (1.0 - p)).ln()
    }

    /// Inverse Mills ratio φ(x)/Φ(x)
    ///
    /// For x far in the left tail Φ underflows; there the ratio approaches
    /// −x, which is returned directly.
    pub fn inverse_mills(x: f64) -> f64 {
        if x < -30.0 {
            return -x;
        }
        normal_pdf(x) / normal_cdf(x)
    }

    /// Clamp a probability into [PROB_EPS, 1 − PROB_EPS]
    pub fn clamp_probability(p: f64) -> f64 {
        p.clamp(PROB_EPS, 1.0 - PROB_EPS)
    }
}

/// Input validation helpers
pub mod validation {
    use crate::core::{Dataset, Result, RvmError};

    /// Reject any label outside {−1, +1}
    ///
    /// Runs before any training allocation so that structural input errors
    /// surface immediately.
    pub fn validate_binary_labels<D: Dataset + ?Sized>(dataset: &D) -> Result<()> {
        for (i, &y) in dataset.labels().iter().enumerate() {
            if y != 1.0 && y != -1.0 {
                return Err(RvmError::NonBinaryInput(format!(
                    "label {y} at index {i}: labels must be +1 or -1"
                )));
            }
        }
        Ok(())
    }
}
