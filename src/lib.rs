//! Rust implementation of the Relevance Vector Machine (RVM)
//!
//! Based on "Sparse Bayesian Learning and the Relevance Vector Machine" by
//! Michael Tipping and the fast marginal-likelihood maximization of Tipping
//! and Faul, with a probit-linked binary classifier on top.

pub mod api;
pub mod cache;
pub mod core;
pub mod data;
pub mod kernel;
pub mod linalg;
pub mod solver;
pub mod trainer;
pub mod utils;

// Re-export main types
pub use crate::api::Rvm;
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::data::MatrixDataset;
pub use crate::kernel::{DcBias, RbfTemplate};
pub use crate::trainer::TrainedRvm;

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
