//! Core types, traits, and error definitions

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Result, RvmError};
pub use traits::Dataset;
pub use types::{Algorithm, ExitReason, LearningResults, TrainConfig, TrainWarning};
