//! Kernel templates, centered instances, and Gram construction

pub mod bias;
pub mod gram;
pub mod rbf;
pub mod traits;

pub use bias::{BiasInstance, DcBias};
pub use gram::GramBuilder;
pub use rbf::{RbfInstance, RbfTemplate};
pub use traits::{KernelInstance, KernelTemplate};
