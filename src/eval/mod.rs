//! Accuracy, loss and storage evaluation
//!
//! - [`Evaluator`] - batched accuracy / cross-entropy over a dataset
//! - [`ConfusionMatrix`] - per-class breakdown of predictions
//! - [`ModelSize`] - parameter count and storage footprint
//! - [`sensitivity_scan`] - accuracy after uniform pruning at several ratios

mod confusion;
mod evaluator;
mod sensitivity;
mod size;

pub use confusion::ConfusionMatrix;
pub use evaluator::{argmax_rows, EvalResult, Evaluator};
pub use sensitivity::{sensitivity_scan, SensitivityPoint};
pub use size::ModelSize;
