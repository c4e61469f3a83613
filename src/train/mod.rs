//! Fine-tuning of pruned models
//!
//! - [`CrossEntropyLoss`] - softmax cross-entropy with its logit gradient
//! - [`Finetuner`] - SGD + cosine schedule training loop that keeps the
//!   best validation weights

mod finetune;
mod loss;

pub use finetune::{EpochReport, FinetuneConfig, FinetuneResult, Finetuner};
pub use loss::CrossEntropyLoss;
