//! Labeled image datasets and mini-batch loading

mod dataset;
mod loader;

pub use dataset::{Dataset, SyntheticConfig};
pub use loader::{Batch, DataLoader};
