//! Structured channel pruning
//!
//! Removes whole channels between adjacent convolutions so the pruned
//! network is genuinely smaller, not just sparse:
//!
//! 1. Score each channel by the norm of the consumer's input-channel slice
//! 2. Sort the pair's channels by descending importance
//! 3. Keep the first `round((1 - ratio) * channels)` channels
//!
//! # Example
//!
//! ```ignore
//! use podar::prune::{ChannelPruner, NormType, PruneRatio};
//!
//! let outcome = ChannelPruner::new()
//!     .with_norm(NormType::L2)
//!     .prune(&model, &PruneRatio::Uniform(0.5))?;
//! println!("removed {} channels", outcome.removed_channels());
//! ```

mod importance;
mod pair;
mod pruner;
mod ratio;
mod sort;
mod truncate;

#[cfg(test)]
mod tests;

pub use importance::{
    channel_importance, sort_permutation, top_k_channels, ImportanceStats, NormType,
};
pub use pair::ConvPair;
pub use pruner::{ChannelPruner, PairImportance, PairReport, PruneOutcome};
pub use ratio::{checked_keep_count, keep_count, PruneRatio};
pub use sort::{apply_channel_sorting, sort_pair};
pub use truncate::truncate_pair;
