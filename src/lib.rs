//! Podar: channel-wise structured pruning for convolutional classifiers
//!
//! Podar shrinks a pretrained VGG-style network by removing whole
//! channels between adjacent convolutions:
//!
//! - Channel importance is the L2 norm of the consumer conv's input-channel slice
//! - Channels are reordered by descending importance, then truncated
//! - Prune ratios are a scalar or one value per adjacent conv pair
//! - Pruned models can be fine-tuned with SGD and a cosine schedule
//! - Accuracy, loss, parameter count and storage size are reported
//!   before and after
//!
//! # Quick Start
//!
//! ```ignore
//! use podar::nn::{Model, VggConfig};
//! use podar::prune::{ChannelPruner, PruneRatio};
//!
//! let model = Model::vgg(&VggConfig::cifar_vgg(), 42)?;
//! let outcome = ChannelPruner::new().prune(&model, &PruneRatio::Uniform(0.5))?;
//! assert!(outcome.model.parameter_count() < model.parameter_count());
//! ```

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod eval;
pub mod io;
pub mod nn;
pub mod optim;
pub mod pipeline;
pub mod prune;
pub mod train;

pub use error::{Error, Result};
