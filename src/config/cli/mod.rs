//! CLI argument parsing
//!
//! # Usage
//!
//! ```bash
//! podar prune prune.yaml
//! podar prune prune.yaml --ratio 0.3,0.5,0.7 --no-finetune
//! podar validate prune.yaml
//! podar inspect model.safetensors --importance
//! podar scan prune.yaml --ratios 0,0.25,0.5,0.75
//! podar init model.safetensors --cfg 64,M,128,M
//! podar synth train.safetensors --samples 512
//! ```

mod core;
mod extended;
mod init;
mod types;


pub use core::{apply_overrides, parse_args, Cli, Command, PruneArgs, ScanArgs, ValidateArgs};
pub use extended::{InspectArgs, SynthArgs};
pub use init::InitArgs;
pub use types::{ImageSize, OutputFormat};
