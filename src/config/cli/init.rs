//! Init command types

use clap::Parser;
use std::path::PathBuf;

/// Arguments for the init command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct InitArgs {
    /// Output model path (SafeTensors)
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// VGG layer list, e.g. `64,M,128,M` (defaults to the CIFAR VGG)
    #[arg(long)]
    pub cfg: Option<String>,

    /// Input image channels
    #[arg(long, default_value = "3")]
    pub in_channels: usize,

    /// Number of classes
    #[arg(long, default_value = "10")]
    pub classes: usize,

    /// Initialization seed
    #[arg(long, default_value = "42")]
    pub seed: u64,
}
