//! Model and dataset tooling commands

use clap::Parser;
use std::path::PathBuf;

use super::types::{ImageSize, OutputFormat};

/// Arguments for the inspect command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct InspectArgs {
    /// Model file (SafeTensors)
    #[arg(value_name = "MODEL")]
    pub model: PathBuf,

    /// Storage width used for the size estimate
    #[arg(long, default_value = "32")]
    pub bits: u32,

    /// Show per-pair channel importance statistics
    #[arg(short, long)]
    pub importance: bool,

    /// Output format (text, json, yaml)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the synth command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct SynthArgs {
    /// Output dataset path (SafeTensors)
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Number of samples
    #[arg(long, default_value = "256")]
    pub samples: usize,

    /// Number of classes
    #[arg(long, default_value = "10")]
    pub classes: usize,

    /// Image channels
    #[arg(long, default_value = "3")]
    pub channels: usize,

    /// Image size as HxW
    #[arg(long, default_value = "16x16")]
    pub size: ImageSize,

    /// Half-width of the uniform pixel noise
    #[arg(long, default_value = "0.3")]
    pub noise: f32,

    /// Random seed
    #[arg(long, default_value = "42")]
    pub seed: u64,
}
