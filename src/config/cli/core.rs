//! Core CLI types - Cli, Command, and the pruning argument structs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::extended::{InspectArgs, SynthArgs};
use super::init::InitArgs;
use super::types::OutputFormat;
use crate::config::PruneSpec;
use crate::prune::{NormType, PruneRatio};

/// Podar: channel-wise structured pruning for convolutional classifiers
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "podar")]
#[command(version)]
#[command(
    about = "Prune conv channels by L2 importance, fine-tune, and report accuracy and model size"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Prune (and optionally fine-tune) a model from YAML configuration
    Prune(PruneArgs),

    /// Validate a configuration file without pruning
    Validate(ValidateArgs),

    /// Show layer widths, size and channel importance of a model
    Inspect(InspectArgs),

    /// Evaluate accuracy over a range of prune ratios
    Scan(ScanArgs),

    /// Write a freshly initialized VGG-style model
    Init(InitArgs),

    /// Write a synthetic image classification dataset
    Synth(SynthArgs),
}

/// Arguments for the prune command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct PruneArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Override the prune ratio (`0.5` or `0.3,0.5,0.7`)
    #[arg(short, long)]
    pub ratio: Option<PruneRatio>,

    /// Override the importance norm (l1, l2)
    #[arg(long)]
    pub norm: Option<NormType>,

    /// Override the output model path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Skip fine-tuning even if the config enables it
    #[arg(long)]
    pub no_finetune: bool,

    /// Override number of fine-tuning epochs
    #[arg(short, long)]
    pub epochs: Option<usize>,

    /// Override fine-tuning learning rate
    #[arg(short, long)]
    pub lr: Option<f32>,

    /// Override fine-tuning seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Report format (text, json, yaml)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the validate command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ValidateArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Show detailed validation report
    #[arg(short, long)]
    pub detailed: bool,
}

/// Arguments for the scan command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ScanArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Uniform ratios to evaluate (comma-separated)
    #[arg(long, default_value = "0.0,0.1,0.2,0.3,0.4,0.5,0.6,0.7,0.8,0.9")]
    pub ratios: String,

    /// Report format (text, json, yaml)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

impl ScanArgs {
    /// Parse the `--ratios` list
    pub fn ratio_list(&self) -> Result<Vec<f64>, String> {
        self.ratios
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                s.trim()
                    .parse::<f64>()
                    .map_err(|e| format!("Invalid ratio '{}': {e}", s.trim()))
            })
            .collect()
    }
}

/// Parse CLI arguments from a string slice (for testing)
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

/// Apply command-line overrides to a PruneSpec
pub fn apply_overrides(spec: &mut PruneSpec, args: &PruneArgs) {
    if let Some(ratio) = &args.ratio {
        spec.prune.ratio = ratio.clone();
    }
    if let Some(norm) = args.norm {
        spec.prune.norm = norm;
    }
    if let Some(output) = &args.output {
        spec.output = Some(output.clone());
    }
    if args.no_finetune {
        spec.finetune.enabled = false;
    }
    if let Some(epochs) = args.epochs {
        spec.finetune.params.epochs = epochs;
    }
    if let Some(lr) = args.lr {
        spec.finetune.params.lr = lr;
    }
    if let Some(seed) = args.seed {
        spec.finetune.params.seed = seed;
    }
}
