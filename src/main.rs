//! Podar CLI
//!
//! Channel pruning entry point for the podar library.
//!
//! # Usage
//!
//! ```bash
//! # Make a model and data to play with
//! podar init model.safetensors --cfg 32,M,64,M,128
//! podar synth train.safetensors --samples 1024 --seed 1
//! podar synth test.safetensors --samples 256 --seed 2
//!
//! # Prune and fine-tune from config
//! podar prune prune.yaml
//!
//! # Prune with overrides
//! podar prune prune.yaml --ratio 0.2,0.5 --no-finetune --format json
//!
//! # Accuracy across ratios
//! podar scan prune.yaml --ratios 0,0.3,0.6,0.9
//! ```

use clap::Parser;
use podar::cli::{run_command, Cli};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
