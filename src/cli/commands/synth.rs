//! Synth command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::SynthArgs;
use crate::data::{Dataset, SyntheticConfig};
use crate::io::save_dataset;

/// Generator settings described by the synth arguments
pub fn synthetic_config(args: &SynthArgs) -> SyntheticConfig {
    SyntheticConfig {
        samples: args.samples,
        classes: args.classes,
        channels: args.channels,
        height: args.size.height,
        width: args.size.width,
        noise: args.noise,
        seed: args.seed,
    }
}

pub fn run_synth(args: SynthArgs, level: LogLevel) -> Result<(), String> {
    let config = synthetic_config(&args);
    let dataset =
        Dataset::synthetic(&config).map_err(|e| format!("Failed to generate dataset: {e}"))?;
    save_dataset(&dataset, &args.output).map_err(|e| format!("Failed to save dataset: {e}"))?;

    log(
        level,
        LogLevel::Normal,
        &format!(
            "Wrote {} samples ({} classes, {}x{}x{}) to {}",
            dataset.len(),
            dataset.num_classes(),
            config.channels,
            config.height,
            config.width,
            args.output.display()
        ),
    );
    Ok(())
}
