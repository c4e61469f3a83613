//! Init command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::InitArgs;
use crate::eval::ModelSize;
use crate::io::save_model;
use crate::nn::{Model, VggConfig};

/// VGG configuration described by the init arguments
pub fn vgg_config(args: &InitArgs) -> Result<VggConfig, String> {
    let mut config = match &args.cfg {
        Some(layers) => VggConfig::parse(layers, args.in_channels, args.classes)
            .map_err(|e| format!("Invalid --cfg: {e}"))?,
        None => VggConfig::cifar_vgg(),
    };
    config.in_channels = args.in_channels;
    config.num_classes = args.classes;
    Ok(config)
}

pub fn run_init(args: InitArgs, level: LogLevel) -> Result<(), String> {
    let config = vgg_config(&args)?;
    let model = Model::vgg(&config, args.seed).map_err(|e| format!("Failed to build model: {e}"))?;
    save_model(&model, &args.output).map_err(|e| format!("Failed to save model: {e}"))?;

    log(
        level,
        LogLevel::Normal,
        &format!("Wrote {}", args.output.display()),
    );
    log(
        level,
        LogLevel::Normal,
        &format!(
            "  {} conv layers, {}",
            model.conv_indices().len(),
            ModelSize::of(&model, 32)
        ),
    );
    Ok(())
}
