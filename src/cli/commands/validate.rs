//! Validate command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{load_config, PruneSpec, ValidateArgs};

/// Format model information as a string
pub fn format_model_info(spec: &PruneSpec) -> String {
    let mut lines = vec![format!("  Model path: {}", spec.model.display())];
    if let Some(output) = &spec.output {
        lines.push(format!("  Output: {}", output.display()));
    }
    lines.push(format!("  Bits per element: {}", spec.bits_per_element));
    lines.join("\n")
}

/// Format data configuration as a string
pub fn format_data_info(spec: &PruneSpec) -> String {
    let mut lines = Vec::new();
    if let Some(train) = &spec.data.train {
        lines.push(format!("  Training data: {}", train.display()));
    }
    lines.push(format!("  Test data: {}", spec.data.test.display()));
    lines.push(format!("  Eval batch size: {}", spec.data.batch_size));
    lines.join("\n")
}

/// Format pruning configuration as a string
pub fn format_prune_info(spec: &PruneSpec) -> String {
    format!(
        "  Prune ratio: {}\n  Importance norm: {}\n  Channel sorting: {}",
        spec.prune.ratio, spec.prune.norm, spec.prune.sort_channels
    )
}

/// Format fine-tuning configuration as a string
pub fn format_finetune_info(spec: &PruneSpec) -> Option<String> {
    spec.finetune.enabled.then(|| {
        let ft = &spec.finetune.params;
        [
            "  Fine-tuning:".to_string(),
            format!("    Epochs: {}", ft.epochs),
            format!("    Batch size: {}", ft.batch_size),
            format!("    Learning rate: {} -> {}", ft.lr, ft.lr_min),
            format!("    Momentum: {}", ft.momentum),
            format!("    Weight decay: {}", ft.weight_decay),
            format!("    Seed: {}", ft.seed),
        ]
        .join("\n")
    })
}

/// Print detailed configuration summary
pub fn print_detailed_summary(spec: &PruneSpec) {
    println!();
    println!("Configuration Summary:");
    println!("{}", format_model_info(spec));
    println!();
    println!("{}", format_data_info(spec));
    println!();
    println!("{}", format_prune_info(spec));

    if let Some(finetune_info) = format_finetune_info(spec) {
        println!();
        println!("{finetune_info}");
    }
}

pub fn run_validate(args: ValidateArgs, level: LogLevel) -> Result<(), String> {
    log(
        level,
        LogLevel::Normal,
        &format!("Validating config: {}", args.config.display()),
    );

    let spec = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;

    log(level, LogLevel::Normal, "Configuration is valid");

    if args.detailed {
        print_detailed_summary(&spec);
    }

    Ok(())
}
