//! Inspect command implementation

use super::report::print_structured;
use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::InspectArgs;
use crate::eval::ModelSize;
use crate::io::load_model;
use crate::nn::{Architecture, LayerSpec, Model};
use crate::prune::{ChannelPruner, ConvPair, PairImportance};
use serde::Serialize;

/// Everything `inspect` reports about a model
#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub architecture: Architecture,
    pub size: ModelSize,
    pub prunable_pairs: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub importance: Vec<PairImportance>,
}

impl InspectReport {
    pub fn build(model: &Model, bits: u32, importance: bool) -> Result<Self, String> {
        let importance = if importance {
            ChannelPruner::new()
                .importance(model)
                .map_err(|e| format!("Importance error: {e}"))?
        } else {
            Vec::new()
        };
        Ok(Self {
            architecture: model.architecture(),
            size: ModelSize::of(model, bits),
            prunable_pairs: ConvPair::all(model).len(),
            importance,
        })
    }
}

/// One line per feature layer
pub fn format_layers(architecture: &Architecture) -> Vec<String> {
    let mut lines: Vec<String> = architecture
        .features
        .iter()
        .enumerate()
        .map(|(i, layer)| match layer {
            LayerSpec::Conv2d {
                in_channels,
                out_channels,
                kernel_size: (kh, kw),
                ..
            } => format!("  features.{i}: Conv2d {in_channels} -> {out_channels} ({kh}x{kw})"),
            LayerSpec::BatchNorm2d { num_features, .. } => {
                format!("  features.{i}: BatchNorm2d {num_features}")
            }
            LayerSpec::Relu => format!("  features.{i}: ReLU"),
            LayerSpec::MaxPool2d {
                kernel_size,
                stride,
            } => format!("  features.{i}: MaxPool2d {kernel_size}/{stride}"),
        })
        .collect();
    lines.push(format!(
        "  classifier: Linear {} -> {}",
        architecture.classifier.in_features, architecture.classifier.out_features
    ));
    lines
}

pub fn run_inspect(args: InspectArgs, level: LogLevel) -> Result<(), String> {
    if args.bits == 0 || args.bits > 64 {
        return Err(format!("Invalid bits per element: {} (must be in 1..=64)", args.bits));
    }
    let model = load_model(&args.model).map_err(|e| format!("Failed to load model: {e}"))?;
    let report = InspectReport::build(&model, args.bits, args.importance)?;

    if print_structured(&report, args.format)? {
        return Ok(());
    }

    log(level, LogLevel::Normal, "Model Information:");
    log(level, LogLevel::Normal, &format!("  Size: {}", report.size));
    log(
        level,
        LogLevel::Normal,
        &format!("  Prunable conv pairs: {}", report.prunable_pairs),
    );
    log(level, LogLevel::Verbose, "\nLayers:");
    for line in format_layers(&report.architecture) {
        log(level, LogLevel::Verbose, &line);
    }
    if !report.importance.is_empty() {
        log(level, LogLevel::Normal, "\nChannel importance (L2):");
        for entry in &report.importance {
            log(
                level,
                LogLevel::Normal,
                &format!(
                    "  features.{} -> features.{}: {} channels, min {:.4}, mean {:.4}, max {:.4}",
                    entry.pair.producer,
                    entry.pair.consumer,
                    entry.stats.channels,
                    entry.stats.min,
                    entry.stats.mean,
                    entry.stats.max
                ),
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::VggConfig;

    fn model() -> Model {
        Model::vgg(&VggConfig::parse("4,M,6,8", 3, 5).unwrap(), 1).unwrap()
    }

    #[test]
    fn test_report_without_importance() {
        let report = InspectReport::build(&model(), 32, false).unwrap();
        assert_eq!(report.prunable_pairs, 2);
        assert!(report.importance.is_empty());
        assert_eq!(report.size.parameters, model().parameter_count());
    }

    #[test]
    fn test_report_with_importance() {
        let report = InspectReport::build(&model(), 8, true).unwrap();
        assert_eq!(report.importance.len(), 2);
        assert_eq!(report.importance[0].stats.channels, 4);
        assert_eq!(report.importance[1].stats.channels, 6);
        assert!(report.importance.iter().all(|p| p.stats.min <= p.stats.max));
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"importance\""));
    }

    #[test]
    fn test_format_layers() {
        let lines = format_layers(&model().architecture());
        assert_eq!(lines[0], "  features.0: Conv2d 3 -> 4 (3x3)");
        assert!(lines.iter().any(|l| l.contains("MaxPool2d 2/2")));
        assert_eq!(lines.last().unwrap(), "  classifier: Linear 8 -> 5");
    }
}
