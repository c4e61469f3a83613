//! Prune command implementation

use super::report::{pct, print_structured};
use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{apply_overrides, load_config, validate_config, PruneArgs, PruneSpec};
use crate::io::{load_dataset, load_model, save_model};
use crate::pipeline::{PipelineEvent, PruneFinetunePipeline, PruningMetrics};

/// One-line description of a pipeline event, if it is shown at `level`
pub fn format_event(event: &PipelineEvent) -> Option<(LogLevel, String)> {
    match event {
        PipelineEvent::StageStarted(stage) => Some((LogLevel::Verbose, format!("» {stage}"))),
        PipelineEvent::Evaluated {
            phase,
            result,
            size,
        } => Some((
            LogLevel::Normal,
            format!(
                "  {} accuracy: {:.2}% (loss {:.4}), {size}",
                phase.display_name(),
                result.accuracy_pct(),
                result.loss
            ),
        )),
        PipelineEvent::ImportanceComputed(pairs) => {
            let lines: Vec<String> = pairs
                .iter()
                .map(|p| {
                    format!(
                        "  pair {} importance: {} channels, min {:.4}, mean {:.4}, max {:.4}",
                        p.index, p.stats.channels, p.stats.min, p.stats.mean, p.stats.max
                    )
                })
                .collect();
            Some((LogLevel::Verbose, lines.join("\n")))
        }
        PipelineEvent::Planned(pairs) => {
            let lines: Vec<String> = pairs
                .iter()
                .map(|p| {
                    format!(
                        "  pair {} (features.{} -> features.{}): keep {}/{} at ratio {}",
                        p.index,
                        p.pair.producer,
                        p.pair.consumer,
                        p.kept_channels,
                        p.original_channels,
                        p.ratio
                    )
                })
                .collect();
            Some((LogLevel::Verbose, lines.join("\n")))
        }
        PipelineEvent::Pruned(pairs) => {
            let removed: usize = pairs.iter().map(|p| p.removed_channels()).sum();
            Some((
                LogLevel::Normal,
                format!("  Removed {removed} channels across {} pairs", pairs.len()),
            ))
        }
        PipelineEvent::EpochFinished(epoch) => Some((
            LogLevel::Normal,
            format!(
                "  Epoch {}: loss {:.4}, val accuracy {:.2}%, lr {:.5}",
                epoch.epoch + 1,
                epoch.train_loss,
                epoch.val.accuracy_pct(),
                epoch.lr
            ),
        )),
        PipelineEvent::Failed(_) => None,
    }
}

/// Text summary of a finished run
pub fn format_summary(metrics: &PruningMetrics) -> String {
    let mut lines = vec![
        "Pruning Summary:".to_string(),
        format!("  Ratio: {}", metrics.prune_ratio),
    ];
    for (label, result) in [
        ("Dense", &metrics.dense),
        ("Pruned", &metrics.pruned),
        ("Fine-tuned", &metrics.finetuned),
    ] {
        if let Some(r) = result {
            lines.push(format!(
                "  {label} accuracy: {:.2}% ({}/{})",
                r.accuracy_pct(),
                r.correct,
                r.samples
            ));
        }
    }
    if let (Some(dense), Some(pruned)) = (metrics.dense_size, metrics.pruned_size) {
        lines.push(format!("  Dense size: {dense}"));
        lines.push(format!("  Pruned size: {pruned}"));
    }
    if let Some(drop) = metrics.accuracy_drop() {
        lines.push(format!("  Accuracy drop: {:.2} points", drop * 100.0));
    }
    if let Some(reduction) = metrics.size_reduction() {
        lines.push(format!("  Size reduction: {}", pct(reduction)));
    }
    if let Some(ratio) = metrics.compression_ratio() {
        lines.push(format!("  Compression: {ratio:.2}x"));
    }
    lines.push(format!(
        "  Channel sparsity: {}",
        pct(f64::from(metrics.channel_sparsity()))
    ));
    lines.push(format!("  Duration: {:.2}s", metrics.total_duration_secs()));
    lines.join("\n")
}

fn load_spec(args: &PruneArgs) -> Result<PruneSpec, String> {
    let mut spec = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;
    apply_overrides(&mut spec, args);
    validate_config(&spec).map_err(|e| format!("Validation failed: {e}"))?;
    Ok(spec)
}

pub fn run_prune(args: PruneArgs, level: LogLevel) -> Result<(), String> {
    log(
        level,
        LogLevel::Normal,
        &format!("Loading config: {}", args.config.display()),
    );
    let spec = load_spec(&args)?;

    let model = load_model(&spec.model).map_err(|e| format!("Failed to load model: {e}"))?;
    let test =
        load_dataset(&spec.data.test).map_err(|e| format!("Failed to load test data: {e}"))?;
    let train = match (&spec.data.train, spec.finetune.enabled) {
        (Some(path), true) => Some(
            load_dataset(path).map_err(|e| format!("Failed to load training data: {e}"))?,
        ),
        _ => None,
    };
    log(
        level,
        LogLevel::Verbose,
        &format!(
            "  Model: {} ({} params), test samples: {}",
            spec.model.display(),
            model.parameter_count(),
            test.len()
        ),
    );

    // Structured output must stay parseable, so progress goes to text mode only
    let text = args.format == crate::config::OutputFormat::Text;
    let mut pipeline = PruneFinetunePipeline::new(spec.pipeline_config());
    let output = pipeline
        .run(&model, &test, train.as_ref(), |event| {
            if let Some((required, line)) = format_event(event).filter(|_| text) {
                log(level, required, &line);
            }
        })
        .map_err(|e| format!("Pruning failed: {e}"))?;

    if let Some(path) = &spec.output {
        save_model(&output.model, path).map_err(|e| format!("Failed to save model: {e}"))?;
        if text {
            log(
                level,
                LogLevel::Normal,
                &format!("Saved pruned model to {}", path.display()),
            );
        }
    }

    if !print_structured(&output.metrics, args.format)? {
        log(level, LogLevel::Normal, "");
        log(level, LogLevel::Normal, &format_summary(&output.metrics));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::{Model, VggConfig};
    use crate::prune::ChannelPruner;

    #[test]
    fn test_importance_event_is_verbose() {
        let model = Model::vgg(&VggConfig::parse("4,6,8", 3, 2).unwrap(), 0).unwrap();
        let importance = ChannelPruner::new().importance(&model).unwrap();
        let (level, text) = format_event(&PipelineEvent::ImportanceComputed(importance)).unwrap();
        assert_eq!(level, LogLevel::Verbose);
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("pair 1 importance: 6 channels"));
    }

    #[test]
    fn test_failed_event_is_silent() {
        assert!(format_event(&PipelineEvent::Failed("boom".to_string())).is_none());
    }
}
