//! Scan command implementation

use super::report::print_structured;
use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{load_config, ScanArgs};
use crate::eval::{sensitivity_scan, Evaluator, SensitivityPoint};
use crate::io::{load_dataset, load_model};

/// Text table of a sensitivity scan
pub fn format_scan_table(points: &[SensitivityPoint], bits_per_element: u32) -> Vec<String> {
    let mut lines = vec![format!(
        "  {:>6}  {:>9}  {:>8}  {:>10}  {:>9}",
        "ratio", "accuracy", "loss", "params", "size MiB"
    )];
    lines.extend(points.iter().map(|p| {
        format!(
            "  {:>6.2}  {:>8.2}%  {:>8.4}  {:>10}  {:>9.3}",
            p.ratio,
            p.accuracy * 100.0,
            p.loss,
            p.parameters,
            p.size(bits_per_element).mib()
        )
    }));
    lines
}

/// Explain a sweep that ended before the largest requested ratio
pub fn truncation_note(requested: &[f64], points: &[SensitivityPoint]) -> Option<String> {
    let largest = requested.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let last = points.last()?.ratio;
    (last < largest).then(|| {
        format!("  Stopped after ratio {last}: larger ratios leave a pair with no channels")
    })
}

pub fn run_scan(args: ScanArgs, level: LogLevel) -> Result<(), String> {
    let spec = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;
    let ratios = args.ratio_list()?;
    if ratios.is_empty() {
        return Err("No ratios to scan".to_string());
    }

    let model = load_model(&spec.model).map_err(|e| format!("Failed to load model: {e}"))?;
    let test =
        load_dataset(&spec.data.test).map_err(|e| format!("Failed to load test data: {e}"))?;

    let pruner = spec.pipeline_config().pruner();
    let evaluator = Evaluator::new(spec.data.batch_size);
    let points = sensitivity_scan(&model, &test, &ratios, &pruner, &evaluator)
        .map_err(|e| format!("Scan failed: {e}"))?;

    if !print_structured(&points, args.format)? {
        log(
            level,
            LogLevel::Normal,
            &format!("Sensitivity scan ({} ratios, no fine-tuning):", points.len()),
        );
        for line in format_scan_table(&points, spec.bits_per_element) {
            log(level, LogLevel::Normal, &line);
        }
        if let Some(note) = truncation_note(&ratios, &points) {
            log(level, LogLevel::Normal, &note);
        }
    }
    Ok(())
}
