//! Structured (JSON/YAML) report output shared by commands

use crate::config::OutputFormat;
use serde::Serialize;

/// Print `value` as JSON or YAML. Returns `false` for text format, leaving
/// the caller to print its own text report.
pub fn print_structured<T: Serialize>(value: &T, format: OutputFormat) -> Result<bool, String> {
    match format {
        OutputFormat::Text => Ok(false),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)
                .map_err(|e| format!("JSON serialization error: {e}"))?;
            println!("{json}");
            Ok(true)
        }
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(value)
                .map_err(|e| format!("YAML serialization error: {e}"))?;
            println!("{yaml}");
            Ok(true)
        }
    }
}

/// `0.1234` as `12.34%`
pub fn pct(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}
