//! Loading pruning specifications from YAML

use super::schema::PruneSpec;
use super::validate::{validate_config, validate_paths};
use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// Parse and validate a spec from YAML text.
///
/// File existence is not checked; see [`load_config`].
pub fn parse_config(yaml: &str) -> Result<PruneSpec> {
    let spec: PruneSpec = serde_yaml::from_str(yaml)
        .map_err(|e| Error::Config(format!("Failed to parse YAML config: {e}")))?;

    validate_config(&spec).map_err(|e| Error::Config(format!("Invalid config: {e}")))?;

    Ok(spec)
}

/// Load a spec from a YAML file, validating its values and input paths.
///
/// Relative paths inside the file are kept as written.
pub fn load_config<P: AsRef<Path>>(config_path: P) -> Result<PruneSpec> {
    let yaml_content = fs::read_to_string(config_path.as_ref()).map_err(|e| {
        Error::Config(format!(
            "Failed to read config file {}: {}",
            config_path.as_ref().display(),
            e
        ))
    })?;

    let spec = parse_config(&yaml_content)?;

    validate_paths(&spec).map_err(|e| Error::Config(format!("Invalid config: {e}")))?;

    Ok(spec)
}
