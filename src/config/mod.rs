//! Declarative configuration
//!
//! A pruning run is described by a YAML [`PruneSpec`], checked by
//! [`validate_config`] and loaded with [`load_config`]. The CLI argument
//! types live here too so commands can override spec values.

mod cli;
mod load;
mod schema;
mod validate;

pub use cli::{
    apply_overrides, parse_args, Cli, Command, ImageSize, InitArgs, InspectArgs, OutputFormat,
    PruneArgs, ScanArgs, SynthArgs, ValidateArgs,
};
pub use load::{load_config, parse_config};
pub use schema::{DataSpec, FinetuneSpec, PruneSection, PruneSpec};
pub use validate::{validate_config, validate_paths, ValidationError};
