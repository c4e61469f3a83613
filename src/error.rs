//! Error types for podar operations

use thiserror::Error;

/// Main error type for pruning, evaluation and persistence
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid prune ratio {value} for pair {pair}: must be within [0.0, 1.0]")]
    InvalidPruneRatio { pair: usize, value: f64 },

    #[error(
        "Degenerate keep count for pair {pair}: ratio {ratio} keeps {keep} of {channels} channels"
    )]
    DegenerateKeepCount {
        pair: usize,
        ratio: f64,
        channels: usize,
        keep: usize,
    },

    #[error("Shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: String,
        expected: String,
        actual: String,
    },

    #[error("Numerical instability in {method}: {details}")]
    NumericalInstability { method: String, details: String },

    #[error("Dataset is empty: {0}")]
    EmptyDataset(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("SafeTensors error: {0}")]
    SafeTensors(String),
}

impl Error {
    /// Shorthand for a [`Error::ShapeMismatch`] with displayable dims
    pub fn shape_mismatch(
        context: impl Into<String>,
        expected: impl std::fmt::Debug,
        actual: impl std::fmt::Debug,
    ) -> Self {
        Error::ShapeMismatch {
            context: context.into(),
            expected: format!("{expected:?}"),
            actual: format!("{actual:?}"),
        }
    }
}

/// Result type for podar operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_prune_ratio_message() {
        let err = Error::InvalidPruneRatio {
            pair: 2,
            value: 1.5,
        };
        let msg = err.to_string();
        assert!(msg.contains("1.5"));
        assert!(msg.contains("pair 2"));
    }

    #[test]
    fn test_degenerate_keep_count_message() {
        let err = Error::DegenerateKeepCount {
            pair: 0,
            ratio: 1.0,
            channels: 64,
            keep: 0,
        };
        let msg = err.to_string();
        assert!(msg.contains("keeps 0 of 64"));
    }

    #[test]
    fn test_shape_mismatch_helper() {
        let err = Error::shape_mismatch("conv input", [1, 16, 8, 8], [1, 8, 8, 8]);
        let msg = err.to_string();
        assert!(msg.contains("conv input"));
        assert!(msg.contains("16"));
    }

    #[test]
    fn test_io_error_from() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.safetensors");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("missing.safetensors"));
    }
}
