//! Validation error types

/// Validation error type
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("Model path does not exist: {0}")]
    ModelPathNotFound(String),

    #[error("Training data path does not exist: {0}")]
    TrainDataNotFound(String),

    #[error("Test data path does not exist: {0}")]
    TestDataNotFound(String),

    #[error("Fine-tuning is enabled but data.train is not set")]
    MissingTrainData,

    #[error("Invalid batch size: {0} (must be > 0)")]
    InvalidBatchSize(usize),

    #[error("Invalid prune ratio: {0} (must be in [0.0, 1.0])")]
    InvalidPruneRatio(f64),

    #[error("Prune ratio list cannot be empty")]
    EmptyRatioList,

    #[error("Invalid learning rate: {0} (must be > 0.0 and <= 1.0)")]
    InvalidLearningRate(f32),

    #[error("Invalid minimum learning rate: {0} (must be in [0.0, lr])")]
    InvalidMinLearningRate(f32),

    #[error("Invalid momentum: {0} (must be in [0.0, 1.0))")]
    InvalidMomentum(f32),

    #[error("Invalid weight decay: {0} (must be >= 0.0)")]
    InvalidWeightDecay(f32),

    #[error("Invalid epochs: {0} (must be > 0)")]
    InvalidEpochs(usize),

    #[error("Invalid bits per element: {0} (must be in 1..=64)")]
    InvalidBitsPerElement(u32),
}
