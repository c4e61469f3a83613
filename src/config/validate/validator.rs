//! Configuration validation logic

use super::error::ValidationError;
use crate::config::schema::PruneSpec;
use crate::prune::PruneRatio;

/// Validate the values of a pruning specification.
///
/// Checks numeric ranges and section consistency. Whether the ratio list
/// matches the model's conv count is only known once the model is
/// loaded, and is checked by the pruner.
pub fn validate_config(spec: &PruneSpec) -> Result<(), ValidationError> {
    if spec.data.batch_size == 0 {
        return Err(ValidationError::InvalidBatchSize(spec.data.batch_size));
    }

    match &spec.prune.ratio {
        PruneRatio::Uniform(r) => check_ratio(*r)?,
        PruneRatio::PerLayer(list) if list.is_empty() => {
            return Err(ValidationError::EmptyRatioList)
        }
        PruneRatio::PerLayer(list) => list.iter().try_for_each(|r| check_ratio(*r))?,
    }

    if spec.bits_per_element == 0 || spec.bits_per_element > 64 {
        return Err(ValidationError::InvalidBitsPerElement(
            spec.bits_per_element,
        ));
    }

    if spec.finetune.enabled {
        let ft = &spec.finetune.params;
        if spec.data.train.is_none() {
            return Err(ValidationError::MissingTrainData);
        }
        if ft.epochs == 0 {
            return Err(ValidationError::InvalidEpochs(ft.epochs));
        }
        if ft.batch_size == 0 {
            return Err(ValidationError::InvalidBatchSize(ft.batch_size));
        }
        if !(ft.lr > 0.0 && ft.lr <= 1.0) {
            return Err(ValidationError::InvalidLearningRate(ft.lr));
        }
        if !(0.0..=ft.lr).contains(&ft.lr_min) {
            return Err(ValidationError::InvalidMinLearningRate(ft.lr_min));
        }
        if !(0.0..1.0).contains(&ft.momentum) {
            return Err(ValidationError::InvalidMomentum(ft.momentum));
        }
        if !(ft.weight_decay >= 0.0 && ft.weight_decay.is_finite()) {
            return Err(ValidationError::InvalidWeightDecay(ft.weight_decay));
        }
    }

    Ok(())
}

/// Check that every input file named in `spec` exists
pub fn validate_paths(spec: &PruneSpec) -> Result<(), ValidationError> {
    if !spec.model.exists() {
        return Err(ValidationError::ModelPathNotFound(
            spec.model.display().to_string(),
        ));
    }
    if !spec.data.test.exists() {
        return Err(ValidationError::TestDataNotFound(
            spec.data.test.display().to_string(),
        ));
    }
    if spec.finetune.enabled {
        if let Some(train) = &spec.data.train {
            if !train.exists() {
                return Err(ValidationError::TrainDataNotFound(
                    train.display().to_string(),
                ));
            }
        }
    }
    Ok(())
}

fn check_ratio(r: f64) -> Result<(), ValidationError> {
    if (0.0..=1.0).contains(&r) {
        Ok(())
    } else {
        Err(ValidationError::InvalidPruneRatio(r))
    }
}
