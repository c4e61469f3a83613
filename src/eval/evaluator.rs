//! Batched model evaluation

use super::confusion::ConfusionMatrix;
use crate::data::{DataLoader, Dataset};
use crate::nn::Model;
use crate::train::CrossEntropyLoss;
use crate::{Error, Result};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

/// Accuracy and loss of a model over a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalResult {
    /// Fraction of correct predictions, in `[0, 1]`
    pub accuracy: f32,
    /// Mean cross-entropy per sample
    pub loss: f32,
    pub samples: usize,
    pub correct: usize,
    pub per_class_accuracy: Vec<f32>,
}

impl EvalResult {
    pub fn accuracy_pct(&self) -> f32 {
        self.accuracy * 100.0
    }
}

/// Index of the largest logit in each row; ties go to the lowest index
pub fn argmax_rows(logits: &Array2<f32>) -> Vec<usize> {
    logits
        .axis_iter(Axis(0))
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0, f32::NEG_INFINITY), |best, (i, &v)| {
                    if v > best.1 {
                        (i, v)
                    } else {
                        best
                    }
                })
                .0
        })
        .collect()
}

/// Runs a model over a dataset in fixed-size batches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluator {
    batch_size: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(64)
    }
}

impl Evaluator {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn evaluate(&self, model: &Model, dataset: &Dataset) -> Result<EvalResult> {
        Ok(self.evaluate_detailed(model, dataset)?.0)
    }

    /// Evaluate and also return the confusion matrix
    pub fn evaluate_detailed(
        &self,
        model: &Model,
        dataset: &Dataset,
    ) -> Result<(EvalResult, ConfusionMatrix)> {
        if dataset.is_empty() {
            return Err(Error::EmptyDataset("evaluation dataset".to_string()));
        }
        let (channels, _, _) = dataset.image_shape();
        if channels != model.input_channels() {
            return Err(Error::shape_mismatch(
                "dataset image channels",
                model.input_channels(),
                channels,
            ));
        }
        if dataset.num_classes() > model.num_classes() {
            return Err(Error::shape_mismatch(
                "dataset classes",
                format!("<= {}", model.num_classes()),
                dataset.num_classes(),
            ));
        }

        let mut confusion = ConfusionMatrix::new(model.num_classes());
        let mut loss_sum = 0.0f64;
        for batch in DataLoader::sequential(dataset, self.batch_size) {
            let logits = model.forward(&batch.images)?;
            let (loss, _) = CrossEntropyLoss.forward(&logits, &batch.labels)?;
            loss_sum += f64::from(loss) * batch.size() as f64;
            for (&label, predicted) in batch.labels.iter().zip(argmax_rows(&logits)) {
                confusion.record(label, predicted);
            }
        }

        let samples = dataset.len();
        let result = EvalResult {
            accuracy: confusion.accuracy(),
            loss: (loss_sum / samples as f64) as f32,
            samples,
            correct: confusion.correct(),
            per_class_accuracy: confusion.per_class_accuracy(),
        };
        Ok((result, confusion))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SyntheticConfig;
    use crate::nn::{Conv2d, Layer, Linear, VggConfig};
    use ndarray::{array, Array1, Array4};

    fn dataset() -> Dataset {
        Dataset::synthetic(&SyntheticConfig {
            samples: 10,
            classes: 2,
            channels: 1,
            height: 4,
            width: 4,
            noise: 0.1,
            seed: 3,
        })
        .unwrap()
    }

    /// Predicts class 0 for every input
    fn constant_model() -> Model {
        let conv = Conv2d::from_parts(Array4::zeros((1, 1, 1, 1)), None, 1, 0).unwrap();
        let head = Linear::from_parts(Array2::zeros((2, 1)), Array1::from(vec![1.0, 0.0])).unwrap();
        Model::new(vec![Layer::Conv2d(conv)], head).unwrap()
    }

    #[test]
    fn test_argmax_rows() {
        assert_eq!(argmax_rows(&array![[0.1, 0.9], [2.0, 2.0], [-1.0, -3.0]]), vec![1, 0, 0]);
    }

    #[test]
    fn test_constant_model_accuracy() {
        let result = Evaluator::new(3).evaluate(&constant_model(), &dataset()).unwrap();
        assert_eq!(result.samples, 10);
        assert_eq!(result.correct, 5);
        assert!((result.accuracy - 0.5).abs() < 1e-6);
        assert_eq!(result.per_class_accuracy, vec![1.0, 0.0]);
        assert!(result.loss > 0.0);
    }

    #[test]
    fn test_batch_size_does_not_change_result() {
        let model = Model::vgg(&VggConfig::parse("4,M,4", 1, 2).unwrap(), 8).unwrap();
        let a = Evaluator::new(1).evaluate(&model, &dataset()).unwrap();
        let b = Evaluator::new(64).evaluate(&model, &dataset()).unwrap();
        assert_eq!(a.correct, b.correct);
        assert!((a.loss - b.loss).abs() < 1e-4);
    }

    #[test]
    fn test_channel_mismatch() {
        let model = Model::vgg(&VggConfig::parse("4", 3, 2).unwrap(), 0).unwrap();
        let err = Evaluator::default().evaluate(&model, &dataset()).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_too_many_classes() {
        let model = Model::vgg(&VggConfig::parse("4", 1, 1).unwrap(), 0).unwrap();
        assert!(Evaluator::default().evaluate(&model, &dataset()).is_err());
    }
}
