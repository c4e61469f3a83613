//! Accuracy as a function of uniform prune ratio

use super::evaluator::Evaluator;
use super::size::ModelSize;
use crate::data::Dataset;
use crate::nn::Model;
use crate::prune::{ChannelPruner, PruneRatio};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// One point of a sensitivity curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityPoint {
    pub ratio: f64,
    pub accuracy: f32,
    pub loss: f32,
    pub parameters: usize,
}

impl SensitivityPoint {
    /// Bits needed at `bits_per_element`
    pub fn size(&self, bits_per_element: u32) -> ModelSize {
        ModelSize {
            parameters: self.parameters,
            bits_per_element,
        }
    }
}

/// Prune a copy of `model` uniformly at each ratio and evaluate it without
/// fine-tuning. Points come back sorted by ratio.
///
/// Keep counts only shrink as the ratio grows, so the sweep ends at the
/// first ratio that would leave a pair with no channels. That ratio is an
/// error only when no point was measured before it.
pub fn sensitivity_scan(
    model: &Model,
    dataset: &Dataset,
    ratios: &[f64],
    pruner: &ChannelPruner,
    evaluator: &Evaluator,
) -> Result<Vec<SensitivityPoint>> {
    let mut ratios = ratios.to_vec();
    ratios.sort_by(f64::total_cmp);
    ratios.dedup();

    let mut points = Vec::with_capacity(ratios.len());
    for ratio in ratios {
        let outcome = match pruner.prune(model, &PruneRatio::Uniform(ratio)) {
            Ok(outcome) => outcome,
            Err(Error::DegenerateKeepCount { .. }) if !points.is_empty() => break,
            Err(e) => return Err(e),
        };
        let result = evaluator.evaluate(&outcome.model, dataset)?;
        points.push(SensitivityPoint {
            ratio,
            accuracy: result.accuracy,
            loss: result.loss,
            parameters: outcome.model.parameter_count(),
        });
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SyntheticConfig;
    use crate::nn::VggConfig;

    fn setup() -> (Model, Dataset) {
        let model = Model::vgg(&VggConfig::parse("8,M,8,4", 2, 3).unwrap(), 4).unwrap();
        let data = Dataset::synthetic(&SyntheticConfig {
            samples: 9,
            classes: 3,
            channels: 2,
            height: 6,
            width: 6,
            noise: 0.1,
            seed: 0,
        })
        .unwrap();
        (model, data)
    }

    #[test]
    fn test_scan_sorted_and_shrinking() {
        let (model, data) = setup();
        let points = sensitivity_scan(
            &model,
            &data,
            &[0.5, 0.0, 0.25, 0.5],
            &ChannelPruner::new(),
            &Evaluator::new(4),
        )
        .unwrap();
        let ratios: Vec<f64> = points.iter().map(|p| p.ratio).collect();
        assert_eq!(ratios, vec![0.0, 0.25, 0.5]);
        assert_eq!(points[0].parameters, model.parameter_count());
        for w in points.windows(2) {
            assert!(w[1].parameters < w[0].parameters);
        }
        assert_eq!(points[0].size(32).bits(), model.parameter_count() as u64 * 32);
    }

    #[test]
    fn test_scan_stops_at_first_degenerate_ratio() {
        let (model, data) = setup();
        // Both pairs have 8 channels: 0.9 keeps 1, 0.95 keeps 0
        let points = sensitivity_scan(
            &model,
            &data,
            &[0.95, 0.0, 0.9, 1.0, 0.5],
            &ChannelPruner::new(),
            &Evaluator::new(4),
        )
        .unwrap();
        let ratios: Vec<f64> = points.iter().map(|p| p.ratio).collect();
        assert_eq!(ratios, vec![0.0, 0.5, 0.9]);
    }

    #[test]
    fn test_scan_with_only_degenerate_ratios_fails() {
        let (model, data) = setup();
        let err = sensitivity_scan(
            &model,
            &data,
            &[1.0],
            &ChannelPruner::new(),
            &Evaluator::new(4),
        )
        .unwrap_err();
        assert!(matches!(err, Error::DegenerateKeepCount { .. }));
    }

    #[test]
    fn test_scan_propagates_invalid_ratio() {
        let (model, data) = setup();
        let err = sensitivity_scan(
            &model,
            &data,
            &[1.5],
            &ChannelPruner::new(),
            &Evaluator::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidPruneRatio { .. }));
    }
}
