//! Importance-ordered channel sorting
//!
//! Sorting permutes the channels of each pair so the most important come
//! first. The permutation is applied consistently to producer outputs,
//! intermediate BatchNorm vectors and consumer inputs, so the network
//! computes exactly the same function afterwards.

use super::importance::{sort_permutation, NormType};
use super::pair::ConvPair;
use crate::nn::Model;
use crate::Result;

/// Sort one pair in place and return the permutation that was applied
pub fn sort_pair(model: &mut Model, pair: ConvPair, norm: NormType) -> Result<Vec<usize>> {
    let scores = pair.consumer_importance(model, norm)?;
    let order = sort_permutation(&scores);
    pair.select_channels(model, &order)?;
    Ok(order)
}

/// Return a copy of `model` with every pair's channels in descending
/// importance order.
pub fn apply_channel_sorting(model: &Model, norm: NormType) -> Result<Model> {
    model.validate()?;
    let mut sorted = model.clone();
    for pair in ConvPair::all(&sorted) {
        sort_pair(&mut sorted, pair, norm)?;
    }
    Ok(sorted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::VggConfig;
    use crate::prune::importance::channel_importance;
    use approx::assert_abs_diff_eq;
    use ndarray::Array4;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn model() -> Model {
        Model::vgg(&VggConfig::parse("6,5,M,4", 2, 3).unwrap(), 21).unwrap()
    }

    #[test]
    fn test_sorted_consumer_importance_is_descending() {
        let sorted = apply_channel_sorting(&model(), NormType::L2).unwrap();
        for pair in ConvPair::all(&sorted) {
            let scores = pair.consumer_importance(&sorted, NormType::L2).unwrap();
            for w in scores.as_slice().unwrap().windows(2) {
                assert!(w[0] >= w[1], "FALSIFIED: scores not descending: {scores:?}");
            }
        }
    }

    #[test]
    fn test_sorting_preserves_logits() {
        let original = model();
        let sorted = apply_channel_sorting(&original, NormType::L2).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let x = Array4::from_shape_simple_fn((2, 2, 8, 8), || rng.random_range(-1.0..1.0));

        let before = original.forward(&x).unwrap();
        let after = sorted.forward(&x).unwrap();
        for (a, b) in before.iter().zip(after.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_sort_pair_returns_permutation() {
        let mut m = model();
        let pair = ConvPair::all(&m)[0];
        let scores = channel_importance(&m.features[3].as_conv().unwrap().weight, NormType::L1)
            .unwrap();
        let order = sort_pair(&mut m, pair, NormType::L1).unwrap();
        assert_eq!(order, sort_permutation(&scores));

        let mut seen = order.clone();
        seen.sort_unstable();
        assert_eq!(seen, (0..6).collect::<Vec<_>>());
    }

    #[test]
    fn test_sorting_keeps_parameter_count() {
        let original = model();
        let sorted = apply_channel_sorting(&original, NormType::L2).unwrap();
        assert_eq!(original.parameter_count(), sorted.parameter_count());
    }
}
