//! Property tests for channel pruning

use super::*;
use crate::nn::{Conv2d, Layer, Linear, Model, VggConfig};
use ndarray::{Array1, Array2, Array4, Axis};
use proptest::prelude::*;
use std::collections::BTreeSet;

/// Two 1x1 convs: `c` intermediate channels feeding a consumer with the
/// given weights.
fn pair_model(consumer_weight: Array4<f32>) -> Model {
    build_pair_model(consumer_weight, false)
}

/// [`pair_model`] whose producer also carries bias `100 + o` on channel `o`
fn biased_pair_model(consumer_weight: Array4<f32>) -> Model {
    build_pair_model(consumer_weight, true)
}

fn build_pair_model(consumer_weight: Array4<f32>, with_bias: bool) -> Model {
    let c = consumer_weight.dim().1;
    let producer_weight = Array4::from_shape_fn((c, 1, 1, 1), |(o, _, _, _)| o as f32 + 1.0);
    let bias = with_bias.then(|| Array1::from_shape_fn(c, |o| o as f32 + 100.0));
    let producer = Conv2d::from_parts(producer_weight, bias, 1, 0).unwrap();
    let out = consumer_weight.dim().0;
    let consumer = Conv2d::from_parts(consumer_weight, None, 1, 0).unwrap();
    let head = Linear::from_parts(Array2::zeros((2, out)), Array1::zeros(2)).unwrap();
    Model::new(vec![Layer::Conv2d(producer), Layer::Conv2d(consumer)], head).unwrap()
}

/// Brute-force top-k by rank: a channel is kept when fewer than `k`
/// channels outrank it (higher score, or equal score and lower index).
fn rank_top_k(scores: &Array1<f32>, k: usize) -> BTreeSet<usize> {
    (0..scores.len())
        .filter(|&i| {
            let outranked_by = (0..scores.len())
                .filter(|&j| scores[j] > scores[i] || (scores[j] == scores[i] && j < i))
                .count();
            outranked_by < k
        })
        .collect()
}

fn consumer_weight_strategy() -> impl Strategy<Value = Array4<f32>> {
    (1usize..5, 1usize..10, 1usize..3).prop_flat_map(|(out, c, k)| {
        proptest::collection::vec(-2.0f32..2.0, out * c * k * k).prop_map(move |data| {
            Array4::from_shape_vec((out, c, k, k), data).unwrap()
        })
    })
}

fn vgg_strategy() -> impl Strategy<Value = (Model, Vec<f64>)> {
    (proptest::collection::vec(2usize..9, 2..5), any::<u64>()).prop_flat_map(|(widths, seed)| {
        let layers: Vec<String> = widths.iter().map(usize::to_string).collect();
        let config = VggConfig::parse(&layers.join(","), 2, 3).unwrap();
        let model = Model::vgg(&config, seed).unwrap();
        let pairs = widths.len() - 1;
        (
            Just(model),
            proptest::collection::vec(0.0f64..0.5, pairs..=pairs),
        )
    })
}

// =========================================================================
// Importance
// =========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_importance_nonnegative(weight in consumer_weight_strategy()) {
        for norm in [NormType::L1, NormType::L2] {
            let scores = channel_importance(&weight, norm).unwrap();
            prop_assert_eq!(scores.len(), weight.dim().1);
            prop_assert!(
                scores.iter().all(|&s| s >= 0.0),
                "FALSIFIED: negative importance {:?}",
                scores
            );
        }
    }

    #[test]
    fn prop_sort_permutation_is_permutation(weight in consumer_weight_strategy()) {
        let scores = channel_importance(&weight, NormType::L2).unwrap();
        let mut order = sort_permutation(&scores);
        for w in order.windows(2) {
            prop_assert!(scores[w[0]] >= scores[w[1]]);
        }
        order.sort_unstable();
        prop_assert_eq!(order, (0..scores.len()).collect::<Vec<_>>());
    }

    // =====================================================================
    // Reorder + truncate
    // =====================================================================

    #[test]
    fn prop_sort_then_truncate_keeps_top_k(
        weight in consumer_weight_strategy(),
        ratio in 0.0f64..0.9,
    ) {
        let c = weight.dim().1;
        let keep = keep_count(c, ratio);
        prop_assume!(keep > 0 && keep < c);

        let original = pair_model(weight.clone());
        let scores = channel_importance(&weight, NormType::L2).unwrap();
        let expected = rank_top_k(&scores, keep);

        let outcome = ChannelPruner::new()
            .prune(&original, &PruneRatio::Uniform(ratio))
            .unwrap();
        let producer = outcome.model.features[0].as_conv().unwrap();
        prop_assert_eq!(producer.out_channels(), keep);

        // The producer's weight for channel o is o + 1, so the kept
        // weights identify the surviving original channels.
        let kept: BTreeSet<usize> = producer
            .weight
            .iter()
            .map(|&w| w as usize - 1)
            .collect();
        prop_assert_eq!(kept, expected);
    }

    #[test]
    fn prop_pruned_pairs_have_matching_widths((model, ratios) in vgg_strategy()) {
        let ratio = PruneRatio::PerLayer(ratios.clone());
        let outcome = ChannelPruner::new().prune(&model, &ratio).unwrap();
        prop_assert!(outcome.model.validate().is_ok());

        for report in &outcome.pairs {
            let producer = outcome.model.features[report.pair.producer].as_conv().unwrap();
            let consumer = outcome.model.features[report.pair.consumer].as_conv().unwrap();
            let k = keep_count(report.original_channels, ratios[report.index]);
            prop_assert_eq!(producer.out_channels(), k);
            prop_assert_eq!(consumer.in_channels(), k);
            prop_assert_eq!(report.kept_channels, k);
        }
    }

    #[test]
    fn prop_ratio_zero_is_bit_identical((model, _ratios) in vgg_strategy()) {
        let outcome = ChannelPruner::new()
            .prune(&model, &PruneRatio::Uniform(0.0))
            .unwrap();
        prop_assert_eq!(outcome.model, model);
    }

    #[test]
    fn prop_sorting_is_idempotent((model, _ratios) in vgg_strategy()) {
        let once = apply_channel_sorting(&model, NormType::L2).unwrap();
        let twice = apply_channel_sorting(&once, NormType::L2).unwrap();
        prop_assert_eq!(twice, once);
    }
}

// =========================================================================
// Scenarios
// =========================================================================

#[test]
fn test_sixty_four_channels_at_sixty_percent_keeps_twenty_six() {
    let consumer = Array4::from_shape_fn((4, 64, 1, 1), |(o, c, _, _)| {
        ((c * 7 + o) % 13) as f32 - 6.0
    });
    let model = biased_pair_model(consumer.clone());
    let outcome = ChannelPruner::new()
        .prune(&model, &PruneRatio::Uniform(0.6))
        .unwrap();
    let producer = outcome.model.features[0].as_conv().unwrap();
    let pruned_consumer = outcome.model.features[1].as_conv().unwrap();
    assert_eq!(producer.weight.dim(), (26, 1, 1, 1));
    assert_eq!(pruned_consumer.weight.dim(), (4, 26, 1, 1));

    let bias = producer.bias.as_ref().unwrap();
    assert_eq!(bias.len(), 26);

    // Weight o + 1 and bias o + 100 name the same original channel o
    let kept: Vec<usize> = producer.weight.iter().map(|&w| w as usize - 1).collect();
    for (i, &o) in kept.iter().enumerate() {
        assert_eq!(bias[i], o as f32 + 100.0, "FALSIFIED: bias row {i} not permuted with weight");
        assert_eq!(
            pruned_consumer.weight.index_axis(Axis(1), i),
            consumer.index_axis(Axis(1), o),
            "FALSIFIED: consumer input {i} not permuted with producer"
        );
    }
    let scores = channel_importance(&consumer, NormType::L2).unwrap();
    assert_eq!(kept, top_k_channels(&scores, 26));
}

#[test]
fn test_zero_importance_channels_are_removed() {
    // Channels 1 and 3 read nothing from the producer.
    let mut consumer = Array4::ones((2, 4, 1, 1));
    consumer.index_axis_mut(Axis(1), 1).fill(0.0);
    consumer.index_axis_mut(Axis(1), 3).fill(0.0);
    let model = pair_model(consumer);

    let outcome = ChannelPruner::new()
        .prune(&model, &PruneRatio::Uniform(0.5))
        .unwrap();
    let kept: Vec<f32> = outcome.model.features[0]
        .as_conv()
        .unwrap()
        .weight
        .iter()
        .copied()
        .collect();
    // Producer channel o carries weight o + 1
    assert_eq!(kept, vec![1.0, 3.0]);
}

#[test]
fn test_invalid_ratio_list_leaves_model_untouched() {
    let model = Model::vgg(&VggConfig::parse("4,4,4", 1, 2).unwrap(), 1).unwrap();
    let before = model.clone();
    let result = ChannelPruner::new().prune(&model, &PruneRatio::PerLayer(vec![0.5]));
    assert!(matches!(result, Err(crate::Error::Config(_))));
    assert_eq!(model, before);
}

#[test]
fn test_pruned_model_still_runs() {
    let model = Model::vgg(&VggConfig::parse("8,M,8,6", 3, 4).unwrap(), 2).unwrap();
    let outcome = ChannelPruner::new()
        .prune(&model, &PruneRatio::Uniform(0.5))
        .unwrap();
    let logits = outcome
        .model
        .forward(&Array4::ones((2, 3, 8, 8)))
        .unwrap();
    assert_eq!(logits.dim(), (2, 4));
    assert!(logits.iter().all(|v| v.is_finite()));
}
