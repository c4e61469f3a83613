//! Model-level tests for the nn module

use super::*;
use crate::Error;
use approx::assert_abs_diff_eq;
use ndarray::{Array1, Array2, Array4};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn tiny_model() -> Model {
    let cfg = VggConfig::parse("4,6,M,5", 2, 3).unwrap();
    Model::vgg(&cfg, 11).unwrap()
}

fn random_images(n: usize, c: usize, hw: usize, seed: u64) -> Array4<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array4::from_shape_simple_fn((n, c, hw, hw), || rng.random_range(-1.0..1.0))
}

/// Sum of logits weighted by a fixed matrix, so the gradient is that matrix
fn weighted_logit_sum(model: &Model, x: &Array4<f32>, weights: &Array2<f32>) -> f32 {
    (model.forward(x).unwrap() * weights).sum()
}

#[test]
fn test_forward_shape() {
    let model = tiny_model();
    let logits = model.forward(&random_images(3, 2, 8, 0)).unwrap();
    assert_eq!(logits.dim(), (3, 3));
}

#[test]
fn test_forward_train_matches_forward() {
    let model = tiny_model();
    let x = random_images(2, 2, 6, 1);
    let plain = model.forward(&x).unwrap();
    let (cached, _) = model.forward_train(&x).unwrap();
    assert_eq!(plain, cached);
}

#[test]
fn test_gradients_align_with_parameters() {
    let mut model = tiny_model();
    let x = random_images(2, 2, 6, 2);
    let (logits, cache) = model.forward_train(&x).unwrap();
    let grads = model.backward(&cache, &Array2::ones(logits.raw_dim())).unwrap();

    let shapes: Vec<Vec<usize>> = model
        .parameters_mut()
        .iter()
        .map(|p| p.shape().to_vec())
        .collect();
    assert_eq!(grads.len(), shapes.len());
    for (g, shape) in grads.iter().zip(&shapes) {
        assert_eq!(g.shape(), shape.as_slice());
    }
}

#[test]
fn test_end_to_end_gradient_matches_finite_difference() {
    let model = tiny_model();
    let x = random_images(2, 2, 6, 3);
    let mut rng = StdRng::seed_from_u64(4);
    let weights = Array2::from_shape_simple_fn((2, 3), || rng.random_range(-1.0..1.0));

    let (_, cache) = model.forward_train(&x).unwrap();
    let grads = model.backward(&cache, &weights).unwrap();
    let analytic: Vec<f32> = grads.iter().next().unwrap().iter().take(4).copied().collect();

    let eps = 1e-3;
    for (flat, expected) in analytic.iter().enumerate() {
        let perturbed = |delta: f32| {
            let mut m = model.clone();
            let conv = m.features[0].as_conv_mut().unwrap();
            let slot = conv.weight.iter_mut().nth(flat).unwrap();
            *slot += delta;
            weighted_logit_sum(&m, &x, &weights)
        };
        let numeric = (perturbed(eps) - perturbed(-eps)) / (2.0 * eps);
        assert_abs_diff_eq!(*expected, numeric, epsilon = 2e-2);
    }
}

#[test]
fn test_validate_detects_broken_chain() {
    let mut model = tiny_model();
    let producer = model.features[0].as_conv_mut().unwrap();
    producer.select_output_channels(&[0, 1]);
    let err = model.validate().unwrap_err();
    assert!(matches!(err, Error::ShapeMismatch { .. }));
}

#[test]
fn test_validate_checks_classifier() {
    let conv = Conv2d::from_parts(Array4::zeros((4, 1, 1, 1)), None, 1, 0).unwrap();
    let head = Linear::from_parts(Array2::zeros((2, 3)), Array1::zeros(2)).unwrap();
    let result = Model::new(vec![Layer::Conv2d(conv)], head);
    assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
}

#[test]
fn test_architecture_reflects_layers() {
    let model = tiny_model();
    let arch = model.architecture();
    assert_eq!(arch.features.len(), model.features.len());
    assert_eq!(arch.classifier.in_features, 5);
    assert!(matches!(
        arch.features[0],
        LayerSpec::Conv2d {
            in_channels: 2,
            out_channels: 4,
            ..
        }
    ));
}

#[test]
fn test_input_channels() {
    assert_eq!(tiny_model().input_channels(), 2);
}
