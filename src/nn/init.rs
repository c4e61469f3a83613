//! Weight initialization

use ndarray::{Array, Dimension, ShapeBuilder};
use rand::Rng;

/// Kaiming (He) uniform initialization for ReLU networks.
///
/// Samples from `U(-b, b)` with `b = sqrt(6 / fan_in)`.
pub fn kaiming_uniform<Sh, D, R>(shape: Sh, fan_in: usize, rng: &mut R) -> Array<f32, D>
where
    Sh: ShapeBuilder<Dim = D>,
    D: Dimension,
    R: Rng + ?Sized,
{
    let bound = (6.0 / fan_in.max(1) as f32).sqrt();
    Array::from_shape_simple_fn(shape, || rng.random_range(-bound..bound))
}

/// Uniform `U(-1/sqrt(fan_in), 1/sqrt(fan_in))`, used for linear layers.
pub fn fan_in_uniform<Sh, D, R>(shape: Sh, fan_in: usize, rng: &mut R) -> Array<f32, D>
where
    Sh: ShapeBuilder<Dim = D>,
    D: Dimension,
    R: Rng + ?Sized,
{
    let bound = 1.0 / (fan_in.max(1) as f32).sqrt();
    Array::from_shape_simple_fn(shape, || rng.random_range(-bound..bound))
}
