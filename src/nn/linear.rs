//! Fully connected classifier layer

use super::init::fan_in_uniform;
use crate::{Error, Result};
use ndarray::{Array1, Array2, Axis};
use rand::Rng;

/// Linear layer `y = x W^T + b` over `(N, in_features)` inputs
#[derive(Debug, Clone, PartialEq)]
pub struct Linear {
    /// Weight, shape `(out_features, in_features)`
    pub weight: Array2<f32>,
    /// Bias, shape `(out_features)`
    pub bias: Array1<f32>,
}

/// Gradients produced by [`Linear::backward`]
pub struct LinearGrads {
    pub input: Array2<f32>,
    pub weight: Array2<f32>,
    pub bias: Array1<f32>,
}

impl Linear {
    pub fn new<R: Rng + ?Sized>(in_features: usize, out_features: usize, rng: &mut R) -> Self {
        Self {
            weight: fan_in_uniform((out_features, in_features), in_features, rng),
            bias: fan_in_uniform(out_features, in_features, rng),
        }
    }

    pub fn from_parts(weight: Array2<f32>, bias: Array1<f32>) -> Result<Self> {
        if bias.len() != weight.nrows() {
            return Err(Error::shape_mismatch(
                "Linear bias",
                weight.nrows(),
                bias.len(),
            ));
        }
        Ok(Self { weight, bias })
    }

    pub fn in_features(&self) -> usize {
        self.weight.ncols()
    }

    pub fn out_features(&self) -> usize {
        self.weight.nrows()
    }

    pub fn parameter_count(&self) -> usize {
        self.weight.len() + self.bias.len()
    }

    fn check_input(&self, input: &Array2<f32>) -> Result<()> {
        if input.ncols() != self.in_features() {
            return Err(Error::shape_mismatch(
                "Linear input features",
                self.in_features(),
                input.ncols(),
            ));
        }
        Ok(())
    }

    pub fn forward(&self, input: &Array2<f32>) -> Result<Array2<f32>> {
        self.check_input(input)?;
        Ok(input.dot(&self.weight.t()) + &self.bias)
    }

    pub fn backward(&self, input: &Array2<f32>, grad_output: &Array2<f32>) -> Result<LinearGrads> {
        self.check_input(input)?;
        if grad_output.dim() != (input.nrows(), self.out_features()) {
            return Err(Error::shape_mismatch(
                "Linear grad_output",
                (input.nrows(), self.out_features()),
                grad_output.dim(),
            ));
        }
        Ok(LinearGrads {
            input: grad_output.dot(&self.weight),
            weight: grad_output.t().dot(input),
            bias: grad_output.sum_axis(Axis(0)),
        })
    }
}
