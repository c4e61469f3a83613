//! Batch normalization over the channel axis of `(N, C, H, W)` inputs.
//!
//! The layer always normalizes with its running statistics, which
//! makes it a fixed per-channel affine map: `y = x * scale + shift` with
//! `scale = weight / sqrt(running_var + eps)` and
//! `shift = bias - running_mean * scale`.

use crate::{Error, Result};
use ndarray::{Array1, Array4, Axis, Zip};

/// Per-channel batch normalization (inference mode)
#[derive(Debug, Clone, PartialEq)]
pub struct BatchNorm2d {
    pub weight: Array1<f32>,
    pub bias: Array1<f32>,
    pub running_mean: Array1<f32>,
    pub running_var: Array1<f32>,
    eps: f32,
}

/// Gradients produced by [`BatchNorm2d::backward`]
pub struct BatchNorm2dGrads {
    pub input: Array4<f32>,
    pub weight: Array1<f32>,
    pub bias: Array1<f32>,
}

impl BatchNorm2d {
    pub const DEFAULT_EPS: f32 = 1e-5;

    /// Identity-initialized normalization over `num_features` channels
    pub fn new(num_features: usize) -> Self {
        Self {
            weight: Array1::ones(num_features),
            bias: Array1::zeros(num_features),
            running_mean: Array1::zeros(num_features),
            running_var: Array1::ones(num_features),
            eps: Self::DEFAULT_EPS,
        }
    }

    /// Build from existing parameter and statistic vectors
    pub fn from_parts(
        weight: Array1<f32>,
        bias: Array1<f32>,
        running_mean: Array1<f32>,
        running_var: Array1<f32>,
        eps: f32,
    ) -> Result<Self> {
        let n = weight.len();
        for (name, len) in [
            ("bias", bias.len()),
            ("running_mean", running_mean.len()),
            ("running_var", running_var.len()),
        ] {
            if len != n {
                return Err(Error::shape_mismatch(format!("BatchNorm2d {name}"), n, len));
            }
        }
        if running_var.iter().any(|&v| v < 0.0) {
            return Err(Error::NumericalInstability {
                method: "BatchNorm2d".to_string(),
                details: "negative running variance".to_string(),
            });
        }
        Ok(Self {
            weight,
            bias,
            running_mean,
            running_var,
            eps,
        })
    }

    pub fn num_features(&self) -> usize {
        self.weight.len()
    }

    pub fn eps(&self) -> f32 {
        self.eps
    }

    /// Learnable parameters (weight + bias); running statistics are buffers
    pub fn parameter_count(&self) -> usize {
        self.weight.len() + self.bias.len()
    }

    /// Keep only the given channels, in the given order
    pub fn select_channels(&mut self, indices: &[usize]) {
        self.weight = self.weight.select(Axis(0), indices);
        self.bias = self.bias.select(Axis(0), indices);
        self.running_mean = self.running_mean.select(Axis(0), indices);
        self.running_var = self.running_var.select(Axis(0), indices);
    }

    fn inv_std(&self) -> Array1<f32> {
        self.running_var.mapv(|v| 1.0 / (v + self.eps).sqrt())
    }

    fn check_channels(&self, c: usize) -> Result<()> {
        if c != self.num_features() {
            return Err(Error::shape_mismatch(
                "BatchNorm2d input channels",
                self.num_features(),
                c,
            ));
        }
        Ok(())
    }

    pub fn forward(&self, input: &Array4<f32>) -> Result<Array4<f32>> {
        self.check_channels(input.dim().1)?;
        let inv_std = self.inv_std();
        let mut output = input.clone();
        for (c, mut plane) in output.axis_iter_mut(Axis(1)).enumerate() {
            let scale = self.weight[c] * inv_std[c];
            let shift = self.bias[c] - self.running_mean[c] * scale;
            plane.mapv_inplace(|v| v * scale + shift);
        }
        Ok(output)
    }

    pub fn backward(
        &self,
        input: &Array4<f32>,
        grad_output: &Array4<f32>,
    ) -> Result<BatchNorm2dGrads> {
        self.check_channels(input.dim().1)?;
        if grad_output.dim() != input.dim() {
            return Err(Error::shape_mismatch(
                "BatchNorm2d grad_output",
                input.dim(),
                grad_output.dim(),
            ));
        }

        let inv_std = self.inv_std();
        let channels = self.num_features();
        let mut grad_input = grad_output.clone();
        let mut dweight = Array1::zeros(channels);
        let mut dbias = Array1::zeros(channels);

        for (c, ((x, g), mut dx)) in input
            .axis_iter(Axis(1))
            .zip(grad_output.axis_iter(Axis(1)))
            .zip(grad_input.axis_iter_mut(Axis(1)))
            .enumerate()
        {
            let mean = self.running_mean[c];
            let mut dw = 0.0;
            Zip::from(&x).and(&g).for_each(|&xv, &gv| {
                dw += gv * (xv - mean) * inv_std[c];
            });
            dweight[c] = dw;
            dbias[c] = g.sum();
            dx *= self.weight[c] * inv_std[c];
        }

        Ok(BatchNorm2dGrads {
            input: grad_input,
            weight: dweight,
            bias: dbias,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample_bn() -> BatchNorm2d {
        BatchNorm2d::from_parts(
            Array1::from(vec![2.0, 0.5]),
            Array1::from(vec![0.1, -0.3]),
            Array1::from(vec![1.0, -2.0]),
            Array1::from(vec![4.0, 0.25]),
            0.0,
        )
        .unwrap()
    }

    #[test]
    fn test_identity_init_is_near_identity() {
        let bn = BatchNorm2d::new(3);
        let x = Array4::from_elem((2, 3, 2, 2), 1.5);
        let y = bn.forward(&x).unwrap();
        for v in y.iter() {
            assert_abs_diff_eq!(*v, 1.5, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_forward_uses_running_stats() {
        let bn = sample_bn();
        let x = Array4::from_elem((1, 2, 1, 1), 3.0);
        let y = bn.forward(&x).unwrap();
        // (3 - 1) / 2 * 2 + 0.1
        assert_abs_diff_eq!(y[[0, 0, 0, 0]], 2.1, epsilon = 1e-6);
        // (3 + 2) / 0.5 * 0.5 - 0.3
        assert_abs_diff_eq!(y[[0, 1, 0, 0]], 4.7, epsilon = 1e-6);
    }

    #[test]
    fn test_backward_gradients() {
        let bn = sample_bn();
        let x = Array4::from_elem((1, 2, 1, 2), 3.0);
        let g = Array4::ones((1, 2, 1, 2));
        let grads = bn.backward(&x, &g).unwrap();
        assert_abs_diff_eq!(grads.bias[0], 2.0, epsilon = 1e-6);
        // xhat = (3 - 1) / 2 = 1, two positions
        assert_abs_diff_eq!(grads.weight[0], 2.0, epsilon = 1e-6);
        // dx = g * weight / std = 2 / 2
        assert_abs_diff_eq!(grads.input[[0, 0, 0, 0]], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(grads.input[[0, 1, 0, 1]], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_select_channels_keeps_vectors_aligned() {
        let mut bn = sample_bn();
        bn.select_channels(&[1]);
        assert_eq!(bn.num_features(), 1);
        assert_eq!(bn.weight[0], 0.5);
        assert_eq!(bn.running_mean[0], -2.0);
        assert_eq!(bn.running_var[0], 0.25);
    }

    #[test]
    fn test_rejects_channel_mismatch() {
        let bn = BatchNorm2d::new(4);
        assert!(bn.forward(&Array4::zeros((1, 3, 2, 2))).is_err());
    }

    #[test]
    fn test_from_parts_length_mismatch() {
        let result = BatchNorm2d::from_parts(
            Array1::ones(2),
            Array1::zeros(3),
            Array1::zeros(2),
            Array1::ones(2),
            1e-5,
        );
        assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
    }
}
