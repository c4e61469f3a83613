//! 2D convolution layer.
//!
//! Uses the im2col formulation: each sample is unrolled into a
//! `(C_in * kH * kW, H_out * W_out)` matrix so that the forward pass and
//! both gradient products become plain matrix multiplications.
//!
//! # Shape
//!
//! - Weight: `(C_out, C_in, kH, kW)`
//! - Bias: `(C_out)`, optional
//! - Input: `(N, C_in, H, W)`
//! - Output: `(N, C_out, H_out, W_out)` where
//!   `H_out = (H + 2 * padding - kH) / stride + 1`

use super::init::kaiming_uniform;
use crate::{Error, Result};
use ndarray::{Array1, Array2, Array4, ArrayView3, ArrayViewMut3, Axis};
use rand::Rng;

/// 2D convolution over `(N, C, H, W)` inputs
#[derive(Debug, Clone, PartialEq)]
pub struct Conv2d {
    /// Weight tensor, shape `(out_channels, in_channels, kH, kW)`
    pub weight: Array4<f32>,
    /// Bias vector of length `out_channels`
    pub bias: Option<Array1<f32>>,
    stride: usize,
    padding: usize,
}

/// Gradients produced by [`Conv2d::backward`]
pub struct Conv2dGrads {
    pub input: Array4<f32>,
    pub weight: Array4<f32>,
    pub bias: Option<Array1<f32>>,
}

impl Conv2d {
    /// Create a Kaiming-initialized convolution with a square kernel
    pub fn new<R: Rng + ?Sized>(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        stride: usize,
        padding: usize,
        bias: bool,
        rng: &mut R,
    ) -> Self {
        let fan_in = in_channels * kernel_size * kernel_size;
        let weight = kaiming_uniform(
            (out_channels, in_channels, kernel_size, kernel_size),
            fan_in,
            rng,
        );
        let bias = bias.then(|| Array1::zeros(out_channels));
        Self {
            weight,
            bias,
            stride: stride.max(1),
            padding,
        }
    }

    /// Build a convolution from existing tensors
    pub fn from_parts(
        weight: Array4<f32>,
        bias: Option<Array1<f32>>,
        stride: usize,
        padding: usize,
    ) -> Result<Self> {
        if stride == 0 {
            return Err(Error::Config("Conv2d stride must be > 0".to_string()));
        }
        if let Some(b) = &bias {
            if b.len() != weight.dim().0 {
                return Err(Error::shape_mismatch(
                    "Conv2d bias",
                    weight.dim().0,
                    b.len(),
                ));
            }
        }
        Ok(Self {
            weight,
            bias,
            stride,
            padding,
        })
    }

    pub fn in_channels(&self) -> usize {
        self.weight.dim().1
    }

    pub fn out_channels(&self) -> usize {
        self.weight.dim().0
    }

    /// Kernel size as `(kH, kW)`
    pub fn kernel_size(&self) -> (usize, usize) {
        let (_, _, kh, kw) = self.weight.dim();
        (kh, kw)
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn padding(&self) -> usize {
        self.padding
    }

    /// Number of learnable parameters (weight + bias)
    pub fn parameter_count(&self) -> usize {
        self.weight.len() + self.bias.as_ref().map_or(0, Array1::len)
    }

    /// Spatial output size for an `h x w` input
    pub fn output_hw(&self, h: usize, w: usize) -> Result<(usize, usize)> {
        let (kh, kw) = self.kernel_size();
        let (ph, pw) = (h + 2 * self.padding, w + 2 * self.padding);
        if ph < kh || pw < kw {
            return Err(Error::shape_mismatch(
                "Conv2d padded input smaller than kernel",
                (kh, kw),
                (ph, pw),
            ));
        }
        Ok(((ph - kh) / self.stride + 1, (pw - kw) / self.stride + 1))
    }

    /// Keep only the given output channels, in the given order.
    ///
    /// Slices weight axis 0 and the bias.
    pub fn select_output_channels(&mut self, indices: &[usize]) {
        self.weight = self.weight.select(Axis(0), indices);
        if let Some(bias) = self.bias.as_mut() {
            *bias = bias.select(Axis(0), indices);
        }
    }

    /// Keep only the given input channels, in the given order (weight axis 1).
    pub fn select_input_channels(&mut self, indices: &[usize]) {
        self.weight = self.weight.select(Axis(1), indices);
    }

    pub fn forward(&self, input: &Array4<f32>) -> Result<Array4<f32>> {
        let (n, c, h, w) = input.dim();
        self.check_input_channels(c)?;
        let (oh, ow) = self.output_hw(h, w)?;
        let out_c = self.out_channels();
        let wmat = self.weight_matrix()?;

        let mut output = Array4::zeros((n, out_c, oh, ow));
        for (sample, mut dst) in input.outer_iter().zip(output.outer_iter_mut()) {
            let cols = self.im2col(sample, oh, ow);
            let y = wmat
                .dot(&cols)
                .into_shape_with_order((out_c, oh, ow))
                .map_err(|e| Error::shape_mismatch("Conv2d output", (out_c, oh, ow), e))?;
            dst.assign(&y);
        }

        if let Some(bias) = &self.bias {
            for (mut plane, &b) in output.axis_iter_mut(Axis(1)).zip(bias.iter()) {
                plane += b;
            }
        }
        Ok(output)
    }

    /// Compute input, weight and bias gradients for `grad_output`
    pub fn backward(&self, input: &Array4<f32>, grad_output: &Array4<f32>) -> Result<Conv2dGrads> {
        let (n, c, h, w) = input.dim();
        self.check_input_channels(c)?;
        let (oh, ow) = self.output_hw(h, w)?;
        let out_c = self.out_channels();
        if grad_output.dim() != (n, out_c, oh, ow) {
            return Err(Error::shape_mismatch(
                "Conv2d grad_output",
                (n, out_c, oh, ow),
                grad_output.dim(),
            ));
        }

        let wmat = self.weight_matrix()?;
        let mut dw = Array2::<f32>::zeros(wmat.raw_dim());
        let mut grad_input = Array4::zeros(input.raw_dim());

        for ((sample, grad), dst) in input
            .outer_iter()
            .zip(grad_output.outer_iter())
            .zip(grad_input.outer_iter_mut())
        {
            let cols = self.im2col(sample, oh, ow);
            let g = Array2::from_shape_vec((out_c, oh * ow), grad.iter().copied().collect())
                .map_err(|e| Error::shape_mismatch("Conv2d grad rows", (out_c, oh * ow), e))?;
            dw += &g.dot(&cols.t());
            let dcols = wmat.t().dot(&g);
            self.col2im(&dcols, dst, oh, ow);
        }

        let weight = dw
            .into_shape_with_order(self.weight.dim())
            .map_err(|e| Error::shape_mismatch("Conv2d weight grad", self.weight.dim(), e))?;
        let bias = self.bias.as_ref().map(|_| {
            grad_output
                .sum_axis(Axis(0))
                .sum_axis(Axis(1))
                .sum_axis(Axis(1))
        });

        Ok(Conv2dGrads {
            input: grad_input,
            weight,
            bias,
        })
    }

    fn check_input_channels(&self, c: usize) -> Result<()> {
        if c != self.in_channels() {
            return Err(Error::shape_mismatch(
                "Conv2d input channels",
                self.in_channels(),
                c,
            ));
        }
        Ok(())
    }

    /// Weight flattened to `(C_out, C_in * kH * kW)` in `(c, ki, kj)` row order
    fn weight_matrix(&self) -> Result<Array2<f32>> {
        let (out_c, in_c, kh, kw) = self.weight.dim();
        Array2::from_shape_vec((out_c, in_c * kh * kw), self.weight.iter().copied().collect())
            .map_err(|e| Error::shape_mismatch("Conv2d weight matrix", (out_c, in_c * kh * kw), e))
    }

    fn im2col(&self, sample: ArrayView3<'_, f32>, oh: usize, ow: usize) -> Array2<f32> {
        let (c, h, w) = sample.dim();
        let (kh, kw) = self.kernel_size();
        let mut cols = Array2::zeros((c * kh * kw, oh * ow));
        for ci in 0..c {
            for ki in 0..kh {
                for kj in 0..kw {
                    let row = (ci * kh + ki) * kw + kj;
                    for oy in 0..oh {
                        let Some(iy) = self.source_index(oy, ki, h) else {
                            continue;
                        };
                        for ox in 0..ow {
                            if let Some(ix) = self.source_index(ox, kj, w) {
                                cols[[row, oy * ow + ox]] = sample[[ci, iy, ix]];
                            }
                        }
                    }
                }
            }
        }
        cols
    }

    fn col2im(&self, cols: &Array2<f32>, mut dst: ArrayViewMut3<'_, f32>, oh: usize, ow: usize) {
        let (c, h, w) = dst.dim();
        let (kh, kw) = self.kernel_size();
        for ci in 0..c {
            for ki in 0..kh {
                for kj in 0..kw {
                    let row = (ci * kh + ki) * kw + kj;
                    for oy in 0..oh {
                        let Some(iy) = self.source_index(oy, ki, h) else {
                            continue;
                        };
                        for ox in 0..ow {
                            if let Some(ix) = self.source_index(ox, kj, w) {
                                dst[[ci, iy, ix]] += cols[[row, oy * ow + ox]];
                            }
                        }
                    }
                }
            }
        }
    }

    /// Input coordinate read by output position `o` at kernel offset `k`,
    /// or `None` when it falls in the zero padding.
    fn source_index(&self, o: usize, k: usize, extent: usize) -> Option<usize> {
        (o * self.stride + k)
            .checked_sub(self.padding)
            .filter(|&i| i < extent)
    }
}
