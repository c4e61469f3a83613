//! Pooling and pointwise activation functions

use crate::{Error, Result};
use ndarray::{Array2, Array4, Axis, Zip};

/// 2D max pooling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxPool2d {
    kernel_size: usize,
    stride: usize,
}

impl MaxPool2d {
    pub fn new(kernel_size: usize, stride: usize) -> Self {
        Self {
            kernel_size: kernel_size.max(1),
            stride: stride.max(1),
        }
    }

    pub fn kernel_size(&self) -> usize {
        self.kernel_size
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn output_hw(&self, h: usize, w: usize) -> Result<(usize, usize)> {
        if h < self.kernel_size || w < self.kernel_size {
            return Err(Error::shape_mismatch(
                "MaxPool2d input smaller than kernel",
                (self.kernel_size, self.kernel_size),
                (h, w),
            ));
        }
        Ok((
            (h - self.kernel_size) / self.stride + 1,
            (w - self.kernel_size) / self.stride + 1,
        ))
    }

    pub fn forward(&self, input: &Array4<f32>) -> Result<Array4<f32>> {
        self.forward_with_indices(input).map(|(y, _)| y)
    }

    /// Forward pass that also returns the flat `y * W + x` argmax of every window
    pub fn forward_with_indices(&self, input: &Array4<f32>) -> Result<(Array4<f32>, Array4<usize>)> {
        let (n, c, h, w) = input.dim();
        let (oh, ow) = self.output_hw(h, w)?;
        let mut output = Array4::zeros((n, c, oh, ow));
        let mut indices = Array4::zeros((n, c, oh, ow));

        for b in 0..n {
            for ch in 0..c {
                for oy in 0..oh {
                    for ox in 0..ow {
                        let (y0, x0) = (oy * self.stride, ox * self.stride);
                        let mut best = f32::NEG_INFINITY;
                        let mut best_idx = y0 * w + x0;
                        for ky in 0..self.kernel_size {
                            for kx in 0..self.kernel_size {
                                let v = input[[b, ch, y0 + ky, x0 + kx]];
                                if v > best {
                                    best = v;
                                    best_idx = (y0 + ky) * w + x0 + kx;
                                }
                            }
                        }
                        output[[b, ch, oy, ox]] = best;
                        indices[[b, ch, oy, ox]] = best_idx;
                    }
                }
            }
        }
        Ok((output, indices))
    }

    /// Route each output gradient back to the input position that won its window
    pub fn backward(
        &self,
        input_dim: (usize, usize, usize, usize),
        grad_output: &Array4<f32>,
        indices: &Array4<usize>,
    ) -> Result<Array4<f32>> {
        if grad_output.dim() != indices.dim() {
            return Err(Error::shape_mismatch(
                "MaxPool2d grad_output",
                indices.dim(),
                grad_output.dim(),
            ));
        }
        let w = input_dim.3;
        let mut grad_input = Array4::zeros(input_dim);
        for ((b, ch, oy, ox), &g) in grad_output.indexed_iter() {
            let idx = indices[[b, ch, oy, ox]];
            grad_input[[b, ch, idx / w, idx % w]] += g;
        }
        Ok(grad_input)
    }
}

pub fn relu(input: &Array4<f32>) -> Array4<f32> {
    input.mapv(|v| v.max(0.0))
}

pub fn relu_backward(input: &Array4<f32>, grad_output: &Array4<f32>) -> Array4<f32> {
    let mut grad = grad_output.clone();
    Zip::from(&mut grad).and(input).for_each(|g, &x| {
        if x <= 0.0 {
            *g = 0.0;
        }
    });
    grad
}

/// Average over the spatial axes: `(N, C, H, W) -> (N, C)`
pub fn global_avg_pool(input: &Array4<f32>) -> Array2<f32> {
    let (_, _, h, w) = input.dim();
    let area = (h * w).max(1) as f32;
    input.sum_axis(Axis(3)).sum_axis(Axis(2)) / area
}

pub fn global_avg_pool_backward(
    grad_output: &Array2<f32>,
    input_dim: (usize, usize, usize, usize),
) -> Array4<f32> {
    let (n, c, h, w) = input_dim;
    let area = (h * w).max(1) as f32;
    Array4::from_shape_fn((n, c, h, w), |(b, ch, _, _)| grad_output[[b, ch]] / area)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn grid() -> Array4<f32> {
        Array4::from_shape_vec(
            (1, 1, 4, 4),
            vec![
                1.0, 2.0, 5.0, 0.0, //
                3.0, 4.0, 1.0, 7.0, //
                0.0, 9.0, 2.0, 2.0, //
                8.0, 1.0, 3.0, 6.0,
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_max_pool_forward() {
        let pool = MaxPool2d::new(2, 2);
        let y = pool.forward(&grid()).unwrap();
        assert_eq!(y.dim(), (1, 1, 2, 2));
        assert_eq!(y[[0, 0, 0, 0]], 4.0);
        assert_eq!(y[[0, 0, 0, 1]], 7.0);
        assert_eq!(y[[0, 0, 1, 0]], 9.0);
        assert_eq!(y[[0, 0, 1, 1]], 6.0);
    }

    #[test]
    fn test_max_pool_backward_routes_to_argmax() {
        let pool = MaxPool2d::new(2, 2);
        let x = grid();
        let (y, idx) = pool.forward_with_indices(&x).unwrap();
        let dx = pool.backward(x.dim(), &Array4::ones(y.raw_dim()), &idx).unwrap();
        assert_eq!(dx.sum(), 4.0);
        assert_eq!(dx[[0, 0, 1, 1]], 1.0);
        assert_eq!(dx[[0, 0, 1, 3]], 1.0);
        assert_eq!(dx[[0, 0, 2, 1]], 1.0);
        assert_eq!(dx[[0, 0, 3, 3]], 1.0);
        assert_eq!(dx[[0, 0, 0, 0]], 0.0);
    }

    #[test]
    fn test_max_pool_too_small() {
        let pool = MaxPool2d::new(3, 3);
        assert!(pool.forward(&Array4::zeros((1, 1, 2, 2))).is_err());
    }

    #[test]
    fn test_relu_and_backward() {
        let x = Array4::from_shape_vec((1, 1, 1, 3), vec![-1.0, 0.0, 2.0]).unwrap();
        let y = relu(&x);
        assert_eq!(y.as_slice().unwrap(), &[0.0, 0.0, 2.0]);
        let g = relu_backward(&x, &Array4::ones((1, 1, 1, 3)));
        assert_eq!(g.as_slice().unwrap(), &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_global_avg_pool_roundtrip_gradient() {
        let x = grid();
        let pooled = global_avg_pool(&x);
        assert_abs_diff_eq!(pooled[[0, 0]], 54.0 / 16.0, epsilon = 1e-6);
        let g = global_avg_pool_backward(&Array2::ones((1, 1)), x.dim());
        assert_abs_diff_eq!(g.sum(), 1.0, epsilon = 1e-6);
    }
}
