//! Stochastic Gradient Descent optimizer

use super::optimizer::{check_aligned, Optimizer};
use crate::nn::Gradients;
use crate::Result;
use ndarray::{ArrayD, ArrayViewMutD, Zip};

/// SGD with momentum and L2 weight decay.
///
/// ```text
/// g = grad + weight_decay * p
/// v = momentum * v + g
/// p = p - lr * v
/// ```
#[derive(Debug, Clone)]
pub struct Sgd {
    lr: f32,
    momentum: f32,
    weight_decay: f32,
    velocities: Vec<ArrayD<f32>>,
}

impl Sgd {
    pub fn new(lr: f32, momentum: f32) -> Self {
        Self {
            lr,
            momentum,
            weight_decay: 0.0,
            velocities: Vec::new(),
        }
    }

    pub fn with_weight_decay(mut self, weight_decay: f32) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    pub fn momentum(&self) -> f32 {
        self.momentum
    }

    pub fn weight_decay(&self) -> f32 {
        self.weight_decay
    }

    /// Zero velocities when the parameter layout changes
    fn ensure_velocities(&mut self, params: &[ArrayViewMutD<'_, f32>]) {
        let matches = self.velocities.len() == params.len()
            && self
                .velocities
                .iter()
                .zip(params)
                .all(|(v, p)| v.shape() == p.shape());
        if !matches {
            self.velocities = params.iter().map(|p| ArrayD::zeros(p.raw_dim())).collect();
        }
    }
}

impl Optimizer for Sgd {
    fn step(&mut self, params: &mut [ArrayViewMutD<'_, f32>], grads: &Gradients) -> Result<()> {
        check_aligned(params, grads)?;
        self.ensure_velocities(params);

        let (lr, momentum, weight_decay) = (self.lr, self.momentum, self.weight_decay);
        for ((param, grad), velocity) in params
            .iter_mut()
            .zip(grads.iter())
            .zip(self.velocities.iter_mut())
        {
            Zip::from(param)
                .and(grad)
                .and(velocity)
                .for_each(|p, &g, v| {
                    let g = g + weight_decay * *p;
                    *v = momentum * *v + g;
                    *p -= lr * *v;
                });
        }
        Ok(())
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }
}
