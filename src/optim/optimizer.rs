//! Optimizer trait

use crate::nn::Gradients;
use crate::{Error, Result};
use ndarray::ArrayViewMutD;

/// Trait for optimization algorithms over a model's parameter views
pub trait Optimizer {
    /// Update `params` in place from `grads`, which must be aligned with
    /// them one to one (see `Model::parameters_mut` and `Model::backward`).
    fn step(&mut self, params: &mut [ArrayViewMutD<'_, f32>], grads: &Gradients) -> Result<()>;

    /// Get learning rate
    fn lr(&self) -> f32;

    /// Set learning rate
    fn set_lr(&mut self, lr: f32);
}

/// Check that every gradient has the shape of its parameter
pub(crate) fn check_aligned(params: &[ArrayViewMutD<'_, f32>], grads: &Gradients) -> Result<()> {
    if params.len() != grads.len() {
        return Err(Error::shape_mismatch(
            "optimizer parameter count",
            params.len(),
            grads.len(),
        ));
    }
    for (i, (p, g)) in params.iter().zip(grads.iter()).enumerate() {
        if p.shape() != g.shape() {
            return Err(Error::shape_mismatch(
                format!("gradient {i}"),
                p.shape(),
                g.shape(),
            ));
        }
    }
    Ok(())
}
