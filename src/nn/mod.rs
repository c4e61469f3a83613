//! Convolutional network primitives
//!
//! A small CPU implementation of the layers a VGG-style image classifier
//! needs, with forward and backward passes over `ndarray` tensors:
//!
//! - [`Conv2d`] - im2col convolution with optional bias
//! - [`BatchNorm2d`] - inference-mode batch normalization
//! - [`MaxPool2d`] and ReLU
//! - [`Linear`] - classifier head
//! - [`Model`] - feature layers + global average pooling + head

mod batchnorm;
mod conv;
pub mod init;
mod layer;
mod linear;
mod model;
mod pool;
mod vgg;

#[cfg(test)]
mod tests;

pub use batchnorm::{BatchNorm2d, BatchNorm2dGrads};
pub use conv::{Conv2d, Conv2dGrads};
pub use layer::{Architecture, ClassifierSpec, Layer, LayerSpec};
pub use linear::{Linear, LinearGrads};
pub use model::{ForwardCache, Gradients, Model};
pub use pool::{global_avg_pool, relu, MaxPool2d};
pub use vgg::{VggConfig, VggEntry};
