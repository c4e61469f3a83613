//! Spatial layer enum and its serializable architecture description

use super::batchnorm::BatchNorm2d;
use super::conv::Conv2d;
use super::pool::{relu, MaxPool2d};
use crate::Result;
use ndarray::{Array4, ArrayViewMutD};
use serde::{Deserialize, Serialize};

/// A layer in the convolutional feature extractor
#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    Conv2d(Conv2d),
    BatchNorm2d(BatchNorm2d),
    Relu,
    MaxPool2d(MaxPool2d),
}

impl Layer {
    pub fn kind(&self) -> &'static str {
        match self {
            Layer::Conv2d(_) => "Conv2d",
            Layer::BatchNorm2d(_) => "BatchNorm2d",
            Layer::Relu => "ReLU",
            Layer::MaxPool2d(_) => "MaxPool2d",
        }
    }

    pub fn forward(&self, input: &Array4<f32>) -> Result<Array4<f32>> {
        match self {
            Layer::Conv2d(conv) => conv.forward(input),
            Layer::BatchNorm2d(bn) => bn.forward(input),
            Layer::Relu => Ok(relu(input)),
            Layer::MaxPool2d(pool) => pool.forward(input),
        }
    }

    pub fn parameter_count(&self) -> usize {
        match self {
            Layer::Conv2d(conv) => conv.parameter_count(),
            Layer::BatchNorm2d(bn) => bn.parameter_count(),
            Layer::Relu | Layer::MaxPool2d(_) => 0,
        }
    }

    /// Mutable views of the learnable tensors, weight before bias
    pub fn parameters_mut(&mut self) -> Vec<ArrayViewMutD<'_, f32>> {
        match self {
            Layer::Conv2d(conv) => {
                let mut params = vec![conv.weight.view_mut().into_dyn()];
                if let Some(bias) = conv.bias.as_mut() {
                    params.push(bias.view_mut().into_dyn());
                }
                params
            }
            Layer::BatchNorm2d(bn) => vec![
                bn.weight.view_mut().into_dyn(),
                bn.bias.view_mut().into_dyn(),
            ],
            Layer::Relu | Layer::MaxPool2d(_) => Vec::new(),
        }
    }

    pub fn as_conv(&self) -> Option<&Conv2d> {
        match self {
            Layer::Conv2d(conv) => Some(conv),
            _ => None,
        }
    }

    pub fn as_conv_mut(&mut self) -> Option<&mut Conv2d> {
        match self {
            Layer::Conv2d(conv) => Some(conv),
            _ => None,
        }
    }

    pub fn spec(&self) -> LayerSpec {
        match self {
            Layer::Conv2d(conv) => LayerSpec::Conv2d {
                in_channels: conv.in_channels(),
                out_channels: conv.out_channels(),
                kernel_size: conv.kernel_size(),
                stride: conv.stride(),
                padding: conv.padding(),
                bias: conv.bias.is_some(),
            },
            Layer::BatchNorm2d(bn) => LayerSpec::BatchNorm2d {
                num_features: bn.num_features(),
                eps: bn.eps(),
            },
            Layer::Relu => LayerSpec::Relu,
            Layer::MaxPool2d(pool) => LayerSpec::MaxPool2d {
                kernel_size: pool.kernel_size(),
                stride: pool.stride(),
            },
        }
    }
}

/// Shape-level description of one feature layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerSpec {
    Conv2d {
        in_channels: usize,
        out_channels: usize,
        kernel_size: (usize, usize),
        stride: usize,
        padding: usize,
        bias: bool,
    },
    #[serde(rename = "batch_norm2d")]
    BatchNorm2d { num_features: usize, eps: f32 },
    Relu,
    #[serde(rename = "max_pool2d")]
    MaxPool2d { kernel_size: usize, stride: usize },
}

/// Classifier head description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierSpec {
    pub in_features: usize,
    pub out_features: usize,
}

/// Full model architecture, stored alongside the weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Architecture {
    pub features: Vec<LayerSpec>,
    pub classifier: ClassifierSpec,
}
