//! Producer/consumer convolution pairs

use super::importance::{channel_importance, NormType};
use crate::nn::{Conv2d, Layer, Model};
use crate::{Error, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Two adjacent convolutions: `producer`'s output channels feed `consumer`.
///
/// Indices point into `Model::features`. Any `BatchNorm2d` between them
/// normalizes the producer's output channels and is sliced with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvPair {
    pub producer: usize,
    pub consumer: usize,
}

impl ConvPair {
    /// Every adjacent conv pair of `model`, in forward order
    pub fn all(model: &Model) -> Vec<ConvPair> {
        model
            .prunable_pairs()
            .into_iter()
            .map(|(producer, consumer)| ConvPair { producer, consumer })
            .collect()
    }

    /// Channels flowing between the two convolutions
    pub fn channels(&self, model: &Model) -> Result<usize> {
        Ok(conv_at(model, self.producer)?.out_channels())
    }

    /// Importance of the consumer's input channels
    pub fn consumer_importance(&self, model: &Model, norm: NormType) -> Result<Array1<f32>> {
        channel_importance(&conv_at(model, self.consumer)?.weight, norm)
    }

    /// Keep only `indices` (in that order) on every tensor that carries this
    /// pair's channels: producer outputs, intermediate BatchNorm vectors and
    /// consumer inputs.
    pub fn select_channels(&self, model: &mut Model, indices: &[usize]) -> Result<()> {
        if self.producer >= self.consumer {
            return Err(Error::Config(format!(
                "producer features.{} must precede consumer features.{}",
                self.producer, self.consumer
            )));
        }
        let channels = self.channels(model)?;
        if let Some(&bad) = indices.iter().find(|&&i| i >= channels) {
            return Err(Error::shape_mismatch(
                format!("channel index for pair {}->{}", self.producer, self.consumer),
                format!("< {channels}"),
                bad,
            ));
        }

        conv_at_mut(model, self.producer)?.select_output_channels(indices);
        for layer in &mut model.features[self.producer + 1..self.consumer] {
            if let Layer::BatchNorm2d(bn) = layer {
                bn.select_channels(indices);
            }
        }
        conv_at_mut(model, self.consumer)?.select_input_channels(indices);
        Ok(())
    }
}

fn conv_at(model: &Model, index: usize) -> Result<&Conv2d> {
    model
        .features
        .get(index)
        .and_then(Layer::as_conv)
        .ok_or_else(|| Error::Config(format!("features.{index} is not a Conv2d layer")))
}

fn conv_at_mut(model: &mut Model, index: usize) -> Result<&mut Conv2d> {
    model
        .features
        .get_mut(index)
        .and_then(Layer::as_conv_mut)
        .ok_or_else(|| Error::Config(format!("features.{index} is not a Conv2d layer")))
}
