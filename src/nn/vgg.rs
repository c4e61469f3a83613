//! VGG-style model builder
//!
//! A layer configuration such as `8,16,M,32,M` expands to
//! `conv3x3(8) bn relu conv3x3(16) bn relu maxpool conv3x3(32) bn relu maxpool`,
//! followed by global average pooling and a linear classifier.

use super::batchnorm::BatchNorm2d;
use super::conv::Conv2d;
use super::layer::Layer;
use super::linear::Linear;
use super::model::Model;
use super::pool::MaxPool2d;
use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One entry of a VGG layer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VggEntry {
    /// 3x3 conv with this many output channels, then BN and ReLU
    Conv(usize),
    /// 2x2 max-pool with stride 2
    Pool,
}

impl FromStr for VggEntry {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("m") {
            return Ok(VggEntry::Pool);
        }
        match s.parse::<usize>() {
            Ok(0) => Err("Conv width must be > 0".to_string()),
            Ok(n) => Ok(VggEntry::Conv(n)),
            Err(_) => Err(format!(
                "Unknown VGG entry: {s}. Expected a channel count or 'M'"
            )),
        }
    }
}

/// Layer configuration for [`Model::vgg`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VggConfig {
    pub entries: Vec<VggEntry>,
    pub in_channels: usize,
    pub num_classes: usize,
}

impl VggConfig {
    /// Parse a comma-separated layer list like `64,128,M,256,256,M`
    pub fn parse(layers: &str, in_channels: usize, num_classes: usize) -> Result<Self> {
        let entries = layers
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(VggEntry::from_str)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::Config)?;
        Ok(Self {
            entries,
            in_channels,
            num_classes,
        })
    }

    /// The configuration used in the classic CIFAR-10 VGG pruning exercise
    pub fn cifar_vgg() -> Self {
        use VggEntry::{Conv, Pool};
        Self {
            entries: vec![
                Conv(64),
                Conv(128),
                Pool,
                Conv(256),
                Conv(256),
                Pool,
                Conv(512),
                Conv(512),
                Pool,
                Conv(512),
                Conv(512),
                Pool,
            ],
            in_channels: 3,
            num_classes: 10,
        }
    }
}

impl Model {
    /// Build a Kaiming-initialized VGG-style network
    pub fn vgg(config: &VggConfig, seed: u64) -> Result<Self> {
        if config.in_channels == 0 || config.num_classes == 0 {
            return Err(Error::Config(
                "in_channels and num_classes must be > 0".to_string(),
            ));
        }
        if !config.entries.iter().any(|e| matches!(e, VggEntry::Conv(_))) {
            return Err(Error::Config(
                "VGG configuration needs at least one conv entry".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut features = Vec::new();
        let mut channels = config.in_channels;
        for entry in &config.entries {
            match *entry {
                VggEntry::Conv(out) => {
                    features.push(Layer::Conv2d(Conv2d::new(
                        channels, out, 3, 1, 1, false, &mut rng,
                    )));
                    features.push(Layer::BatchNorm2d(BatchNorm2d::new(out)));
                    features.push(Layer::Relu);
                    channels = out;
                }
                VggEntry::Pool => features.push(Layer::MaxPool2d(MaxPool2d::new(2, 2))),
            }
        }
        let classifier = Linear::new(channels, config.num_classes, &mut rng);
        Model::new(features, classifier)
    }
}
