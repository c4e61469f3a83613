//! In-memory NCHW image dataset

use crate::{Error, Result};
use ndarray::{Array4, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Images with one class label each
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    images: Array4<f32>,
    labels: Vec<usize>,
    num_classes: usize,
}

impl Dataset {
    /// Build a dataset, checking one label per image and `label < num_classes`
    pub fn new(images: Array4<f32>, labels: Vec<usize>, num_classes: usize) -> Result<Self> {
        if images.len_of(Axis(0)) != labels.len() {
            return Err(Error::shape_mismatch(
                "dataset labels",
                images.len_of(Axis(0)),
                labels.len(),
            ));
        }
        if num_classes == 0 {
            return Err(Error::Config("num_classes must be > 0".to_string()));
        }
        if let Some((i, &label)) = labels.iter().enumerate().find(|&(_, &l)| l >= num_classes) {
            return Err(Error::Config(format!(
                "label {label} of sample {i} is out of range for {num_classes} classes"
            )));
        }
        Ok(Self {
            images,
            labels,
            num_classes,
        })
    }

    /// Class-separable random data for smoke runs and tests.
    ///
    /// Every class gets a prototype image (a per-channel offset plus a
    /// spatial pattern); samples are their class prototype plus uniform
    /// noise. Labels cycle through the classes.
    pub fn synthetic(config: &SyntheticConfig) -> Result<Self> {
        config.validate()?;
        let SyntheticConfig {
            samples,
            classes,
            channels,
            height,
            width,
            noise,
            seed,
        } = *config;

        let mut rng = StdRng::seed_from_u64(seed);
        let offsets = Array4::from_shape_simple_fn((classes, channels, 1, 1), || {
            rng.random_range(-1.0f32..1.0)
        });
        let patterns = Array4::from_shape_simple_fn((classes, channels, height, width), || {
            rng.random_range(-0.5f32..0.5)
        });

        let labels: Vec<usize> = (0..samples).map(|i| i % classes).collect();
        let mut images = Array4::zeros((samples, channels, height, width));
        for ((n, c, y, x), v) in images.indexed_iter_mut() {
            let class = labels[n];
            let jitter = if noise > 0.0 {
                rng.random_range(-noise..noise)
            } else {
                0.0
            };
            *v = offsets[[class, c, 0, 0]] + patterns[[class, c, y, x]] + jitter;
        }
        Self::new(images, labels, classes)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// `(channels, height, width)` of each image
    pub fn image_shape(&self) -> (usize, usize, usize) {
        let (_, c, h, w) = self.images.dim();
        (c, h, w)
    }

    pub fn images(&self) -> &Array4<f32> {
        &self.images
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Copy out the samples at `indices`
    pub fn gather(&self, indices: &[usize]) -> (Array4<f32>, Vec<usize>) {
        let images = self.images.select(Axis(0), indices);
        let labels = indices.iter().map(|&i| self.labels[i]).collect();
        (images, labels)
    }

    /// Samples per class
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.num_classes];
        for &label in &self.labels {
            counts[label] += 1;
        }
        counts
    }
}

/// Parameters for [`Dataset::synthetic`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyntheticConfig {
    pub samples: usize,
    pub classes: usize,
    pub channels: usize,
    pub height: usize,
    pub width: usize,
    /// Half-width of the uniform noise added to each pixel
    pub noise: f32,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            samples: 256,
            classes: 10,
            channels: 3,
            height: 16,
            width: 16,
            noise: 0.3,
            seed: 42,
        }
    }
}

impl SyntheticConfig {
    pub fn validate(&self) -> Result<()> {
        if self.samples == 0 {
            return Err(Error::EmptyDataset("synthetic dataset with 0 samples".to_string()));
        }
        if self.classes == 0 || self.channels == 0 || self.height == 0 || self.width == 0 {
            return Err(Error::Config(format!(
                "synthetic dataset dimensions must be > 0 (classes={}, channels={}, size={}x{})",
                self.classes, self.channels, self.height, self.width
            )));
        }
        if !self.noise.is_finite() || self.noise < 0.0 {
            return Err(Error::Config(format!(
                "noise must be finite and >= 0, got {}",
                self.noise
            )));
        }
        Ok(())
    }
}
