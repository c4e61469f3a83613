//! Mini-batch iteration over a [`Dataset`]

use super::dataset::Dataset;
use ndarray::Array4;
use rand::seq::SliceRandom;
use rand::Rng;

/// One mini-batch of images and labels
#[derive(Debug, Clone)]
pub struct Batch {
    pub images: Array4<f32>,
    pub labels: Vec<usize>,
}

impl Batch {
    /// Number of samples in the batch
    pub fn size(&self) -> usize {
        self.labels.len()
    }
}

/// Yields batches of at most `batch_size` samples; the last may be smaller.
#[derive(Debug, Clone)]
pub struct DataLoader<'a> {
    dataset: &'a Dataset,
    batch_size: usize,
    order: Vec<usize>,
    cursor: usize,
}

impl<'a> DataLoader<'a> {
    /// Samples in dataset order
    pub fn sequential(dataset: &'a Dataset, batch_size: usize) -> Self {
        Self {
            dataset,
            batch_size: batch_size.max(1),
            order: (0..dataset.len()).collect(),
            cursor: 0,
        }
    }

    /// Samples in an order drawn from `rng`
    pub fn shuffled<R: Rng + ?Sized>(dataset: &'a Dataset, batch_size: usize, rng: &mut R) -> Self {
        let mut loader = Self::sequential(dataset, batch_size);
        loader.order.shuffle(rng);
        loader
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Total batches per pass
    pub fn num_batches(&self) -> usize {
        self.order.len().div_ceil(self.batch_size)
    }
}

impl Iterator for DataLoader<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if self.cursor >= self.order.len() {
            return None;
        }
        let end = (self.cursor + self.batch_size).min(self.order.len());
        let (images, labels) = self.dataset.gather(&self.order[self.cursor..end]);
        self.cursor = end;
        Some(Batch { images, labels })
    }
}
