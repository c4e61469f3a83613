//! Confusion matrix for multi-class classification

use serde::{Deserialize, Serialize};

/// Element `[t][p]` counts samples with true label `t` predicted as `p`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    matrix: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn new(n_classes: usize) -> Self {
        Self {
            matrix: vec![vec![0; n_classes]; n_classes],
        }
    }

    /// Count one prediction; labels outside the matrix are ignored
    pub fn record(&mut self, true_label: usize, predicted: usize) {
        if let Some(cell) = self
            .matrix
            .get_mut(true_label)
            .and_then(|row| row.get_mut(predicted))
        {
            *cell += 1;
        }
    }

    pub fn n_classes(&self) -> usize {
        self.matrix.len()
    }

    pub fn get(&self, true_label: usize, predicted: usize) -> usize {
        self.matrix[true_label][predicted]
    }

    pub fn matrix(&self) -> &[Vec<usize>] {
        &self.matrix
    }

    /// Samples whose true label is `class`
    pub fn support(&self, class: usize) -> usize {
        self.matrix[class].iter().sum()
    }

    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    pub fn correct(&self) -> usize {
        (0..self.n_classes()).map(|c| self.matrix[c][c]).sum()
    }

    pub fn accuracy(&self) -> f32 {
        match self.total() {
            0 => 0.0,
            total => self.correct() as f32 / total as f32,
        }
    }

    /// Recall of each class; classes without samples report 0
    pub fn per_class_accuracy(&self) -> Vec<f32> {
        (0..self.n_classes())
            .map(|c| match self.support(c) {
                0 => 0.0,
                support => self.matrix[c][c] as f32 / support as f32,
            })
            .collect()
    }
}
