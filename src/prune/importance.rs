//! Magnitude-based channel importance.
//!
//! The importance of input channel `c` of a convolution is the norm of
//! `weight[:, c, :, :]`: every output channel and every kernel position
//! that reads from `c`. Channels with small weights contribute little to
//! the consumer's output and are the first to be removed.

use crate::{Error, Result};
use ndarray::{Array1, Array4, Axis};
use serde::{Deserialize, Serialize};

/// Norm used to score a channel slice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormType {
    /// Sum of absolute values
    L1,
    /// Euclidean (Frobenius) norm
    #[default]
    L2,
}

impl std::str::FromStr for NormType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "l1" => Ok(NormType::L1),
            "l2" | "fro" | "frobenius" => Ok(NormType::L2),
            _ => Err(format!("Unknown norm: {s}. Valid norms: l1, l2")),
        }
    }
}

impl std::fmt::Display for NormType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NormType::L1 => write!(f, "l1"),
            NormType::L2 => write!(f, "l2"),
        }
    }
}

/// Score every input channel of a `(C_out, C_in, kH, kW)` weight tensor.
///
/// Returns one non-negative score per input channel, in channel order.
pub fn channel_importance(weight: &Array4<f32>, norm: NormType) -> Result<Array1<f32>> {
    let scores: Array1<f32> = weight
        .axis_iter(Axis(1))
        .map(|slice| match norm {
            NormType::L1 => slice.iter().map(|v| v.abs()).sum(),
            NormType::L2 => slice.iter().map(|v| v * v).sum::<f32>().sqrt(),
        })
        .collect();

    if let Some(channel) = scores.iter().position(|s| !s.is_finite()) {
        return Err(Error::NumericalInstability {
            method: format!("{norm} channel importance"),
            details: format!("non-finite score for input channel {channel}"),
        });
    }
    Ok(scores)
}

/// Channel indices ordered by descending score.
///
/// Equal scores keep ascending index order.
pub fn sort_permutation(scores: &Array1<f32>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    order
}

/// The `k` most important channels, most important first
pub fn top_k_channels(scores: &Array1<f32>, k: usize) -> Vec<usize> {
    let mut order = sort_permutation(scores);
    order.truncate(k);
    order
}

/// Summary statistics of a score vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImportanceStats {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    pub channels: usize,
}

impl ImportanceStats {
    pub fn from_scores(scores: &Array1<f32>) -> Self {
        if scores.is_empty() {
            return Self {
                min: 0.0,
                max: 0.0,
                mean: 0.0,
                channels: 0,
            };
        }
        Self {
            min: scores.iter().copied().fold(f32::INFINITY, f32::min),
            max: scores.iter().copied().fold(f32::NEG_INFINITY, f32::max),
            mean: scores.sum() / scores.len() as f32,
            channels: scores.len(),
        }
    }
}
