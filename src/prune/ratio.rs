//! Prune ratios and keep counts

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fraction of channels to remove, either for every pair or per pair.
///
/// A model with `N` convolutions has `N - 1` prunable pairs; the last
/// convolution feeds the classifier and always keeps its width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PruneRatio {
    /// Same ratio for every pair
    Uniform(f64),
    /// One ratio per pair, in forward order
    PerLayer(Vec<f64>),
}

impl Default for PruneRatio {
    fn default() -> Self {
        PruneRatio::Uniform(0.0)
    }
}

impl PruneRatio {
    /// Expand to one validated ratio per pair for a model with `num_convs`
    /// convolutions.
    pub fn resolve(&self, num_convs: usize) -> Result<Vec<f64>> {
        let pairs = num_convs.saturating_sub(1);
        let ratios = match self {
            PruneRatio::Uniform(r) => {
                check_ratio(0, *r)?;
                vec![*r; pairs]
            }
            PruneRatio::PerLayer(list) => {
                if list.len() != pairs {
                    return Err(Error::Config(format!(
                        "prune ratio list has {} entries, expected {} (one per prunable pair of a \
                         model with {} conv layers)",
                        list.len(),
                        pairs,
                        num_convs
                    )));
                }
                list.clone()
            }
        };
        for (pair, &r) in ratios.iter().enumerate() {
            check_ratio(pair, r)?;
        }
        Ok(ratios)
    }

    /// Check every value without a model at hand
    pub fn validate(&self) -> Result<()> {
        match self {
            PruneRatio::Uniform(r) => check_ratio(0, *r),
            PruneRatio::PerLayer(list) => list
                .iter()
                .enumerate()
                .try_for_each(|(pair, &r)| check_ratio(pair, r)),
        }
    }

    /// Largest ratio requested for any pair
    pub fn max(&self) -> f64 {
        match self {
            PruneRatio::Uniform(r) => *r,
            PruneRatio::PerLayer(list) => list.iter().copied().fold(0.0, f64::max),
        }
    }
}

impl From<f64> for PruneRatio {
    fn from(r: f64) -> Self {
        PruneRatio::Uniform(r)
    }
}

impl From<Vec<f64>> for PruneRatio {
    fn from(list: Vec<f64>) -> Self {
        PruneRatio::PerLayer(list)
    }
}

impl FromStr for PruneRatio {
    type Err = String;

    /// `0.5` is uniform; `0.3,0.5,0.7` is per pair
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|v| {
                v.trim()
                    .parse::<f64>()
                    .map_err(|e| format!("Invalid prune ratio '{}': {e}", v.trim()))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        if s.contains(',') {
            Ok(PruneRatio::PerLayer(values))
        } else {
            values
                .first()
                .copied()
                .map(PruneRatio::Uniform)
                .ok_or_else(|| "Empty prune ratio".to_string())
        }
    }
}

impl fmt::Display for PruneRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PruneRatio::Uniform(r) => write!(f, "{r}"),
            PruneRatio::PerLayer(list) => {
                let parts: Vec<String> = list.iter().map(f64::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

fn check_ratio(pair: usize, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidPruneRatio { pair, value })
    }
}

/// Channels kept when pruning `channels` by `ratio`: `round((1 - ratio) * channels)`,
/// with ties rounding to even.
pub fn keep_count(channels: usize, ratio: f64) -> usize {
    ((1.0 - ratio) * channels as f64).round_ties_even() as usize
}

/// [`keep_count`] for pair `pair`, rejecting invalid ratios and empty layers
pub fn checked_keep_count(pair: usize, channels: usize, ratio: f64) -> Result<usize> {
    check_ratio(pair, ratio)?;
    let keep = keep_count(channels, ratio);
    if keep == 0 {
        return Err(Error::DegenerateKeepCount {
            pair,
            ratio,
            channels,
            keep,
        });
    }
    Ok(keep)
}
