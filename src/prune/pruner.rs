//! Structured channel pruner

use super::importance::{ImportanceStats, NormType};
use super::pair::ConvPair;
use super::ratio::{checked_keep_count, PruneRatio};
use super::sort::sort_pair;
use super::truncate::truncate_pair;
use crate::nn::Model;
use crate::Result;
use serde::{Deserialize, Serialize};

/// What happened to one producer/consumer pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairReport {
    /// Index of the pair in forward order
    pub index: usize,
    pub pair: ConvPair,
    pub ratio: f64,
    pub original_channels: usize,
    pub kept_channels: usize,
}

impl PairReport {
    pub fn removed_channels(&self) -> usize {
        self.original_channels - self.kept_channels
    }

    /// True when the pair is left untouched
    pub fn is_noop(&self) -> bool {
        self.kept_channels == self.original_channels
    }
}

/// Importance summary of one pair's channels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairImportance {
    /// Index of the pair in forward order
    pub index: usize,
    pub pair: ConvPair,
    pub stats: ImportanceStats,
}

/// Pruned model plus per-pair report
#[derive(Debug, Clone)]
pub struct PruneOutcome {
    pub model: Model,
    pub pairs: Vec<PairReport>,
}

impl PruneOutcome {
    pub fn removed_channels(&self) -> usize {
        self.pairs.iter().map(PairReport::removed_channels).sum()
    }
}

/// Removes the least important channels of every conv pair.
///
/// Each pair is sorted by the consumer's input-channel importance, then
/// truncated to `round((1 - ratio) * channels)` channels. The input model
/// is never modified; a pruned copy is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelPruner {
    norm: NormType,
    sort_channels: bool,
}

impl Default for ChannelPruner {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelPruner {
    /// L2 importance with sorting enabled
    pub fn new() -> Self {
        Self {
            norm: NormType::L2,
            sort_channels: true,
        }
    }

    pub fn with_norm(mut self, norm: NormType) -> Self {
        self.norm = norm;
        self
    }

    /// Disable sorting to truncate by channel index alone
    pub fn with_channel_sorting(mut self, enabled: bool) -> Self {
        self.sort_channels = enabled;
        self
    }

    pub fn norm(&self) -> NormType {
        self.norm
    }

    pub fn sorts_channels(&self) -> bool {
        self.sort_channels
    }

    /// Score every pair's channels by the consumer's input-channel norm
    pub fn importance(&self, model: &Model) -> Result<Vec<PairImportance>> {
        ConvPair::all(model)
            .into_iter()
            .enumerate()
            .map(|(index, pair)| {
                let scores = pair.consumer_importance(model, self.norm)?;
                Ok(PairImportance {
                    index,
                    pair,
                    stats: ImportanceStats::from_scores(&scores),
                })
            })
            .collect()
    }

    /// Resolve ratios and keep counts without touching any tensor.
    ///
    /// Fails on a ratio list of the wrong length, a ratio outside
    /// `[0, 1]` or a ratio that would keep zero channels.
    pub fn plan(&self, model: &Model, ratio: &PruneRatio) -> Result<Vec<PairReport>> {
        let pairs = ConvPair::all(model);
        let ratios = ratio.resolve(model.conv_indices().len())?;
        pairs
            .into_iter()
            .zip(ratios)
            .enumerate()
            .map(|(index, (pair, ratio))| {
                let original_channels = pair.channels(model)?;
                let kept_channels = checked_keep_count(index, original_channels, ratio)?;
                Ok(PairReport {
                    index,
                    pair,
                    ratio,
                    original_channels,
                    kept_channels,
                })
            })
            .collect()
    }

    /// Prune a copy of `model`.
    ///
    /// Pairs whose keep count equals their width are left exactly as they
    /// are, so a ratio of zero returns an identical model.
    pub fn prune(&self, model: &Model, ratio: &PruneRatio) -> Result<PruneOutcome> {
        model.validate()?;
        let pairs = self.plan(model, ratio)?;

        let mut pruned = model.clone();
        for report in pairs.iter().filter(|r| !r.is_noop()) {
            if self.sort_channels {
                sort_pair(&mut pruned, report.pair, self.norm)?;
            }
            truncate_pair(&mut pruned, report.pair, report.kept_channels)?;
        }
        pruned.validate()?;

        Ok(PruneOutcome {
            model: pruned,
            pairs,
        })
    }
}
