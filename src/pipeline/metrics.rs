//! Metrics collected during a pipeline run

use super::stage::PruningStage;
use crate::eval::{EvalResult, ModelSize};
use crate::prune::{PairImportance, PairReport, PruneRatio};
use serde::{Deserialize, Serialize};

/// Accuracy, size and channel counts before and after pruning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PruningMetrics {
    /// Requested prune ratio.
    pub prune_ratio: PruneRatio,
    /// Dense model evaluation.
    pub dense: Option<EvalResult>,
    /// Evaluation right after pruning.
    pub pruned: Option<EvalResult>,
    /// Evaluation after fine-tuning, if it ran.
    pub finetuned: Option<EvalResult>,
    pub dense_size: Option<ModelSize>,
    pub pruned_size: Option<ModelSize>,
    /// Per-pair importance of the dense model's channels.
    pub importance: Vec<PairImportance>,
    /// Per-pair channel counts.
    pub pairs: Vec<PairReport>,
    /// Fine-tuning loss curve, one entry per epoch.
    pub finetune_losses: Vec<f32>,
    /// Validation accuracy after each fine-tuning epoch.
    pub finetune_accuracies: Vec<f32>,
    /// Duration of each stage in seconds.
    pub stage_durations: Vec<(PruningStage, f64)>,
}

impl PruningMetrics {
    pub fn new(prune_ratio: PruneRatio) -> Self {
        Self {
            prune_ratio,
            ..Default::default()
        }
    }

    /// Record stage duration.
    pub fn record_stage_duration(&mut self, stage: PruningStage, duration_secs: f64) {
        self.stage_durations.push((stage, duration_secs));
    }

    /// Accuracy of the model the pipeline returns
    pub fn final_accuracy(&self) -> Option<f32> {
        self.finetuned
            .as_ref()
            .or(self.pruned.as_ref())
            .map(|r| r.accuracy)
    }

    /// Dense accuracy minus final accuracy
    pub fn accuracy_drop(&self) -> Option<f32> {
        Some(self.dense.as_ref()?.accuracy - self.final_accuracy()?)
    }

    /// Fraction of storage removed, `1 - pruned_bits / dense_bits`
    pub fn size_reduction(&self) -> Option<f64> {
        let dense = self.dense_size?.bits();
        let pruned = self.pruned_size?.bits();
        if dense == 0 {
            return None;
        }
        Some(1.0 - pruned as f64 / dense as f64)
    }

    /// Dense size over pruned size
    pub fn compression_ratio(&self) -> Option<f64> {
        Some(self.pruned_size?.compression_from(&self.dense_size?))
    }

    /// Fraction of inter-pair channels removed
    pub fn channel_sparsity(&self) -> f32 {
        let total: usize = self.pairs.iter().map(|p| p.original_channels).sum();
        if total == 0 {
            return 0.0;
        }
        let removed: usize = self.pairs.iter().map(PairReport::removed_channels).sum();
        removed as f32 / total as f32
    }

    /// Get total pipeline duration.
    pub fn total_duration_secs(&self) -> f64 {
        self.stage_durations.iter().map(|(_, d)| d).sum()
    }
}
