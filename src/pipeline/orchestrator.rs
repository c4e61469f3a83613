//! Prune-Finetune pipeline orchestrator

use super::metrics::PruningMetrics;
use super::stage::{EvalPhase, PruningStage};
use crate::data::Dataset;
use crate::eval::{EvalResult, Evaluator, ModelSize};
use crate::nn::Model;
use crate::prune::{ChannelPruner, NormType, PairImportance, PairReport, PruneRatio};
use crate::train::{EpochReport, FinetuneConfig, Finetuner};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Everything the pipeline needs besides the model and data
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub ratio: PruneRatio,
    pub norm: NormType,
    pub sort_channels: bool,
    pub eval_batch_size: usize,
    pub bits_per_element: u32,
    /// Fine-tune after pruning when set
    pub finetune: Option<FinetuneConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ratio: PruneRatio::default(),
            norm: NormType::L2,
            sort_channels: true,
            eval_batch_size: 64,
            bits_per_element: 32,
            finetune: None,
        }
    }
}

impl PipelineConfig {
    pub fn new(ratio: PruneRatio) -> Self {
        Self {
            ratio,
            ..Default::default()
        }
    }

    pub fn with_finetune(mut self, finetune: FinetuneConfig) -> Self {
        self.finetune = Some(finetune);
        self
    }

    pub fn pruner(&self) -> ChannelPruner {
        ChannelPruner::new()
            .with_norm(self.norm)
            .with_channel_sorting(self.sort_channels)
    }
}

/// Progress notifications sent to the observer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    StageStarted(PruningStage),
    Evaluated {
        phase: EvalPhase,
        result: EvalResult,
        size: ModelSize,
    },
    ImportanceComputed(Vec<PairImportance>),
    Planned(Vec<PairReport>),
    Pruned(Vec<PairReport>),
    EpochFinished(EpochReport),
    Failed(String),
}

/// Pruned (and possibly fine-tuned) model with its metrics
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub model: Model,
    pub metrics: PruningMetrics,
}

/// Prune-Finetune pipeline orchestrator.
///
/// Stages advance in a fixed order; any error moves the pipeline to
/// `Failed` and keeps the message.
#[derive(Debug, Clone)]
pub struct PruneFinetunePipeline {
    config: PipelineConfig,
    stage: PruningStage,
    metrics: PruningMetrics,
    error: Option<String>,
}

impl PruneFinetunePipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let metrics = PruningMetrics::new(config.ratio.clone());
        Self {
            config,
            stage: PruningStage::Idle,
            metrics,
            error: None,
        }
    }

    pub fn stage(&self) -> PruningStage {
        self.stage
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &PruningMetrics {
        &self.metrics
    }

    /// Get the error message if failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Advance to the next stage.
    pub fn advance(&mut self) {
        self.stage = match self.stage {
            PruningStage::Idle => PruningStage::Evaluating(EvalPhase::Baseline),
            PruningStage::Evaluating(EvalPhase::Baseline) => PruningStage::ComputingImportance,
            PruningStage::ComputingImportance => PruningStage::Pruning,
            PruningStage::Pruning => PruningStage::Evaluating(EvalPhase::Pruned),
            PruningStage::Evaluating(EvalPhase::Pruned) => {
                if self.config.finetune.is_some() {
                    PruningStage::FineTuning
                } else {
                    PruningStage::Complete
                }
            }
            PruningStage::FineTuning => PruningStage::Evaluating(EvalPhase::Finetuned),
            PruningStage::Evaluating(EvalPhase::Finetuned) => PruningStage::Complete,
            // Terminal states don't advance
            PruningStage::Complete | PruningStage::Failed => self.stage,
        };
    }

    /// Mark the pipeline as failed with an error message.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        self.stage = PruningStage::Failed;
    }

    /// Reset the pipeline to idle state.
    pub fn reset(&mut self) {
        self.stage = PruningStage::Idle;
        self.metrics = PruningMetrics::new(self.config.ratio.clone());
        self.error = None;
    }

    pub fn is_complete(&self) -> bool {
        self.stage.is_terminal()
    }

    pub fn succeeded(&self) -> bool {
        self.stage == PruningStage::Complete
    }

    pub fn failed(&self) -> bool {
        self.stage == PruningStage::Failed
    }

    /// Get overall pipeline progress (0.0 to 1.0).
    pub fn overall_progress(&self) -> f32 {
        match self.stage {
            PruningStage::Idle => 0.0,
            PruningStage::Evaluating(EvalPhase::Baseline) => 0.1,
            PruningStage::ComputingImportance => 0.25,
            PruningStage::Pruning => 0.4,
            PruningStage::Evaluating(EvalPhase::Pruned) => 0.5,
            PruningStage::FineTuning => 0.6,
            PruningStage::Evaluating(EvalPhase::Finetuned) => 0.9,
            PruningStage::Complete => 1.0,
            PruningStage::Failed => 0.0,
        }
    }

    /// Run every stage on `model`, which is left untouched.
    ///
    /// `test` is used for every evaluation and as the fine-tuning
    /// validation set. `train` is required only when fine-tuning is
    /// configured.
    pub fn run<F>(
        &mut self,
        model: &Model,
        test: &Dataset,
        train: Option<&Dataset>,
        mut observer: F,
    ) -> Result<PipelineOutput>
    where
        F: FnMut(&PipelineEvent),
    {
        if self.stage != PruningStage::Idle {
            return Err(Error::Config(format!(
                "pipeline is in stage {}, reset it before running again",
                self.stage
            )));
        }
        let result = self.execute(model, test, train, &mut observer);
        if let Err(e) = &result {
            let message = e.to_string();
            self.fail(message.clone());
            observer(&PipelineEvent::Failed(message));
        }
        result
    }

    fn execute<F>(
        &mut self,
        model: &Model,
        test: &Dataset,
        train: Option<&Dataset>,
        observer: &mut F,
    ) -> Result<PipelineOutput>
    where
        F: FnMut(&PipelineEvent),
    {
        let evaluator = Evaluator::new(self.config.eval_batch_size);
        let pruner = self.config.pruner();
        let bits = self.config.bits_per_element;
        if self.config.finetune.is_some() && train.is_none() {
            return Err(Error::Config(
                "fine-tuning is enabled but no training set was given".to_string(),
            ));
        }
        let mut clock = Instant::now();

        self.transition(&mut clock, observer);
        let dense = evaluator.evaluate(model, test)?;
        let dense_size = ModelSize::of(model, bits);
        observer(&PipelineEvent::Evaluated {
            phase: EvalPhase::Baseline,
            result: dense.clone(),
            size: dense_size,
        });
        self.metrics.dense = Some(dense);
        self.metrics.dense_size = Some(dense_size);

        self.transition(&mut clock, observer);
        let importance = pruner.importance(model)?;
        observer(&PipelineEvent::ImportanceComputed(importance.clone()));
        self.metrics.importance = importance;
        let plan = pruner.plan(model, &self.config.ratio)?;
        observer(&PipelineEvent::Planned(plan));

        self.transition(&mut clock, observer);
        let outcome = pruner.prune(model, &self.config.ratio)?;
        let mut pruned = outcome.model;
        let pruned_size = ModelSize::of(&pruned, bits);
        observer(&PipelineEvent::Pruned(outcome.pairs.clone()));
        self.metrics.pairs = outcome.pairs;
        self.metrics.pruned_size = Some(pruned_size);

        self.transition(&mut clock, observer);
        let after_prune = evaluator.evaluate(&pruned, test)?;
        observer(&PipelineEvent::Evaluated {
            phase: EvalPhase::Pruned,
            result: after_prune.clone(),
            size: pruned_size,
        });
        self.metrics.pruned = Some(after_prune);

        if let (Some(config), Some(train)) = (self.config.finetune.clone(), train) {
            self.transition(&mut clock, observer);
            let result = Finetuner::new(config).run(&mut pruned, train, test, |epoch| {
                observer(&PipelineEvent::EpochFinished(epoch.clone()));
            })?;
            self.metrics.finetune_losses = result.losses();
            self.metrics.finetune_accuracies = result.accuracies();

            self.transition(&mut clock, observer);
            let finetuned = evaluator.evaluate(&pruned, test)?;
            observer(&PipelineEvent::Evaluated {
                phase: EvalPhase::Finetuned,
                result: finetuned.clone(),
                size: pruned_size,
            });
            self.metrics.finetuned = Some(finetuned);
        }

        self.transition(&mut clock, observer);
        Ok(PipelineOutput {
            model: pruned,
            metrics: self.metrics.clone(),
        })
    }

    /// Close the current stage's timer and move to the next stage
    fn transition<F>(&mut self, clock: &mut Instant, observer: &mut F)
    where
        F: FnMut(&PipelineEvent),
    {
        if self.stage.is_active() {
            self.metrics
                .record_stage_duration(self.stage, clock.elapsed().as_secs_f64());
        }
        *clock = Instant::now();
        self.advance();
        observer(&PipelineEvent::StageStarted(self.stage));
    }
}
