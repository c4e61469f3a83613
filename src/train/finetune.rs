//! Post-pruning fine-tuning
//!
//! Mini-batch SGD with momentum over a cosine learning rate schedule that
//! is stepped once per batch. After every epoch the model is evaluated on
//! the validation set and the most accurate weights seen so far are kept;
//! they are restored into the model when the run ends.
//!
//! BatchNorm layers stay in inference mode: their scale and shift train,
//! their running statistics are frozen.

use super::loss::CrossEntropyLoss;
use crate::data::{DataLoader, Dataset};
use crate::eval::{EvalResult, Evaluator};
use crate::nn::Model;
use crate::optim::{CosineAnnealingLR, LRScheduler, Optimizer, Sgd};
use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Fine-tuning hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinetuneConfig {
    pub epochs: usize,
    pub batch_size: usize,
    /// Peak learning rate at the start of the cosine schedule
    pub lr: f32,
    /// Learning rate reached at the final step
    pub lr_min: f32,
    pub momentum: f32,
    pub weight_decay: f32,
    /// Seed for batch shuffling
    pub seed: u64,
}

impl Default for FinetuneConfig {
    fn default() -> Self {
        Self {
            epochs: 5,
            batch_size: 32,
            lr: 0.01,
            lr_min: 0.0,
            momentum: 0.9,
            weight_decay: 5e-4,
            seed: 42,
        }
    }
}

impl FinetuneConfig {
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_lr(mut self, lr: f32) -> Self {
        self.lr = lr;
        self
    }

    pub fn with_momentum(mut self, momentum: f32) -> Self {
        self.momentum = momentum;
        self
    }

    pub fn with_weight_decay(mut self, weight_decay: f32) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Config("finetune batch_size must be > 0".to_string()));
        }
        if !(self.lr.is_finite() && self.lr > 0.0) {
            return Err(Error::Config(format!(
                "finetune lr must be positive, got {}",
                self.lr
            )));
        }
        if !(0.0..=self.lr).contains(&self.lr_min) {
            return Err(Error::Config(format!(
                "finetune lr_min must be within [0, lr], got {}",
                self.lr_min
            )));
        }
        if !(0.0..1.0).contains(&self.momentum) {
            return Err(Error::Config(format!(
                "finetune momentum must be within [0, 1), got {}",
                self.momentum
            )));
        }
        if !(self.weight_decay.is_finite() && self.weight_decay >= 0.0) {
            return Err(Error::Config(format!(
                "finetune weight_decay must be >= 0, got {}",
                self.weight_decay
            )));
        }
        Ok(())
    }
}

/// One finished epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochReport {
    /// Zero-based epoch index
    pub epoch: usize,
    /// Mean training loss over the epoch's batches
    pub train_loss: f32,
    /// Learning rate used for the epoch's last batch
    pub lr: f32,
    pub val: EvalResult,
}

/// Outcome of a fine-tuning run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinetuneResult {
    pub epochs: Vec<EpochReport>,
    /// Validation accuracy before the first epoch
    pub initial_accuracy: f32,
    /// Accuracy of the weights left in the model
    pub best_accuracy: f32,
    /// Epoch whose weights were kept, `None` if none beat the start
    pub best_epoch: Option<usize>,
    pub elapsed_secs: f64,
}

impl FinetuneResult {
    pub fn losses(&self) -> Vec<f32> {
        self.epochs.iter().map(|e| e.train_loss).collect()
    }

    pub fn accuracies(&self) -> Vec<f32> {
        self.epochs.iter().map(|e| e.val.accuracy).collect()
    }
}

/// Runs [`FinetuneConfig`] against a model in place
#[derive(Debug, Clone)]
pub struct Finetuner {
    config: FinetuneConfig,
}

impl Finetuner {
    pub fn new(config: FinetuneConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FinetuneConfig {
        &self.config
    }

    /// Train `model` on `train`, evaluating on `val` after every epoch.
    ///
    /// `on_epoch` sees each [`EpochReport`] as it completes.
    pub fn run<F>(
        &self,
        model: &mut Model,
        train: &Dataset,
        val: &Dataset,
        mut on_epoch: F,
    ) -> Result<FinetuneResult>
    where
        F: FnMut(&EpochReport),
    {
        self.config.validate()?;
        if train.is_empty() {
            return Err(Error::EmptyDataset("fine-tuning training set".to_string()));
        }
        let start = Instant::now();
        let evaluator = Evaluator::new(self.config.batch_size);

        let initial_accuracy = evaluator.evaluate(model, val)?.accuracy;
        let mut best_accuracy = initial_accuracy;
        let mut best_epoch = None;
        let mut best_model = model.clone();

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let batches_per_epoch = train.len().div_ceil(self.config.batch_size);
        let mut optimizer = Sgd::new(self.config.lr, self.config.momentum)
            .with_weight_decay(self.config.weight_decay);
        let mut scheduler = CosineAnnealingLR::new(
            self.config.lr,
            self.config.epochs * batches_per_epoch,
            self.config.lr_min,
        );

        let mut epochs = Vec::with_capacity(self.config.epochs);
        for epoch in 0..self.config.epochs {
            let mut loss_sum = 0.0f64;
            let mut seen = 0usize;
            for batch in DataLoader::shuffled(train, self.config.batch_size, &mut rng) {
                scheduler.apply(&mut optimizer);
                let (logits, cache) = model.forward_train(&batch.images)?;
                let (loss, grad_logits) = CrossEntropyLoss.forward(&logits, &batch.labels)?;
                let grads = model.backward(&cache, &grad_logits)?;
                optimizer.step(&mut model.parameters_mut(), &grads)?;
                scheduler.step();

                loss_sum += f64::from(loss) * batch.size() as f64;
                seen += batch.size();
            }

            let report = EpochReport {
                epoch,
                train_loss: (loss_sum / seen as f64) as f32,
                lr: optimizer.lr(),
                val: evaluator.evaluate(model, val)?,
            };
            if report.val.accuracy > best_accuracy {
                best_accuracy = report.val.accuracy;
                best_epoch = Some(epoch);
                best_model = model.clone();
            }
            on_epoch(&report);
            epochs.push(report);
        }

        *model = best_model;
        Ok(FinetuneResult {
            epochs,
            initial_accuracy,
            best_accuracy,
            best_epoch,
            elapsed_secs: start.elapsed().as_secs_f64(),
        })
    }
}
