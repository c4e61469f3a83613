//! Pipeline stages

use serde::{Deserialize, Serialize};

/// Which model an evaluation stage measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvalPhase {
    /// The input model before pruning
    Baseline,
    /// Right after channel truncation
    Pruned,
    /// After fine-tuning
    Finetuned,
}

impl EvalPhase {
    pub fn display_name(&self) -> &'static str {
        match self {
            EvalPhase::Baseline => "baseline",
            EvalPhase::Pruned => "pruned",
            EvalPhase::Finetuned => "fine-tuned",
        }
    }
}

/// Current stage of the pruning pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PruningStage {
    /// Not started.
    #[default]
    Idle,
    /// Measuring accuracy and loss.
    Evaluating(EvalPhase),
    /// Resolving ratios and keep counts.
    ComputingImportance,
    /// Sorting and truncating channels.
    Pruning,
    /// Recovering accuracy with brief training.
    FineTuning,
    /// Pipeline complete.
    Complete,
    /// Pipeline failed.
    Failed,
}

impl PruningStage {
    /// Check if the pipeline is in an active (non-terminal) state.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            PruningStage::Evaluating(_)
                | PruningStage::ComputingImportance
                | PruningStage::Pruning
                | PruningStage::FineTuning
        )
    }

    /// Check if the pipeline is complete (success or failure).
    pub fn is_terminal(&self) -> bool {
        matches!(self, PruningStage::Complete | PruningStage::Failed)
    }

    /// Get display name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            PruningStage::Idle => "Idle",
            PruningStage::Evaluating(EvalPhase::Baseline) => "Evaluating (baseline)",
            PruningStage::Evaluating(EvalPhase::Pruned) => "Evaluating (pruned)",
            PruningStage::Evaluating(EvalPhase::Finetuned) => "Evaluating (fine-tuned)",
            PruningStage::ComputingImportance => "Computing Importance",
            PruningStage::Pruning => "Pruning",
            PruningStage::FineTuning => "Fine-Tuning",
            PruningStage::Complete => "Complete",
            PruningStage::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for PruningStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}
