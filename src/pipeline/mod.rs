//! Evaluate-prune-finetune pipeline
//!
//! Runs the whole workflow on a pretrained model:
//! 1. Evaluate the dense model
//! 2. Plan keep counts from the prune ratios
//! 3. Sort and truncate channels
//! 4. Evaluate the pruned model
//! 5. Optionally fine-tune and evaluate again
//!
//! Progress is reported through a [`PipelineEvent`] observer; the
//! pipeline itself never prints.

mod metrics;
mod orchestrator;
mod stage;

pub use metrics::PruningMetrics;
pub use orchestrator::{PipelineConfig, PipelineEvent, PipelineOutput, PruneFinetunePipeline};
pub use stage::{EvalPhase, PruningStage};
