//! Per-stage and per-session bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::TokenUsage;

/// Execution status of a stage run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Stage is currently executing.
    Running,
    /// Stage finished successfully.
    Completed,
    /// Stage failed; see `error_message`.
    Error,
}

/// Bookkeeping for one executed stage. Appended to the engine history when
/// the stage starts; finalized exactly once when it completes or errors,
/// never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageContext {
    /// Stage number (1-9).
    pub stage_id: u32,
    /// Execution status.
    pub status: StageStatus,
    /// Error message when status is `Error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// When the stage started.
    pub started_at: DateTime<Utc>,
    /// When the stage finished (completed or errored).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Wall-clock duration in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Token usage accumulated across the stage's model calls.
    pub token_usage: TokenUsage,
}

impl StageContext {
    /// Start bookkeeping for a stage run.
    pub fn start(stage_id: u32) -> Self {
        Self {
            stage_id,
            status: StageStatus::Running,
            error_message: None,
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: None,
            token_usage: TokenUsage::default(),
        }
    }

    /// Finalize as completed.
    pub fn complete(&mut self, usage: TokenUsage) {
        self.status = StageStatus::Completed;
        self.token_usage = usage;
        self.finish();
    }

    /// Finalize as errored with the underlying message.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = StageStatus::Error;
        self.error_message = Some(message.into());
        self.finish();
    }

    fn finish(&mut self) {
        let now = Utc::now();
        self.duration_ms = Some(
            (now - self.started_at)
                .num_milliseconds()
                .max(0) as u64,
        );
        self.completed_at = Some(now);
    }
}

/// Session-wide facts derived by stage 1 and read by every later stage.
/// Stage 1 is the sole writer; the context is immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchContext {
    /// Primary research field.
    pub field: String,
    /// Research objectives.
    pub objectives: Vec<String>,
    /// Constraints on the research.
    pub constraints: Vec<String>,
    /// True when the context came from heuristic fallback rather than a
    /// structured model response.
    pub auto_generated: bool,
}

impl ResearchContext {
    /// The fixed fallback context used when stage 1 has not populated one.
    pub fn fallback() -> Self {
        Self {
            field: crate::extract::DEFAULT_FIELD.to_string(),
            objectives: vec![crate::extract::DEFAULT_OBJECTIVE.to_string()],
            constraints: Vec::new(),
            auto_generated: true,
        }
    }
}

/// Outcome of one stage execution, appended to the engine's result history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    /// Stage number (1-9).
    pub stage: u32,
    /// Stage name.
    pub name: String,
    /// Human-readable summary of what the stage did.
    pub summary: String,
    /// Nodes added by the stage.
    pub nodes_added: usize,
    /// Edges added by the stage.
    pub edges_added: usize,
    /// Nodes removed by the stage (pruning/merging only).
    pub nodes_removed: usize,
    /// Token usage for the stage's model calls.
    pub token_usage: TokenUsage,
}

/// Internal stage handler output, wrapped into a [`StageResult`] by the
/// engine.
#[derive(Debug, Clone, Default)]
pub(crate) struct StageOutcome {
    pub summary: String,
    pub nodes_added: usize,
    pub edges_added: usize,
    pub nodes_removed: usize,
    pub usage: TokenUsage,
}
