//! The stage engine: state machine over the nine-stage pipeline.

use std::sync::Arc;

use tracing::{info, warn};

use super::context::{ResearchContext, StageContext, StageResult};
use super::report::{MarkdownExporter, ReportExporter};
use super::stage_name;
use crate::config::PipelineConfig;
use crate::error::{EngineError, EngineResult};
use crate::extract::{HeuristicExtractor, TextSignalExtractor};
use crate::graph::GraphDocument;
use crate::model::{Capability, Credentials, ModelRequest};
use crate::scheduler::{Priority, TaskOutcome, TaskRequest, TaskScheduler};

/// Orchestrates the nine-stage pipeline over a single graph document.
///
/// One engine per research session. All model calls go through the
/// injected [`TaskScheduler`]; text interpretation goes through the
/// injected [`TextSignalExtractor`]; report assembly is delegated to the
/// [`ReportExporter`].
pub struct StageEngine {
    pub(crate) scheduler: Arc<TaskScheduler>,
    pub(crate) extractor: Box<dyn TextSignalExtractor>,
    pub(crate) exporter: Box<dyn ReportExporter>,
    pub(crate) credentials: Credentials,
    pub(crate) pipeline: PipelineConfig,
    pub(crate) graph: GraphDocument,
    pub(crate) research: Option<ResearchContext>,
    pub(crate) contexts: Vec<StageContext>,
    pub(crate) results: Vec<StageResult>,
    pub(crate) high_impact: Option<GraphDocument>,
    pub(crate) report: Option<String>,
    edge_seq: u64,
}

impl StageEngine {
    /// Create an engine with the default extractor and exporter.
    pub fn new(
        scheduler: Arc<TaskScheduler>,
        credentials: Credentials,
        pipeline: PipelineConfig,
    ) -> Self {
        Self {
            scheduler,
            extractor: Box::new(HeuristicExtractor::new()),
            exporter: Box::new(MarkdownExporter),
            credentials,
            pipeline,
            graph: GraphDocument::new(),
            research: None,
            contexts: Vec::new(),
            results: Vec::new(),
            high_impact: None,
            report: None,
            edge_seq: 0,
        }
    }

    /// Replace the text signal extractor.
    pub fn with_extractor(mut self, extractor: Box<dyn TextSignalExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Replace the report exporter.
    pub fn with_exporter(mut self, exporter: Box<dyn ReportExporter>) -> Self {
        self.exporter = exporter;
        self
    }

    /// Execute one pipeline stage.
    ///
    /// `query` is required (non-blank) for stage 1 and ignored elsewhere.
    /// Preconditions are checked before any bookkeeping: an invalid stage
    /// number, missing credentials, or a blank stage-1 query fail without
    /// recording a stage context.
    pub async fn execute_stage(
        &mut self,
        stage: i64,
        query: Option<&str>,
    ) -> EngineResult<StageResult> {
        if !(1..=9).contains(&stage) {
            return Err(EngineError::InvalidStageNumber { stage });
        }
        if !self.credentials.has_any() {
            return Err(EngineError::MissingCredentials);
        }
        let stage = stage as u32;
        let query = query.map(str::trim).unwrap_or("");
        if stage == 1 && query.is_empty() {
            return Err(EngineError::EmptyQuery);
        }

        info!(stage, name = stage_name(stage), "Executing stage");
        let mut ctx = StageContext::start(stage);

        let outcome = match stage {
            1 => self.run_initialization(query).await,
            2 => self.run_decomposition().await,
            3 => self.run_hypothesis_generation().await,
            4 => self.run_evidence_integration().await,
            5 => self.run_pruning_and_merging().await,
            6 => self.run_subgraph_extraction().await,
            7 => self.run_composition().await,
            8 => self.run_audit().await,
            9 => self.run_report().await,
            _ => unreachable!("stage number validated above"),
        };

        match outcome {
            Ok(outcome) => {
                ctx.complete(outcome.usage);
                self.contexts.push(ctx);
                self.graph.commit(stage);
                let result = StageResult {
                    stage,
                    name: stage_name(stage).to_string(),
                    summary: outcome.summary,
                    nodes_added: outcome.nodes_added,
                    edges_added: outcome.edges_added,
                    nodes_removed: outcome.nodes_removed,
                    token_usage: outcome.usage,
                };
                self.results.push(result.clone());
                info!(
                    stage,
                    nodes = self.graph.nodes.len(),
                    edges = self.graph.edges.len(),
                    "Stage completed"
                );
                Ok(result)
            }
            Err(e) => {
                ctx.fail(e.to_string());
                self.contexts.push(ctx);
                warn!(stage, error = %e, "Stage failed");
                Err(e)
            }
        }
    }

    /// The current graph document.
    pub fn graph(&self) -> &GraphDocument {
        &self.graph
    }

    /// Research context established by stage 1, if any.
    pub fn research_context(&self) -> Option<&ResearchContext> {
        self.research.as_ref()
    }

    /// History of executed stage results (defensive copy).
    pub fn stage_results(&self) -> Vec<StageResult> {
        self.results.clone()
    }

    /// History of stage execution contexts (defensive copy).
    pub fn stage_contexts(&self) -> Vec<StageContext> {
        self.contexts.clone()
    }

    /// High-impact subgraph extracted by stage 6, if any.
    pub fn high_impact_subgraph(&self) -> Option<&GraphDocument> {
        self.high_impact.as_ref()
    }

    /// Final report assembled by stage 9, if any.
    pub fn report(&self) -> Option<&str> {
        self.report.as_deref()
    }

    /// Structural sanity check for a stage result.
    pub fn validate_stage_result(result: &StageResult) -> bool {
        (1..=9).contains(&result.stage)
            && !result.name.is_empty()
            && result.token_usage.total == result.token_usage.input + result.token_usage.output
    }

    /// Research context with the documented fallback when stage 1 has not
    /// run.
    pub(crate) fn effective_research(&self) -> ResearchContext {
        self.research.clone().unwrap_or_else(ResearchContext::fallback)
    }

    /// Enqueue a model call without waiting for it.
    pub(crate) fn enqueue_task(
        &self,
        prompt: String,
        capability: Option<Capability>,
        priority: Priority,
    ) -> EngineResult<String> {
        let mut request = ModelRequest::new(prompt);
        if let Some(capability) = capability {
            request = request.with_capability(capability);
        }
        Ok(self
            .scheduler
            .enqueue(TaskRequest::new(request).with_priority(priority))?)
    }

    /// Poll the scheduler for a task result.
    pub(crate) async fn await_task(&self, task_id: &str) -> EngineResult<TaskOutcome> {
        Ok(self.scheduler.get_result(task_id, None).await?)
    }

    /// Enqueue a model call and wait for its result.
    pub(crate) async fn dispatch_task(
        &self,
        prompt: String,
        capability: Option<Capability>,
        priority: Priority,
    ) -> EngineResult<TaskOutcome> {
        let task_id = self.enqueue_task(prompt, capability, priority)?;
        self.await_task(&task_id).await
    }

    /// Next unique edge id for the given stage.
    pub(crate) fn next_edge_id(&mut self, stage: u32) -> String {
        self.edge_seq += 1;
        format!("s{}-e{}", stage, self.edge_seq)
    }
}
