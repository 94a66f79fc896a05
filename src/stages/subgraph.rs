//! Stage 6: high-impact subgraph extraction.
//!
//! Pure graph computation: nodes above the impact threshold, their
//! one-hop neighborhood, and the relations among them. The extracted
//! subgraph is held by the engine for stage 7; the main graph is not
//! modified.

use super::context::StageOutcome;
use super::engine::StageEngine;
use crate::error::EngineResult;
use crate::graph::extract_high_impact_subgraph;

impl StageEngine {
    pub(crate) async fn run_subgraph_extraction(&mut self) -> EngineResult<StageOutcome> {
        let subgraph = extract_high_impact_subgraph(&self.graph, self.pipeline.impact_threshold);
        let summary = format!(
            "Extracted high-impact subgraph: {} of {} node(s), {} edge(s), {} hyperedge(s)",
            subgraph.nodes.len(),
            self.graph.nodes.len(),
            subgraph.edges.len(),
            subgraph.hyperedges.len()
        );
        self.high_impact = Some(subgraph);

        Ok(StageOutcome {
            summary,
            ..StageOutcome::default()
        })
    }
}
