//! Stage 9: final report.
//!
//! Report assembly is delegated to a [`ReportExporter`] so alternative
//! output formats can be injected; [`MarkdownExporter`] is the default.

use super::context::{ResearchContext, StageOutcome, StageResult};
use super::engine::StageEngine;
use super::truncate_label;
use crate::error::EngineResult;
use crate::graph::{GraphDocument, NodeType};

/// Renders a complete report from the final graph state.
pub trait ReportExporter: Send + Sync {
    /// Assemble the report artifact.
    fn export(
        &self,
        graph: &GraphDocument,
        research: &ResearchContext,
        results: &[StageResult],
    ) -> String;
}

/// Default Markdown report exporter.
pub struct MarkdownExporter;

impl ReportExporter for MarkdownExporter {
    fn export(
        &self,
        graph: &GraphDocument,
        research: &ResearchContext,
        results: &[StageResult],
    ) -> String {
        let mut out = String::new();
        out.push_str(&format!("# Research Report: {}\n\n", research.field));

        out.push_str("## Research Context\n\n");
        out.push_str(&format!("- Field: {}\n", research.field));
        for objective in &research.objectives {
            out.push_str(&format!("- Objective: {}\n", objective));
        }
        for constraint in &research.constraints {
            out.push_str(&format!("- Constraint: {}\n", constraint));
        }
        if research.auto_generated {
            out.push_str("- Context derived heuristically from the query\n");
        }

        if !results.is_empty() {
            out.push_str("\n## Stage History\n\n");
            out.push_str("| Stage | Name | +Nodes | +Edges | -Nodes | Tokens |\n");
            out.push_str("|---|---|---|---|---|---|\n");
            for result in results {
                out.push_str(&format!(
                    "| {} | {} | {} | {} | {} | {} |\n",
                    result.stage,
                    result.name,
                    result.nodes_added,
                    result.edges_added,
                    result.nodes_removed,
                    result.token_usage.total
                ));
            }
        }

        for (title, node_type) in [
            ("Hypotheses", NodeType::Hypothesis),
            ("Evidence", NodeType::Evidence),
            ("Syntheses", NodeType::Synthesis),
            ("Audit and Reflection", NodeType::Reflection),
        ] {
            let ids = graph.node_ids_of_type(node_type);
            if ids.is_empty() {
                continue;
            }
            out.push_str(&format!("\n## {}\n\n", title));
            for id in ids {
                let Some(node) = graph.node(&id) else { continue };
                out.push_str(&format!(
                    "- **{}** (confidence {:.2}, impact {:.2})\n",
                    node.label,
                    node.confidence.mean(),
                    node.metadata.impact_score
                ));
                if let Some(notes) = &node.metadata.notes {
                    out.push_str(&format!("  - {}\n", truncate_label(notes, 300)));
                }
            }
        }

        out.push_str("\n## Graph Statistics\n\n");
        out.push_str(&format!(
            "- Nodes: {}\n- Edges: {}\n- Hyperedges: {}\n- Average confidence: {:.2}\n- Highest stage: {}\n",
            graph.nodes.len(),
            graph.edges.len(),
            graph.hyperedges.len(),
            graph.metadata.average_confidence,
            graph.metadata.current_stage
        ));

        out
    }
}

impl StageEngine {
    pub(crate) async fn run_report(&mut self) -> EngineResult<StageOutcome> {
        let research = self.effective_research();
        let report = self.exporter.export(&self.graph, &research, &self.results);
        let chars = report.len();
        self.report = Some(report);

        Ok(StageOutcome {
            summary: format!("Assembled final report ({} chars)", chars),
            ..StageOutcome::default()
        })
    }
}
