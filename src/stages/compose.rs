//! Stage 7: composition.
//!
//! Synthesizes the high-impact subgraph into unified insights. Each
//! synthesis becomes a node wired to the graph nodes it cites; citations
//! spanning two or more nodes additionally form a hyperedge. A closing
//! reflection, when the model provides one, becomes a reflection node.

use serde::Deserialize;

use super::context::StageOutcome;
use super::engine::StageEngine;
use super::{extract_json, truncate_label};
use crate::confidence::ConfidenceVector;
use crate::error::EngineResult;
use crate::graph::{
    extract_high_impact_subgraph, Edge, EdgeType, HyperEdge, Node, NodeType,
};
use crate::model::Capability;
use crate::prompts::COMPOSITION_PROMPT;
use crate::scheduler::Priority;

/// Cap on synthesis nodes created per run.
const MAX_SYNTHESES: usize = 3;

#[derive(Debug, Deserialize)]
struct CompositionPayload {
    #[serde(default)]
    syntheses: Vec<SynthesisEntry>,
    #[serde(default)]
    reflection: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SynthesisEntry {
    statement: String,
    #[serde(default)]
    citations: Vec<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

impl StageEngine {
    pub(crate) async fn run_composition(&mut self) -> EngineResult<StageOutcome> {
        // Tolerant ordering: compute the subgraph on the fly when stage 6
        // has not run.
        let subgraph = match &self.high_impact {
            Some(subgraph) => subgraph.clone(),
            None => extract_high_impact_subgraph(&self.graph, self.pipeline.impact_threshold),
        };

        let mut members: Vec<&Node> = subgraph
            .nodes
            .values()
            .filter(|n| {
                matches!(
                    n.node_type,
                    NodeType::Hypothesis | NodeType::Evidence | NodeType::Dimension
                )
            })
            .collect();
        members.sort_by(|a, b| a.id.cmp(&b.id));

        let mut listing = String::new();
        for node in &members {
            listing.push_str(&format!(
                "- {} [{}]: {}\n",
                node.id,
                node.node_type,
                truncate_label(&node.label, 160)
            ));
        }
        if listing.is_empty() {
            listing.push_str("- (no high-impact findings; synthesize cautiously)\n");
        }

        let prompt = format!("{}\n\nHigh-impact findings:\n{}", COMPOSITION_PROMPT, listing);
        let outcome = self
            .dispatch_task(prompt, Some(Capability::StructuredOutput), Priority::Medium)
            .await?;

        let payload = parse_composition(&outcome.text);

        let mut nodes_added = 0;
        let mut syntheses_added = 0;
        let mut edges_added = 0;
        let mut hyperedges_added = 0;

        for (index, entry) in payload.syntheses.iter().take(MAX_SYNTHESES).enumerate() {
            let statement = entry.statement.trim();
            if statement.is_empty() {
                continue;
            }
            let confidence = entry.confidence.unwrap_or(0.7).clamp(0.0, 1.0);
            let syn_id = format!("s7-syn-{}", index + 1);
            let node = Node::new(&syn_id, truncate_label(statement, 200), NodeType::Synthesis)
                .with_stage(7)
                .with_confidence(ConfidenceVector::new([confidence; 4]))
                .with_impact(0.8);
            if !self.graph.add_node(node) {
                continue;
            }
            nodes_added += 1;
            syntheses_added += 1;

            let citations: Vec<String> = entry
                .citations
                .iter()
                .filter(|id| self.graph.nodes.contains_key(id.as_str()))
                .cloned()
                .collect();

            for citation in &citations {
                let id = self.next_edge_id(7);
                let edge = Edge::new(id, citation, &syn_id, EdgeType::Supportive)
                    .with_confidence(confidence);
                if self.graph.add_edge(edge) {
                    edges_added += 1;
                }
            }

            if citations.len() >= 2 {
                let mut nodes = citations.clone();
                nodes.push(syn_id.clone());
                let hyperedge =
                    HyperEdge::new(format!("s7-h-{}", index + 1), nodes, "joint synthesis support")
                        .with_confidence(confidence);
                if self.graph.add_hyperedge(hyperedge) {
                    hyperedges_added += 1;
                }
            }
        }

        if let Some(reflection) = payload
            .reflection
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
        {
            let node = Node::new("s7-reflection", "Composition reflection", NodeType::Reflection)
                .with_stage(7)
                .with_impact(0.6)
                .with_notes(reflection);
            if self.graph.add_node(node) {
                nodes_added += 1;
            }
        }

        Ok(StageOutcome {
            summary: format!(
                "Composed {} synthesis node(s) with {} citation edge(s) and {} hyperedge(s)",
                syntheses_added,
                edges_added,
                hyperedges_added
            ),
            nodes_added,
            edges_added,
            nodes_removed: 0,
            usage: outcome.usage,
        })
    }
}

/// Parse the composition completion, falling back to a single uncited
/// synthesis built from the raw text.
fn parse_composition(completion: &str) -> CompositionPayload {
    if let Some(value) = extract_json(completion) {
        if let Ok(payload) = serde_json::from_value::<CompositionPayload>(value) {
            if !payload.syntheses.is_empty() || payload.reflection.is_some() {
                return payload;
            }
        }
    }
    CompositionPayload {
        syntheses: vec![SynthesisEntry {
            statement: truncate_label(completion, 300),
            citations: Vec::new(),
            confidence: Some(0.7),
        }],
        reflection: None,
    }
}
