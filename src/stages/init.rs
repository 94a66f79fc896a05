//! Stage 1: initialization.
//!
//! Establishes the research context (field, objectives, constraints) from
//! a structured model response, creates the task root node, and seeds the
//! fixed session-level knowledge nodes.

use serde::Deserialize;
use tracing::info;

use super::context::{ResearchContext, StageOutcome};
use super::engine::StageEngine;
use super::{extract_json, truncate_label};
use crate::error::EngineResult;
use crate::extract::TextSignalExtractor;
use crate::graph::{Node, NodeType};
use crate::model::Capability;
use crate::prompts::INITIALIZATION_PROMPT;
use crate::scheduler::Priority;

/// Fixed knowledge nodes seeded once per session.
const KNOWLEDGE_NODES: &[(&str, &str, &str)] = &[
    (
        "s1-k1",
        "Citation practices",
        "Claims should cite primary sources in Vancouver style",
    ),
    (
        "s1-k2",
        "Accuracy standards",
        "High-confidence claims require replicated empirical support",
    ),
    (
        "s1-k3",
        "Domain expertise",
        "Session assumes graduate-level familiarity with the field",
    ),
];

#[derive(Debug, Deserialize)]
struct InitPayload {
    field: Option<String>,
    #[serde(default)]
    objectives: Vec<String>,
    #[serde(default)]
    constraints: Vec<String>,
}

impl StageEngine {
    pub(crate) async fn run_initialization(&mut self, query: &str) -> EngineResult<StageOutcome> {
        let prompt = format!("{}\n\nResearch query: {}", INITIALIZATION_PROMPT, query);
        let outcome = self
            .dispatch_task(prompt, Some(Capability::StructuredOutput), Priority::High)
            .await?;

        let research = parse_research_context(self.extractor.as_ref(), &outcome.text);
        info!(
            field = %research.field,
            objectives = research.objectives.len(),
            auto_generated = research.auto_generated,
            "Research context established"
        );

        let mut nodes_added = 0;

        let root = Node::new("s1-root", truncate_label(query, 120), NodeType::Root)
            .with_stage(1)
            .with_impact(1.0)
            .with_tag(research.field.clone())
            .with_notes(format!("Objectives: {}", research.objectives.join("; ")));
        if self.graph.add_node(root) {
            nodes_added += 1;
        }

        for (id, label, notes) in KNOWLEDGE_NODES {
            let node = Node::new(*id, *label, NodeType::Knowledge)
                .with_stage(1)
                .with_impact(0.1)
                .with_notes(*notes);
            if self.graph.add_node(node) {
                nodes_added += 1;
            }
        }

        let summary = format!(
            "Initialized task root in field '{}' with {} objective(s)",
            research.field,
            research.objectives.len()
        );
        self.research = Some(research);

        Ok(StageOutcome {
            summary,
            nodes_added,
            edges_added: 0,
            nodes_removed: 0,
            usage: outcome.usage,
        })
    }
}

/// Interpret the initialization completion: structured JSON first,
/// heuristic extraction as fallback.
fn parse_research_context(
    extractor: &dyn TextSignalExtractor,
    completion: &str,
) -> ResearchContext {
    if let Some(value) = extract_json(completion) {
        if let Ok(payload) = serde_json::from_value::<InitPayload>(value) {
            let field = payload
                .field
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty());
            let objectives: Vec<String> = payload
                .objectives
                .into_iter()
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
            let constraints: Vec<String> = payload
                .constraints
                .into_iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();

            if field.is_some() || !objectives.is_empty() {
                return ResearchContext {
                    field: field.unwrap_or_else(|| extractor.extract_field(Some(completion))),
                    objectives: if objectives.is_empty() {
                        extractor.extract_objectives(Some(completion))
                    } else {
                        objectives
                    },
                    constraints,
                    auto_generated: false,
                };
            }
        }
    }

    ResearchContext {
        field: extractor.extract_field(Some(completion)),
        objectives: extractor.extract_objectives(Some(completion)),
        constraints: Vec::new(),
        auto_generated: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::HeuristicExtractor;

    #[test]
    fn test_parse_research_context_structured() {
        let extractor = HeuristicExtractor::new();
        let completion = r#"{
            "field": "Neuroscience",
            "objectives": ["Map the circuit", "Quantify plasticity"],
            "constraints": ["Rodent models only"]
        }"#;
        let ctx = parse_research_context(&extractor, completion);
        assert_eq!(ctx.field, "Neuroscience");
        assert_eq!(ctx.objectives.len(), 2);
        assert_eq!(ctx.constraints, vec!["Rodent models only".to_string()]);
        assert!(!ctx.auto_generated);
    }

    #[test]
    fn test_parse_research_context_fallback_to_heuristics() {
        let extractor = HeuristicExtractor::new();
        let completion = "Field: Marine Biology\nObjectives: survey reefs, track bleaching";
        let ctx = parse_research_context(&extractor, completion);
        assert_eq!(ctx.field, "Marine Biology");
        assert!(ctx.auto_generated);
    }

    #[test]
    fn test_parse_research_context_defaults_for_garbage() {
        let extractor = HeuristicExtractor::new();
        let ctx = parse_research_context(&extractor, "completely unstructured rambling");
        assert_eq!(ctx.field, "General Science");
        assert!(ctx.auto_generated);
    }

    #[test]
    fn test_knowledge_node_ids_are_stable() {
        let ids: Vec<&str> = KNOWLEDGE_NODES.iter().map(|(id, _, _)| *id).collect();
        assert_eq!(ids, vec!["s1-k1", "s1-k2", "s1-k3"]);
    }
}
