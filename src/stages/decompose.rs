//! Stage 2: decomposition.
//!
//! Splits the task into analysis dimensions. Dimensions the completion
//! does not cover are skipped; if the completion covers none, the full
//! category set is created with fallback content so later stages always
//! have something to attach hypotheses to.

use super::context::StageOutcome;
use super::engine::StageEngine;
use super::slugify;
use crate::error::EngineResult;
use crate::graph::{Edge, EdgeType, Node, NodeType};
use crate::prompts::DECOMPOSITION_PROMPT;
use crate::scheduler::Priority;

/// The recognized decomposition dimensions, in canonical order.
pub const DIMENSION_CATEGORIES: [&str; 7] = [
    "Scope",
    "Objectives",
    "Constraints",
    "Data needs",
    "Use cases",
    "Potential biases",
    "Knowledge gaps",
];

impl StageEngine {
    pub(crate) async fn run_decomposition(&mut self) -> EngineResult<StageOutcome> {
        let research = self.effective_research();
        let task = self
            .graph
            .node("s1-root")
            .map(|n| n.label.clone())
            .unwrap_or_else(|| research.objectives.join("; "));

        let prompt = format!(
            "{}\n\nField: {}\nResearch task: {}",
            DECOMPOSITION_PROMPT, research.field, task
        );
        let outcome = self.dispatch_task(prompt, None, Priority::Medium).await?;

        let mut dimensions: Vec<(String, String)> = DIMENSION_CATEGORIES
            .iter()
            .filter_map(|category| {
                self.extractor
                    .extract_dimension_content(Some(&outcome.text), category)
                    .map(|content| (category.to_string(), content))
            })
            .collect();

        let fallback = dimensions.is_empty();
        if fallback {
            dimensions = DIMENSION_CATEGORIES
                .iter()
                .map(|category| {
                    (
                        category.to_string(),
                        format!("General {} considerations for this task", category.to_lowercase()),
                    )
                })
                .collect();
        }

        let root_present = self.graph.node("s1-root").is_some();
        let mut nodes_added = 0;
        let mut edges_added = 0;

        for (category, content) in &dimensions {
            let slug = slugify(category);
            let id = format!("s2-dim-{}", slug);
            let node = Node::new(&id, category, NodeType::Dimension)
                .with_stage(2)
                .with_impact(0.5)
                .with_tag(research.field.clone())
                .with_notes(content.clone());
            if self.graph.add_node(node) {
                nodes_added += 1;
            }
            if root_present {
                let edge = Edge::new(
                    format!("s2-e-{}", slug),
                    "s1-root",
                    &id,
                    EdgeType::Supportive,
                )
                .with_confidence(0.7);
                if self.graph.add_edge(edge) {
                    edges_added += 1;
                }
            }
        }

        Ok(StageOutcome {
            summary: format!(
                "Decomposed task into {} dimension(s){}",
                dimensions.len(),
                if fallback { " (fallback set)" } else { "" }
            ),
            nodes_added,
            edges_added,
            nodes_removed: 0,
            usage: outcome.usage,
        })
    }
}
