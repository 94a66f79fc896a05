//! Stage 3: hypothesis generation.
//!
//! Requests 3-5 competing, falsifiable hypotheses per dimension. Parses
//! the structured response when possible, falls back to numbered-marker
//! extraction, and pads with placeholder hypotheses so the configured
//! minimum per dimension always holds.

use serde::Deserialize;

use super::context::StageOutcome;
use super::engine::StageEngine;
use super::{extract_json, truncate_label};
use crate::confidence::ConfidenceVector;
use crate::error::EngineResult;
use crate::extract::{TextSignalExtractor, DEFAULT_FALSIFICATION};
use crate::graph::{Edge, EdgeType, Node, NodeType};
use crate::model::{Capability, TokenUsage};
use crate::prompts::HYPOTHESIS_PROMPT;
use crate::scheduler::Priority;

#[derive(Debug, Deserialize)]
struct HypothesisPayload {
    #[serde(default)]
    hypotheses: Vec<HypothesisEntry>,
}

#[derive(Debug, Deserialize)]
struct HypothesisEntry {
    hypothesis: String,
    #[serde(default)]
    falsification: Option<String>,
    #[serde(default)]
    confidence: Option<Vec<f64>>,
}

#[derive(Debug)]
struct HypothesisDraft {
    statement: String,
    falsification: String,
    confidence: ConfidenceVector,
}

impl StageEngine {
    pub(crate) async fn run_hypothesis_generation(&mut self) -> EngineResult<StageOutcome> {
        let research = self.effective_research();

        // (anchor node id, id fragment, prompt subject)
        let dimensions: Vec<(Option<String>, String, String)> = {
            let dims: Vec<_> = self
                .graph
                .node_ids_of_type(NodeType::Dimension)
                .into_iter()
                .filter_map(|id| {
                    self.graph.node(&id).map(|n| {
                        let subject = match &n.metadata.notes {
                            Some(notes) => format!("{}: {}", n.label, notes),
                            None => n.label.clone(),
                        };
                        let fragment = id
                            .strip_prefix("s2-dim-")
                            .unwrap_or(id.as_str())
                            .to_string();
                        (Some(id.clone()), fragment, subject)
                    })
                })
                .collect();
            if dims.is_empty() {
                // Stage 2 has not run: generate against the task as a whole.
                vec![(
                    None,
                    "general".to_string(),
                    research.objectives.join("; "),
                )]
            } else {
                dims
            }
        };

        let mut usage = TokenUsage::default();
        let mut nodes_added = 0;
        let mut edges_added = 0;

        for (anchor, fragment, subject) in &dimensions {
            let prompt = format!(
                "{}\n\nField: {}\nAnalysis dimension: {}",
                HYPOTHESIS_PROMPT, research.field, subject
            );
            let outcome = self
                .dispatch_task(prompt, Some(Capability::StructuredOutput), Priority::Medium)
                .await?;
            usage.add(outcome.usage);

            let drafts = parse_hypotheses(
                self.extractor.as_ref(),
                &outcome.text,
                self.pipeline.min_hypotheses,
                self.pipeline.max_hypotheses,
            );

            let anchor = anchor
                .clone()
                .or_else(|| self.graph.node("s1-root").map(|n| n.id.clone()));

            for (index, draft) in drafts.iter().enumerate() {
                let id = format!("s3-hyp-{}-{}", fragment, index + 1);
                let node = Node::new(&id, truncate_label(&draft.statement, 160), NodeType::Hypothesis)
                    .with_stage(3)
                    .with_confidence(draft.confidence)
                    .with_impact(0.5)
                    .with_notes(format!("Falsification: {}", draft.falsification));
                if self.graph.add_node(node) {
                    nodes_added += 1;
                }
                if let Some(anchor_id) = &anchor {
                    let edge = Edge::new(
                        format!("s3-e-{}-{}", fragment, index + 1),
                        anchor_id,
                        &id,
                        EdgeType::Supportive,
                    )
                    .with_confidence(draft.confidence.mean());
                    if self.graph.add_edge(edge) {
                        edges_added += 1;
                    }
                }
            }
        }

        Ok(StageOutcome {
            summary: format!(
                "Generated {} hypothesis(es) across {} dimension(s)",
                nodes_added,
                dimensions.len()
            ),
            nodes_added,
            edges_added,
            nodes_removed: 0,
            usage,
        })
    }
}

/// Parse hypothesis drafts from a completion, guaranteeing at least `min`
/// and at most `max` entries.
fn parse_hypotheses(
    extractor: &dyn TextSignalExtractor,
    completion: &str,
    min: usize,
    max: usize,
) -> Vec<HypothesisDraft> {
    let mut drafts = Vec::new();

    if let Some(value) = extract_json(completion) {
        if let Ok(payload) = serde_json::from_value::<HypothesisPayload>(value) {
            for entry in payload.hypotheses {
                let statement = entry.hypothesis.trim().to_string();
                if statement.is_empty() {
                    continue;
                }
                let confidence = match entry.confidence.as_deref() {
                    Some([a, b, c, d]) => ConfidenceVector::new([*a, *b, *c, *d]),
                    _ => ConfidenceVector::default(),
                };
                let falsification = entry
                    .falsification
                    .map(|f| f.trim().to_string())
                    .filter(|f| !f.is_empty())
                    .unwrap_or_else(|| DEFAULT_FALSIFICATION.to_string());
                drafts.push(HypothesisDraft {
                    statement,
                    falsification,
                    confidence,
                });
                if drafts.len() == max {
                    break;
                }
            }
        }
    }

    if drafts.is_empty() {
        for index in 1..=max {
            let Some(statement) = extractor.extract_hypothesis_content(Some(completion), index)
            else {
                break;
            };
            drafts.push(HypothesisDraft {
                statement,
                falsification: extractor.extract_falsification_criteria(Some(completion), index),
                confidence: extractor.parse_confidence_vector(Some(completion)),
            });
        }
    }

    // Pad to the configured minimum with explicit placeholders.
    while drafts.len() < min {
        drafts.push(HypothesisDraft {
            statement: format!(
                "Candidate explanation {} (pending refinement)",
                drafts.len() + 1
            ),
            falsification: DEFAULT_FALSIFICATION.to_string(),
            confidence: ConfidenceVector::default(),
        });
    }
    drafts.truncate(max.max(min));
    drafts
}
