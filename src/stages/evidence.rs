//! Stage 4: evidence integration.
//!
//! For every hypothesis, issues a search-grounded query and a
//! reasoning-only analysis, then folds the combined text back into the
//! graph: a new evidence node, an updated hypothesis confidence, and
//! causal/temporal edges when the text uses the corresponding language.
//! The count of non-blank fragments feeds the accumulation curve, which
//! floors the empirical-support component so keyword-weak text backed by
//! several independent fragments still registers support.
//!
//! Both tasks per hypothesis are enqueued up front so the scheduler's
//! worker pool runs them concurrently.

use super::context::StageOutcome;
use super::engine::StageEngine;
use super::truncate_label;
use crate::confidence::{calculate_confidence, ConfidenceVector};
use crate::error::EngineResult;
use crate::graph::{Edge, EdgeType, InfoMetrics, Node, NodeType};
use crate::model::{Capability, TokenUsage};
use crate::prompts::{EVIDENCE_ANALYSIS_PROMPT, EVIDENCE_SEARCH_PROMPT};
use crate::scheduler::Priority;

/// Phrases that justify a causal edge from evidence to hypothesis.
const CAUSAL_MARKERS: [&str; 5] = ["causes", "leads to", "results in", "induces", "drives"];

/// Phrases that justify a temporal edge from evidence to hypothesis.
const TEMPORAL_MARKERS: [&str; 4] = ["precedes", "followed by", "subsequently", "prior to"];

/// Content-length divisor for the complexity metric.
const COMPLEXITY_CHARS: f64 = 2000.0;

impl StageEngine {
    pub(crate) async fn run_evidence_integration(&mut self) -> EngineResult<StageOutcome> {
        let hypothesis_ids = self.graph.node_ids_of_type(NodeType::Hypothesis);
        if hypothesis_ids.is_empty() {
            return Ok(StageOutcome {
                summary: "No hypotheses present; evidence integration skipped".to_string(),
                ..StageOutcome::default()
            });
        }

        let mut pending = Vec::with_capacity(hypothesis_ids.len());
        for hyp_id in &hypothesis_ids {
            let Some(hypothesis) = self.graph.node(hyp_id) else {
                continue;
            };
            let search_prompt = format!(
                "{}\n\nHypothesis: {}",
                EVIDENCE_SEARCH_PROMPT, hypothesis.label
            );
            let analysis_prompt = format!(
                "{}\n\nHypothesis: {}",
                EVIDENCE_ANALYSIS_PROMPT, hypothesis.label
            );
            let search_task = self.enqueue_task(
                search_prompt,
                Some(Capability::SearchGrounding),
                Priority::High,
            )?;
            let analysis_task = self.enqueue_task(analysis_prompt, None, Priority::Medium)?;
            pending.push((hyp_id.clone(), search_task, analysis_task));
        }

        let mut usage = TokenUsage::default();
        let mut nodes_added = 0;
        let mut edges_added = 0;

        for (hyp_id, search_task, analysis_task) in pending {
            let search = self.await_task(&search_task).await?;
            let analysis = self.await_task(&analysis_task).await?;
            usage.add(search.usage);
            usage.add(analysis.usage);

            let combined = format!("{}\n\n{}", search.text, analysis.text);
            let power = self.extractor.extract_statistical_power(Some(&combined));
            let accumulation =
                calculate_confidence(&[search.text.as_str(), analysis.text.as_str()]);
            let evidence_confidence = ConfidenceVector::new([
                self.extractor
                    .extract_empirical_support(Some(&combined))
                    .max(accumulation),
                self.extractor.extract_theoretical_basis(Some(&combined)),
                self.extractor.extract_methodological_rigor(Some(&combined)),
                self.extractor.extract_consensus_alignment(Some(&combined)),
            ]);

            let mut information_gain = 0.0;
            let mut hyp_label = String::new();
            if let Some(hypothesis) = self.graph.node_mut(&hyp_id) {
                let before = hypothesis.confidence.mean();
                hypothesis.confidence = hypothesis.confidence.blend(&evidence_confidence);
                information_gain = hypothesis.confidence.mean() - before;
                hypothesis.metadata.evidence_count += 1;
                hypothesis.metadata.impact_score =
                    hypothesis.metadata.impact_score.max(power);
                hyp_label = hypothesis.label.clone();
            }

            let ev_id = format!(
                "s4-ev-{}",
                hyp_id.strip_prefix("s3-hyp-").unwrap_or(hyp_id.as_str())
            );
            let mut evidence = Node::new(
                &ev_id,
                format!("Evidence: {}", truncate_label(&hyp_label, 100)),
                NodeType::Evidence,
            )
            .with_stage(4)
            .with_confidence(evidence_confidence)
            .with_impact(power)
            .with_notes(truncate_label(&combined, 600));
            evidence.metadata.evidence_count = 1;
            evidence.metadata.info = Some(InfoMetrics {
                entropy: evidence_confidence.entropy(),
                complexity: (combined.len() as f64 / COMPLEXITY_CHARS).min(1.0),
                information_gain,
            });
            if self.graph.add_node(evidence) {
                nodes_added += 1;
            }

            let support_id = self.next_edge_id(4);
            let support = Edge::new(support_id, &hyp_id, &ev_id, EdgeType::Supportive)
                .with_confidence(power)
                .with_weight(power);
            if self.graph.add_edge(support) {
                edges_added += 1;
            }

            let lower = combined.to_lowercase();
            if CAUSAL_MARKERS.iter().any(|marker| lower.contains(marker)) {
                let id = self.next_edge_id(4);
                let edge =
                    Edge::new(id, &ev_id, &hyp_id, EdgeType::Causal).with_confidence(0.6);
                if self.graph.add_edge(edge) {
                    edges_added += 1;
                }
            }
            if TEMPORAL_MARKERS.iter().any(|marker| lower.contains(marker)) {
                let id = self.next_edge_id(4);
                let edge =
                    Edge::new(id, &ev_id, &hyp_id, EdgeType::Temporal).with_confidence(0.5);
                if self.graph.add_edge(edge) {
                    edges_added += 1;
                }
            }
        }

        Ok(StageOutcome {
            summary: format!(
                "Integrated evidence for {} hypothesis(es): {} evidence node(s), {} edge(s)",
                hypothesis_ids.len(),
                nodes_added,
                edges_added
            ),
            nodes_added,
            edges_added,
            nodes_removed: 0,
            usage,
        })
    }
}
