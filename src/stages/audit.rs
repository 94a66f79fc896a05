//! Stage 8: audit.
//!
//! Reviews a summary of the graph for bias, statistical rigor,
//! falsifiability and unsupported causal claims. Append-only: the audit
//! verdict lands in a new reflection node and never mutates earlier
//! nodes.

use serde::Deserialize;

use super::context::StageOutcome;
use super::engine::StageEngine;
use super::{extract_json, truncate_label};
use crate::error::EngineResult;
use crate::graph::NodeType;
use crate::model::Capability;
use crate::prompts::AUDIT_PROMPT;
use crate::scheduler::Priority;

#[derive(Debug, Deserialize)]
struct AuditPayload {
    #[serde(default = "default_passed")]
    passed: bool,
    #[serde(default)]
    issues: Vec<AuditIssue>,
}

#[derive(Debug, Deserialize)]
struct AuditIssue {
    category: String,
    description: String,
}

fn default_passed() -> bool {
    true
}

impl StageEngine {
    pub(crate) async fn run_audit(&mut self) -> EngineResult<StageOutcome> {
        let prompt = format!("{}\n\n{}", AUDIT_PROMPT, self.audit_summary());
        let outcome = self
            .dispatch_task(prompt, Some(Capability::StructuredOutput), Priority::Low)
            .await?;

        let verdict = parse_audit(&outcome.text);

        let notes = if verdict.issues.is_empty() {
            "No issues found".to_string()
        } else {
            verdict
                .issues
                .iter()
                .map(|issue| format!("[{}] {}", issue.category, issue.description))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let label = if verdict.passed {
            "Audit: passed"
        } else {
            "Audit: failed"
        };
        let tag = if verdict.passed {
            "audit:passed"
        } else {
            "audit:failed"
        };

        let node = crate::graph::Node::new("s8-audit", label, NodeType::Reflection)
            .with_stage(8)
            .with_impact(0.4)
            .with_tag(tag)
            .with_notes(notes);
        let nodes_added = usize::from(self.graph.add_node(node));

        Ok(StageOutcome {
            summary: format!(
                "Audit {} with {} issue(s)",
                if verdict.passed { "passed" } else { "failed" },
                verdict.issues.len()
            ),
            nodes_added,
            edges_added: 0,
            nodes_removed: 0,
            usage: outcome.usage,
        })
    }

    /// Compact graph summary fed to the audit prompt.
    fn audit_summary(&self) -> String {
        let mut summary = format!(
            "Graph summary: {} node(s), {} edge(s), average confidence {:.2}\n",
            self.graph.nodes.len(),
            self.graph.edges.len(),
            self.graph.metadata.average_confidence
        );
        summary.push_str("Hypotheses:\n");
        for id in self.graph.node_ids_of_type(NodeType::Hypothesis).iter().take(10) {
            if let Some(node) = self.graph.node(id) {
                summary.push_str(&format!(
                    "- {} (confidence {:.2}): {}\n",
                    id,
                    node.confidence.mean(),
                    truncate_label(&node.label, 120)
                ));
            }
        }
        summary.push_str("Syntheses:\n");
        for id in self.graph.node_ids_of_type(NodeType::Synthesis) {
            if let Some(node) = self.graph.node(&id) {
                summary.push_str(&format!("- {}: {}\n", id, truncate_label(&node.label, 160)));
            }
        }
        summary
    }
}

/// Parse the audit completion. On unstructured output, fall back to a
/// keyword read of the verdict with no itemized issues.
fn parse_audit(completion: &str) -> AuditPayload {
    if let Some(value) = extract_json(completion) {
        if let Ok(payload) = serde_json::from_value::<AuditPayload>(value) {
            return payload;
        }
    }
    let lower = completion.to_lowercase();
    AuditPayload {
        passed: !lower.contains("failed") && !lower.contains("severe"),
        issues: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_audit_structured() {
        let completion = r#"{
            "passed": false,
            "issues": [
                {"category": "causality", "description": "Causal claim lacks trial support"},
                {"category": "bias", "description": "Framing favors one hypothesis"}
            ]
        }"#;
        let verdict = parse_audit(completion);
        assert!(!verdict.passed);
        assert_eq!(verdict.issues.len(), 2);
        assert_eq!(verdict.issues[0].category, "causality");
    }

    #[test]
    fn test_parse_audit_fallback_keyword() {
        assert!(parse_audit("Everything looks reasonable.").passed);
        assert!(!parse_audit("The review failed on rigor.").passed);
        assert!(!parse_audit("One severe problem with sampling.").passed);
    }

    #[test]
    fn test_parse_audit_defaults_passed_true() {
        let verdict = parse_audit(r#"{"issues": []}"#);
        assert!(verdict.passed);
        assert!(verdict.issues.is_empty());
    }
}
