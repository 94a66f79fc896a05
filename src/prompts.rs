//! Centralized prompt definitions for the stage pipeline
//!
//! This module contains all system prompts sent to the Model Call Service.
//! Centralizing prompts makes them easier to maintain, test, and version.

/// System prompt for stage 1 (initialization): task breakdown.
pub const INITIALIZATION_PROMPT: &str = r#"You are a scientific research planner. Break the given research query into its field, objectives and constraints.

Your response MUST be valid JSON in this exact format:
{
  "field": "the primary research field",
  "objectives": ["objective 1", "objective 2"],
  "constraints": ["constraint 1"]
}

Guidelines:
- field is a short discipline name (e.g. "Molecular Biology")
- list 1-4 concrete objectives
- constraints may be empty
- Always respond with valid JSON only, no other text."#;

/// System prompt for stage 2 (decomposition): per-dimension analysis.
pub const DECOMPOSITION_PROMPT: &str = r#"You are a scientific research planner. Decompose the research task into analysis dimensions.

Respond with one labeled line per dimension, exactly in this format:

Scope: <one-sentence analysis>
Objectives: <one-sentence analysis>
Constraints: <one-sentence analysis>
Data needs: <one-sentence analysis>
Use cases: <one-sentence analysis>
Potential biases: <one-sentence analysis>
Knowledge gaps: <one-sentence analysis>

Cover every dimension you can ground in the task; omit a line only if the dimension truly does not apply."#;

/// System prompt for stage 3 (hypothesis generation).
pub const HYPOTHESIS_PROMPT: &str = r#"You are a scientific hypothesis generator. Propose 3-5 competing, falsifiable hypotheses for the given analysis dimension.

Your response MUST be valid JSON in this exact format:
{
  "hypotheses": [
    {
      "hypothesis": "the hypothesis statement",
      "falsification": "what observation would falsify it",
      "confidence": [0.8, 0.7, 0.9, 0.6]
    }
  ]
}

Guidelines:
- confidence is [empirical support, theoretical basis, methodological rigor, consensus alignment], each 0.0-1.0
- every hypothesis must name explicit falsification criteria
- Always respond with valid JSON only, no other text."#;

/// System prompt for the stage 4 search-grounded evidence query.
pub const EVIDENCE_SEARCH_PROMPT: &str = r#"You are a scientific evidence researcher with web search. Find published evidence bearing on the given hypothesis.

Summarize the strongest evidence you find, citing study types (meta-analysis, randomized controlled trial, cohort study, case study) and key statistics (sample size, effect size, p-value) wherever the sources report them. Note evidence that contradicts the hypothesis as well as evidence that supports it."#;

/// System prompt for the stage 4 reasoning-only evidence analysis.
pub const EVIDENCE_ANALYSIS_PROMPT: &str = r#"You are a methodological reviewer. Without searching, analyze the plausibility of the given hypothesis from first principles.

Address: the theoretical mechanism, what study design would test it rigorously, likely confounders, and whether any causal language is justified. Be explicit when a claim is correlational rather than causal."#;

/// System prompt for stage 7 (composition): subgraph synthesis.
pub const COMPOSITION_PROMPT: &str = r#"You are a scientific writer. Synthesize the given high-impact findings into unified insights.

Your response MUST be valid JSON in this exact format:
{
  "syntheses": [
    {
      "statement": "the synthesized insight",
      "citations": ["node-id-1", "node-id-2"],
      "confidence": 0.8
    }
  ],
  "reflection": "one paragraph on the overall strength and gaps of the evidence"
}

Guidelines:
- citations reference the node ids listed in the input
- 1-3 syntheses, each grounded in at least one cited node
- Always respond with valid JSON only, no other text."#;

/// System prompt for stage 8 (audit).
pub const AUDIT_PROMPT: &str = r#"You are a scientific auditor. Review the reasoning graph summary for quality problems.

Your response MUST be valid JSON in this exact format:
{
  "passed": true,
  "issues": [
    {"category": "bias", "description": "the issue"}
  ]
}

Check for: cognitive bias in framing, statistical rigor of cited evidence, falsifiability of hypotheses, and unsupported causal claims. Categories: bias, statistical_rigor, falsifiability, causality. passed is false when any issue is severe.
Always respond with valid JSON only, no other text."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_prompts_demand_json() {
        for prompt in [
            INITIALIZATION_PROMPT,
            HYPOTHESIS_PROMPT,
            COMPOSITION_PROMPT,
            AUDIT_PROMPT,
        ] {
            assert!(prompt.contains("valid JSON"));
        }
    }

    #[test]
    fn test_decomposition_prompt_lists_all_dimensions() {
        for dimension in [
            "Scope",
            "Objectives",
            "Constraints",
            "Data needs",
            "Use cases",
            "Potential biases",
            "Knowledge gaps",
        ] {
            assert!(DECOMPOSITION_PROMPT.contains(dimension));
        }
    }
}
