//! Heuristic text-signal extraction.
//!
//! Model responses are JSON-first, but malformed output is common enough
//! that every structured field has a heuristic fallback. The extractors in
//! this module scan for labeled markers (`Field:`, `Objectives:`,
//! `Hypothesis N:`) with case-insensitive, punctuation-tolerant matching,
//! and score numeric signals by summing weighted keyword evidence. Each
//! function returns a fixed, documented default for missing input, and is
//! deterministic for identical input.
//!
//! The extraction strategy sits behind the [`TextSignalExtractor`] trait so
//! a real structured-output parser can be substituted without touching the
//! stage engine.

use crate::confidence::ConfidenceVector;

/// Default research field when extraction fails.
pub const DEFAULT_FIELD: &str = "General Science";

/// Default objective when extraction fails.
pub const DEFAULT_OBJECTIVE: &str = "Comprehensive analysis";

/// Default falsification criteria when extraction fails.
pub const DEFAULT_FALSIFICATION: &str = "Requires controlled experimental validation";

/// Strategy interface for turning loosely structured model output into
/// structured fields. All methods are pure and total: bad input produces
/// the documented fallback, never an error.
pub trait TextSignalExtractor: Send + Sync {
    /// Research field; defaults to `"General Science"`.
    fn extract_field(&self, text: Option<&str>) -> String;

    /// Research objectives; defaults to `["Comprehensive analysis"]`.
    fn extract_objectives(&self, text: Option<&str>) -> Vec<String>;

    /// Content for a decomposition category, or `None` when the category
    /// is not recognized in the text.
    fn extract_dimension_content(&self, text: Option<&str>, category: &str) -> Option<String>;

    /// Content of the 1-based `Hypothesis N:` block, or `None` when the
    /// marker is absent.
    fn extract_hypothesis_content(&self, text: Option<&str>, index: usize) -> Option<String>;

    /// Falsification criteria for the 1-based hypothesis index; falls back
    /// to a fixed criteria line.
    fn extract_falsification_criteria(&self, text: Option<&str>, index: usize) -> String;

    /// Statistical-power signal in [0, 1] (base 0.5).
    fn extract_statistical_power(&self, text: Option<&str>) -> f64;

    /// Empirical-support signal in [0, 1] (base 0.5).
    fn extract_empirical_support(&self, text: Option<&str>) -> f64;

    /// Theoretical-basis signal in [0, 1] (base 0.5).
    fn extract_theoretical_basis(&self, text: Option<&str>) -> f64;

    /// Methodological-rigor signal in [0, 1] (base 0.5).
    fn extract_methodological_rigor(&self, text: Option<&str>) -> f64;

    /// Consensus-alignment signal in [0, 1] (base 0.5).
    fn extract_consensus_alignment(&self, text: Option<&str>) -> f64;

    /// Parse a 4-float confidence vector; defaults to `[0.8, 0.7, 0.9, 0.6]`.
    fn parse_confidence_vector(&self, text: Option<&str>) -> ConfidenceVector;
}

/// Keyword/marker based implementation of [`TextSignalExtractor`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicExtractor;

impl HeuristicExtractor {
    /// Create a new heuristic extractor.
    pub fn new() -> Self {
        Self
    }
}

impl TextSignalExtractor for HeuristicExtractor {
    fn extract_field(&self, text: Option<&str>) -> String {
        let Some(text) = nonblank(text) else {
            return DEFAULT_FIELD.to_string();
        };
        labeled_value(text, "field")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_FIELD.to_string())
    }

    fn extract_objectives(&self, text: Option<&str>) -> Vec<String> {
        let Some(text) = nonblank(text) else {
            return vec![DEFAULT_OBJECTIVE.to_string()];
        };

        let lines: Vec<&str> = text.lines().collect();
        let mut objectives = Vec::new();

        for (i, line) in lines.iter().enumerate() {
            if !line_has_label(line, "objectives") && !line_has_label(line, "objective") {
                continue;
            }
            // Inline value: "Objectives: a; b; c" or comma-separated
            if let Some(value) = value_after_colon(line) {
                if !value.is_empty() {
                    objectives.extend(split_list(&value));
                }
            }
            // Bullet lines following the label
            for follower in lines.iter().skip(i + 1) {
                if let Some(item) = bullet_content(follower) {
                    objectives.push(item);
                } else {
                    break;
                }
            }
            break;
        }

        if objectives.is_empty() {
            vec![DEFAULT_OBJECTIVE.to_string()]
        } else {
            objectives
        }
    }

    fn extract_dimension_content(&self, text: Option<&str>, category: &str) -> Option<String> {
        let text = nonblank(text)?;
        let lines: Vec<&str> = text.lines().collect();
        let category_lower = category.to_lowercase();

        for (i, line) in lines.iter().enumerate() {
            if !line.to_lowercase().contains(&category_lower) {
                continue;
            }
            if let Some(value) = value_after_colon(line) {
                if !value.is_empty() {
                    return Some(value);
                }
            }
            // Label on its own line; take the next non-empty line
            for follower in lines.iter().skip(i + 1) {
                let trimmed = follower.trim();
                if !trimmed.is_empty() {
                    return Some(strip_bullet(trimmed).to_string());
                }
            }
            return None;
        }
        None
    }

    fn extract_hypothesis_content(&self, text: Option<&str>, index: usize) -> Option<String> {
        let text = nonblank(text)?;
        let marker = format!("hypothesis {}", index);
        let lines: Vec<&str> = text.lines().collect();

        for (i, line) in lines.iter().enumerate() {
            let normalized = normalize_marker(line);
            let Some(rest) = normalized.strip_prefix(&marker) else {
                continue;
            };
            // "hypothesis 1" must not match "Hypothesis 10:" and so on
            if rest.chars().next().map_or(false, |c| c.is_ascii_digit()) {
                continue;
            }
            let mut content = value_after_colon(line).unwrap_or_default();
            // Continuation lines up to the next labeled block
            for follower in lines.iter().skip(i + 1) {
                let trimmed = follower.trim();
                if trimmed.is_empty()
                    || normalize_marker(follower).starts_with("hypothesis")
                    || normalize_marker(follower).starts_with("falsification")
                {
                    break;
                }
                if !content.is_empty() {
                    content.push(' ');
                }
                content.push_str(strip_bullet(trimmed));
            }
            return if content.is_empty() {
                None
            } else {
                Some(content)
            };
        }
        None
    }

    fn extract_falsification_criteria(&self, text: Option<&str>, index: usize) -> String {
        let Some(text) = nonblank(text) else {
            return DEFAULT_FALSIFICATION.to_string();
        };
        let mut seen = 0usize;
        for line in text.lines() {
            if normalize_marker(line).starts_with("falsification") {
                seen += 1;
                if seen == index {
                    if let Some(value) = value_after_colon(line) {
                        if !value.is_empty() {
                            return value;
                        }
                    }
                }
            }
        }
        DEFAULT_FALSIFICATION.to_string()
    }

    fn extract_statistical_power(&self, text: Option<&str>) -> f64 {
        score_keywords(
            text,
            &[
                ("meta-analysis", 0.20),
                ("systematic review", 0.15),
                ("randomized controlled trial", 0.15),
                ("rct", 0.10),
                ("peer-reviewed", 0.10),
                ("large sample", 0.05),
                ("sample size", 0.05),
                ("effect size", 0.05),
                ("p-value", 0.05),
                ("statistically significant", 0.05),
            ],
            &[
                ("case study", 0.15),
                ("anecdotal", 0.20),
                ("small sample", 0.10),
                ("underpowered", 0.15),
            ],
        )
    }

    fn extract_empirical_support(&self, text: Option<&str>) -> f64 {
        score_keywords(
            text,
            &[
                ("experiment", 0.10),
                ("observed", 0.10),
                ("measured", 0.10),
                ("replicated", 0.15),
                ("empirical", 0.10),
                ("data", 0.05),
            ],
            &[
                ("speculative", 0.15),
                ("untested", 0.15),
                ("no evidence", 0.20),
            ],
        )
    }

    fn extract_theoretical_basis(&self, text: Option<&str>) -> f64 {
        score_keywords(
            text,
            &[
                ("theory", 0.10),
                ("theoretical framework", 0.15),
                ("mechanism", 0.10),
                ("model predicts", 0.10),
                ("first principles", 0.10),
            ],
            &[("atheoretical", 0.20), ("ad hoc", 0.10)],
        )
    }

    fn extract_methodological_rigor(&self, text: Option<&str>) -> f64 {
        score_keywords(
            text,
            &[
                ("controlled", 0.10),
                ("double-blind", 0.15),
                ("blinded", 0.10),
                ("preregistered", 0.15),
                ("validated", 0.10),
                ("reproducible", 0.10),
            ],
            &[
                ("uncontrolled", 0.15),
                ("post hoc", 0.10),
                ("confounded", 0.15),
            ],
        )
    }

    fn extract_consensus_alignment(&self, text: Option<&str>) -> f64 {
        score_keywords(
            text,
            &[
                ("consensus", 0.15),
                ("widely accepted", 0.15),
                ("established", 0.10),
                ("well-known", 0.05),
            ],
            &[
                ("controversial", 0.15),
                ("disputed", 0.15),
                ("contested", 0.10),
                ("fringe", 0.20),
            ],
        )
    }

    fn parse_confidence_vector(&self, text: Option<&str>) -> ConfidenceVector {
        let Some(text) = nonblank(text) else {
            return ConfidenceVector::default();
        };
        let numbers = extract_numbers(text);
        if numbers.len() < 4 {
            return ConfidenceVector::default();
        }
        ConfidenceVector::new([numbers[0], numbers[1], numbers[2], numbers[3]])
    }
}

// ============================================================================
// Scanning helpers
// ============================================================================

fn nonblank(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.trim().is_empty())
}

/// Does the line carry the given label before a colon, ignoring case and
/// leading punctuation ("**Field:**", "- field :", "# Field:")?
fn line_has_label(line: &str, label: &str) -> bool {
    let normalized = normalize_marker(line);
    normalized.starts_with(label)
        && normalized[label.len()..]
            .trim_start()
            .starts_with([':', '-'])
}

/// Lowercase a line and strip leading list/emphasis punctuation.
fn normalize_marker(line: &str) -> String {
    line.trim()
        .trim_start_matches(['-', '*', '#', '>', '•', ' '])
        .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ')')
        .trim_start()
        .to_lowercase()
        .replace("**", "")
}

/// Value after the first colon, with surrounding punctuation trimmed.
fn value_after_colon(line: &str) -> Option<String> {
    line.split_once(':')
        .map(|(_, v)| v.trim().trim_matches('*').trim().to_string())
}

/// Find the value of a `Label: value` line anywhere in the text.
fn labeled_value(text: &str, label: &str) -> Option<String> {
    text.lines()
        .find(|line| line_has_label(line, label))
        .and_then(value_after_colon)
}

/// Content of a bullet/numbered list item, if the line is one.
fn bullet_content(line: &str) -> Option<String> {
    let trimmed = line.trim_start();
    let is_bullet = trimmed.starts_with('-')
        || trimmed.starts_with('*')
        || trimmed.starts_with('•')
        || trimmed
            .chars()
            .next()
            .map(|c| c.is_ascii_digit())
            .unwrap_or(false);
    if !is_bullet {
        return None;
    }
    let content = strip_bullet(trimmed);
    if content.is_empty() {
        None
    } else {
        Some(content.to_string())
    }
}

fn strip_bullet(line: &str) -> &str {
    line.trim_start_matches(['-', '*', '•'])
        .trim_start_matches(|c: char| c.is_ascii_digit())
        .trim_start_matches(['.', ')'])
        .trim()
}

/// Split an inline list on semicolons or commas.
fn split_list(value: &str) -> Vec<String> {
    let separator = if value.contains(';') { ';' } else { ',' };
    value
        .split(separator)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Sum weighted keyword evidence from a base of 0.5, clamped to [0, 1].
fn score_keywords(text: Option<&str>, positives: &[(&str, f64)], negatives: &[(&str, f64)]) -> f64 {
    let Some(text) = nonblank(text) else {
        return 0.5;
    };
    let lower = text.to_lowercase();
    let mut score = 0.5;
    for (keyword, weight) in positives {
        if lower.contains(keyword) {
            score += weight;
        }
    }
    for (keyword, weight) in negatives {
        if lower.contains(keyword) {
            score -= weight;
        }
    }
    score.clamp(0.0, 1.0)
}

/// All parseable decimal numbers appearing in the text, in order.
fn extract_numbers(text: &str) -> Vec<f64> {
    let mut numbers = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if c.is_ascii_digit() || c == '.' {
            current.push(c);
        } else {
            if let Ok(n) = current.parse::<f64>() {
                numbers.push(n);
            }
            current.clear();
        }
    }
    if let Ok(n) = current.parse::<f64>() {
        numbers.push(n);
    }
    numbers
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn extractor() -> HeuristicExtractor {
        HeuristicExtractor::new()
    }

    #[test]
    fn test_extract_field_default_for_missing_input() {
        assert_eq!(extractor().extract_field(None), "General Science");
        assert_eq!(extractor().extract_field(Some("")), "General Science");
        assert_eq!(extractor().extract_field(Some("   \n  ")), "General Science");
    }

    #[test]
    fn test_extract_field_labeled_marker() {
        let text = "Some preamble.\nField: Molecular Biology\nObjectives: x";
        assert_eq!(extractor().extract_field(Some(text)), "Molecular Biology");
    }

    #[test]
    fn test_extract_field_tolerates_markdown_punctuation() {
        let text = "**Field:** Neuroscience";
        assert_eq!(extractor().extract_field(Some(text)), "Neuroscience");

        let text = "- FIELD: Climate Science";
        assert_eq!(extractor().extract_field(Some(text)), "Climate Science");
    }

    #[test]
    fn test_extract_objectives_default() {
        assert_eq!(
            extractor().extract_objectives(None),
            vec!["Comprehensive analysis".to_string()]
        );
        assert_eq!(
            extractor().extract_objectives(Some("no markers here")),
            vec!["Comprehensive analysis".to_string()]
        );
    }

    #[test]
    fn test_extract_objectives_inline_list() {
        let text = "Objectives: map pathways; identify targets; rank candidates";
        assert_eq!(
            extractor().extract_objectives(Some(text)),
            vec![
                "map pathways".to_string(),
                "identify targets".to_string(),
                "rank candidates".to_string()
            ]
        );
    }

    #[test]
    fn test_extract_objectives_bullet_list() {
        let text = "Objectives:\n- understand mechanism\n- quantify effect\n\nOther: x";
        assert_eq!(
            extractor().extract_objectives(Some(text)),
            vec![
                "understand mechanism".to_string(),
                "quantify effect".to_string()
            ]
        );
    }

    #[test]
    fn test_extract_dimension_content_recognized() {
        let text = "Scope: gut microbiome composition in adults";
        assert_eq!(
            extractor().extract_dimension_content(Some(text), "Scope"),
            Some("gut microbiome composition in adults".to_string())
        );
    }

    #[test]
    fn test_extract_dimension_content_unrecognized() {
        let text = "Scope: something";
        assert_eq!(
            extractor().extract_dimension_content(Some(text), "Knowledge gaps"),
            None
        );
        assert_eq!(extractor().extract_dimension_content(None, "Scope"), None);
    }

    #[test]
    fn test_extract_dimension_content_label_on_own_line() {
        let text = "Data needs:\nLongitudinal cohort data with dietary records";
        assert_eq!(
            extractor().extract_dimension_content(Some(text), "Data needs"),
            Some("Longitudinal cohort data with dietary records".to_string())
        );
    }

    #[test]
    fn test_extract_hypothesis_content_by_index() {
        let text = "Hypothesis 1: Fiber intake raises SCFA production.\n\
                    Falsification 1: No SCFA change in controlled feeding.\n\
                    Hypothesis 2: SCFA modulates immune signaling.";
        assert_eq!(
            extractor().extract_hypothesis_content(Some(text), 1),
            Some("Fiber intake raises SCFA production.".to_string())
        );
        assert_eq!(
            extractor().extract_hypothesis_content(Some(text), 2),
            Some("SCFA modulates immune signaling.".to_string())
        );
        assert_eq!(extractor().extract_hypothesis_content(Some(text), 3), None);
        assert_eq!(extractor().extract_hypothesis_content(None, 1), None);
    }

    #[test]
    fn test_extract_hypothesis_content_two_digit_index() {
        let text = "Hypothesis 1: The first one.\n\
                    Hypothesis 10: The tenth one.\n\
                    Hypothesis 12: The twelfth one.";
        assert_eq!(
            extractor().extract_hypothesis_content(Some(text), 1),
            Some("The first one.".to_string())
        );
        assert_eq!(
            extractor().extract_hypothesis_content(Some(text), 10),
            Some("The tenth one.".to_string())
        );
        assert_eq!(
            extractor().extract_hypothesis_content(Some(text), 12),
            Some("The twelfth one.".to_string())
        );
    }

    #[test]
    fn test_extract_hypothesis_content_multiline() {
        let text = "Hypothesis 1: First part\ncontinues here\n\nHypothesis 2: Other";
        assert_eq!(
            extractor().extract_hypothesis_content(Some(text), 1),
            Some("First part continues here".to_string())
        );
    }

    #[test]
    fn test_extract_falsification_criteria() {
        let text = "Hypothesis 1: A\nFalsification criteria: null result in RCT";
        assert_eq!(
            extractor().extract_falsification_criteria(Some(text), 1),
            "null result in RCT"
        );
        assert_eq!(
            extractor().extract_falsification_criteria(Some("nothing"), 1),
            DEFAULT_FALSIFICATION
        );
        assert_eq!(
            extractor().extract_falsification_criteria(None, 1),
            DEFAULT_FALSIFICATION
        );
    }

    #[test]
    fn test_statistical_power_base_and_shifts() {
        assert_eq!(extractor().extract_statistical_power(None), 0.5);
        assert_eq!(extractor().extract_statistical_power(Some("plain text")), 0.5);

        let strong = "A meta-analysis of randomized controlled trial data, peer-reviewed";
        assert!(extractor().extract_statistical_power(Some(strong)) > 0.8);

        let weak = "an anecdotal case study";
        assert!(extractor().extract_statistical_power(Some(weak)) < 0.2);
    }

    #[test]
    fn test_statistical_power_clamped() {
        let very_strong = "meta-analysis systematic review randomized controlled trial rct \
                           peer-reviewed large sample sample size effect size p-value \
                           statistically significant";
        assert_eq!(extractor().extract_statistical_power(Some(very_strong)), 1.0);

        let very_weak = "anecdotal case study with a small sample, underpowered, anecdotal";
        assert_eq!(extractor().extract_statistical_power(Some(very_weak)), 0.0);
    }

    #[test]
    fn test_dimension_signal_extractors_default() {
        let e = extractor();
        assert_eq!(e.extract_empirical_support(None), 0.5);
        assert_eq!(e.extract_theoretical_basis(None), 0.5);
        assert_eq!(e.extract_methodological_rigor(None), 0.5);
        assert_eq!(e.extract_consensus_alignment(None), 0.5);
    }

    #[test]
    fn test_dimension_signal_extractors_move_with_keywords() {
        let e = extractor();
        assert!(e.extract_empirical_support(Some("replicated experiment with data")) > 0.5);
        assert!(e.extract_empirical_support(Some("speculative and untested")) < 0.5);
        assert!(e.extract_theoretical_basis(Some("grounded in theory and mechanism")) > 0.5);
        assert!(e.extract_methodological_rigor(Some("double-blind preregistered")) > 0.5);
        assert!(e.extract_consensus_alignment(Some("disputed and controversial")) < 0.5);
    }

    #[test]
    fn test_parse_confidence_vector_defaults() {
        let e = extractor();
        assert_eq!(e.parse_confidence_vector(None).0, [0.8, 0.7, 0.9, 0.6]);
        assert_eq!(e.parse_confidence_vector(Some("")).0, [0.8, 0.7, 0.9, 0.6]);
        assert_eq!(
            e.parse_confidence_vector(Some("not numbers")).0,
            [0.8, 0.7, 0.9, 0.6]
        );
        // Fewer than four numbers also falls back
        assert_eq!(
            e.parse_confidence_vector(Some("0.1, 0.2")).0,
            [0.8, 0.7, 0.9, 0.6]
        );
    }

    #[test]
    fn test_parse_confidence_vector_from_bracket_list() {
        let v = extractor().parse_confidence_vector(Some("[0.1, 0.2, 0.3, 0.4]"));
        assert_eq!(v.0, [0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_parse_confidence_vector_clamps() {
        let v = extractor().parse_confidence_vector(Some("confidence: 2.0 0.5 0.5 0.5"));
        assert_eq!(v.0[0], 1.0);
    }

    #[test]
    fn test_extractors_are_deterministic() {
        let e = extractor();
        let text = Some("Field: Genomics\nmeta-analysis of peer-reviewed data");
        assert_eq!(e.extract_field(text), e.extract_field(text));
        assert_eq!(
            e.extract_statistical_power(text),
            e.extract_statistical_power(text)
        );
    }
}
