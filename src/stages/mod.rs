//! The nine-stage reasoning pipeline.
//!
//! [`StageEngine`] owns the graph document and executes stages on demand.
//! Stage ordering is tolerant: every stage runs against whatever graph
//! state exists, substituting documented fallbacks when an earlier stage
//! has not populated its part.
//!
//! Each stage handler lives in its own file as an `impl StageEngine`
//! block; this module holds the small parsing helpers they share.

mod audit;
mod compose;
mod context;
mod decompose;
mod engine;
mod evidence;
mod hypothesis;
mod init;
mod prune;
mod report;
mod subgraph;

pub use context::{ResearchContext, StageContext, StageResult, StageStatus};
pub use decompose::DIMENSION_CATEGORIES;
pub use engine::StageEngine;
pub use report::{MarkdownExporter, ReportExporter};

pub(crate) use context::StageOutcome;

/// Canonical name of a stage by number.
pub fn stage_name(stage: u32) -> &'static str {
    match stage {
        1 => "initialization",
        2 => "decomposition",
        3 => "hypothesis_generation",
        4 => "evidence_integration",
        5 => "pruning_merging",
        6 => "subgraph_extraction",
        7 => "composition",
        8 => "audit",
        9 => "final_report",
        _ => "unknown",
    }
}

/// Pull a JSON value out of a model completion.
///
/// Tries the whole text, then a fenced code block, then the outermost
/// brace span. Returns `None` when nothing parses; callers fall back to
/// heuristic extraction in that case.
pub(crate) fn extract_json(completion: &str) -> Option<serde_json::Value> {
    let trimmed = completion.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let after = after.strip_prefix("json").unwrap_or(after);
        if let Some(end) = after.find("```") {
            if let Ok(value) = serde_json::from_str(after[..end].trim()) {
                return Some(value);
            }
        }
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end > start {
        serde_json::from_str(trimmed[start..=end].trim()).ok()
    } else {
        None
    }
}

/// Lowercase a label into a hyphenated id fragment.
pub(crate) fn slugify(label: &str) -> String {
    label
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Trim and cap a label at `max_chars` characters, appending an ellipsis
/// when truncated.
pub(crate) fn truncate_label(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_plain() {
        let value = extract_json(r#"{"field": "Biology"}"#).unwrap();
        assert_eq!(value["field"], "Biology");
    }

    #[test]
    fn test_extract_json_fenced_block() {
        let completion = "Here is the result:\n```json\n{\"passed\": true}\n```\nDone.";
        let value = extract_json(completion).unwrap();
        assert_eq!(value["passed"], true);
    }

    #[test]
    fn test_extract_json_embedded_braces() {
        let completion = "Sure! {\"objectives\": [\"a\", \"b\"]} hope that helps";
        let value = extract_json(completion).unwrap();
        assert_eq!(value["objectives"][1], "b");
    }

    #[test]
    fn test_extract_json_none_for_prose() {
        assert!(extract_json("no structured content here").is_none());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Data needs"), "data-needs");
        assert_eq!(slugify("Potential biases"), "potential-biases");
        assert_eq!(slugify("  Scope!  "), "scope");
    }

    #[test]
    fn test_truncate_label() {
        assert_eq!(truncate_label("short", 10), "short");
        let long = "a".repeat(20);
        let cut = truncate_label(&long, 10);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), 10);
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(stage_name(1), "initialization");
        assert_eq!(stage_name(9), "final_report");
        assert_eq!(stage_name(0), "unknown");
    }
}
