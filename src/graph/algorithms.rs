//! Graph algorithms: similarity grouping, merging, validity filtering and
//! high-impact subgraph extraction.

use std::collections::HashSet;

use tracing::debug;

use crate::confidence::ConfidenceVector;
use crate::graph::{Edge, GraphDocument, Node};

/// Group nodes that pass the similarity test.
///
/// Two nodes are similar when they share a node type and either their
/// labels match case-insensitively or the token-level Jaccard similarity
/// of their labels is at least `threshold`. Grouping is greedy over
/// id-sorted nodes, so results are deterministic. Empty input yields an
/// empty grouping; singleton groups are included.
pub fn identify_similar_nodes(nodes: &[Node], threshold: f64) -> Vec<Vec<Node>> {
    let mut sorted: Vec<&Node> = nodes.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));

    let mut groups: Vec<Vec<Node>> = Vec::new();
    let mut assigned: HashSet<&str> = HashSet::new();

    for node in &sorted {
        if assigned.contains(node.id.as_str()) {
            continue;
        }
        let mut group = vec![(*node).clone()];
        assigned.insert(node.id.as_str());

        for candidate in &sorted {
            if assigned.contains(candidate.id.as_str()) {
                continue;
            }
            if is_similar(node, candidate, threshold) {
                group.push((*candidate).clone());
                assigned.insert(candidate.id.as_str());
            }
        }
        groups.push(group);
    }
    groups
}

fn is_similar(a: &Node, b: &Node, threshold: f64) -> bool {
    if a.node_type != b.node_type {
        return false;
    }
    let la = a.label.trim().to_lowercase();
    let lb = b.label.trim().to_lowercase();
    if la == lb {
        return true;
    }
    jaccard_similarity(&la, &lb) >= threshold
}

/// Token-level Jaccard similarity between two labels.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let tokens_a: HashSet<&str> = a.split_whitespace().collect();
    let tokens_b: HashSet<&str> = b.split_whitespace().collect();
    if tokens_a.is_empty() && tokens_b.is_empty() {
        return 1.0;
    }
    let intersection = tokens_a.intersection(&tokens_b).count();
    let union = tokens_a.union(&tokens_b).count();
    intersection as f64 / union as f64
}

/// Merge a similarity group into a single representative node.
///
/// The first member wins identity (id, label, type and creating stage);
/// confidence vectors are combined by arithmetic mean, disciplinary tags
/// are unioned, evidence counts are summed and the impact score is the
/// group maximum. Returns `None` for an empty group.
pub fn merge_nodes(group: &[Node]) -> Option<Node> {
    let first = group.first()?;
    let mut merged = first.clone();

    let vectors: Vec<ConfidenceVector> = group.iter().map(|n| n.confidence).collect();
    merged.confidence = ConfidenceVector::mean_of(&vectors);

    for node in group.iter().skip(1) {
        for tag in &node.metadata.disciplinary_tags {
            if !merged.metadata.disciplinary_tags.contains(tag) {
                merged.metadata.disciplinary_tags.push(tag.clone());
            }
        }
        merged.metadata.evidence_count += node.metadata.evidence_count;
        merged.metadata.impact_score = merged.metadata.impact_score.max(node.metadata.impact_score);
    }
    Some(merged)
}

/// Edges whose endpoints both exist in the document.
///
/// Violating edges are excluded from the view rather than treated as a
/// hard failure. Missing weights default to the edge confidence.
pub fn valid_edges(graph: &GraphDocument) -> Vec<Edge> {
    graph
        .edges
        .iter()
        .filter(|e| graph.nodes.contains_key(&e.source) && graph.nodes.contains_key(&e.target))
        .map(|e| {
            let mut edge = e.clone();
            if edge.weight.is_none() {
                edge.weight = Some(edge.confidence);
            }
            edge
        })
        .collect()
}

/// Node-induced subgraph over nodes with `impact_score > threshold`,
/// extended by their immediate neighborhood via valid edges.
pub fn extract_high_impact_subgraph(graph: &GraphDocument, threshold: f64) -> GraphDocument {
    let mut keep: HashSet<String> = graph
        .nodes
        .values()
        .filter(|n| n.metadata.impact_score > threshold)
        .map(|n| n.id.clone())
        .collect();

    let edges = valid_edges(graph);

    // One-hop neighborhood of the high-impact core
    let mut neighbors: HashSet<String> = HashSet::new();
    for edge in &edges {
        if keep.contains(&edge.source) {
            neighbors.insert(edge.target.clone());
        }
        if keep.contains(&edge.target) {
            neighbors.insert(edge.source.clone());
        }
    }
    keep.extend(neighbors);

    let mut subgraph = GraphDocument::new();
    for id in &keep {
        if let Some(node) = graph.nodes.get(id) {
            subgraph.add_node(node.clone());
        }
    }
    for edge in edges {
        if keep.contains(&edge.source) && keep.contains(&edge.target) {
            subgraph.add_edge(edge);
        }
    }
    for hyperedge in &graph.hyperedges {
        if hyperedge.nodes.iter().all(|id| keep.contains(id)) {
            subgraph.add_hyperedge(hyperedge.clone());
        }
    }
    subgraph.metadata = graph.metadata.clone();
    subgraph.metadata.node_count = subgraph.nodes.len();
    subgraph.metadata.edge_count = subgraph.edges.len();

    debug!(
        total_nodes = graph.nodes.len(),
        kept_nodes = subgraph.nodes.len(),
        threshold = threshold,
        "Extracted high-impact subgraph"
    );

    subgraph
}

/// Rewire edges referencing any id in `absorbed` to point at `survivor`,
/// dropping self-edges produced by the rewiring.
pub fn rewire_edges(graph: &mut GraphDocument, survivor: &str, absorbed: &[String]) {
    let absorbed: HashSet<&str> = absorbed.iter().map(|s| s.as_str()).collect();
    for edge in &mut graph.edges {
        if absorbed.contains(edge.source.as_str()) {
            edge.source = survivor.to_string();
        }
        if absorbed.contains(edge.target.as_str()) {
            edge.target = survivor.to_string();
        }
    }
    graph.edges.retain(|e| e.source != e.target);
    for hyperedge in &mut graph.hyperedges {
        for member in &mut hyperedge.nodes {
            if absorbed.contains(member.as_str()) {
                *member = survivor.to_string();
            }
        }
        // Non-adjacent duplicates can appear when two absorbed members map
        // to the survivor; keep the first occurrence of each id
        let mut seen: HashSet<String> = HashSet::new();
        hyperedge.nodes.retain(|id| seen.insert(id.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeType, NodeType};

    fn node(id: &str, label: &str, node_type: NodeType) -> Node {
        Node::new(id, label, node_type)
    }

    #[test]
    fn test_identify_similar_nodes_empty_input() {
        assert!(identify_similar_nodes(&[], 0.75).is_empty());
    }

    #[test]
    fn test_identify_similar_nodes_groups_equal_labels() {
        let nodes = vec![
            node("a", "Immune response", NodeType::Hypothesis),
            node("b", "immune response", NodeType::Hypothesis),
            node("c", "Protein folding", NodeType::Hypothesis),
        ];
        let groups = identify_similar_nodes(&nodes, 0.75);
        assert_eq!(groups.len(), 2);
        let big = groups.iter().find(|g| g.len() == 2).unwrap();
        assert_eq!(big[0].id, "a");
        assert_eq!(big[1].id, "b");
    }

    #[test]
    fn test_identify_similar_nodes_requires_same_type() {
        let nodes = vec![
            node("a", "immune response", NodeType::Hypothesis),
            node("b", "immune response", NodeType::Evidence),
        ];
        let groups = identify_similar_nodes(&nodes, 0.75);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_identify_similar_nodes_jaccard_threshold() {
        let nodes = vec![
            node("a", "chronic inflammation markers", NodeType::Hypothesis),
            node("b", "chronic inflammation markers elevated", NodeType::Hypothesis),
        ];
        // 3 shared tokens, 4 in union => 0.75
        let groups = identify_similar_nodes(&nodes, 0.75);
        assert_eq!(groups.len(), 1);

        let groups = identify_similar_nodes(&nodes, 0.8);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_merge_nodes_first_wins_identity() {
        let a = node("x", "first", NodeType::Hypothesis)
            .with_confidence(ConfidenceVector::new([1.0, 1.0, 1.0, 1.0]))
            .with_tag("immunology");
        let b = node("y", "second", NodeType::Hypothesis)
            .with_confidence(ConfidenceVector::new([0.0, 0.0, 0.0, 0.0]))
            .with_tag("oncology");

        let merged = merge_nodes(&[a, b]).unwrap();
        assert_eq!(merged.id, "x");
        assert_eq!(merged.label, "first");
        assert_eq!(merged.confidence.0, [0.5, 0.5, 0.5, 0.5]);
        assert_eq!(
            merged.metadata.disciplinary_tags,
            vec!["immunology".to_string(), "oncology".to_string()]
        );
    }

    #[test]
    fn test_merge_nodes_empty_group() {
        assert!(merge_nodes(&[]).is_none());
    }

    #[test]
    fn test_valid_edges_excludes_dangling() {
        let mut graph = GraphDocument::new();
        graph.add_node(node("a", "a", NodeType::Root));
        graph.add_node(node("b", "b", NodeType::Dimension));
        graph.add_edge(Edge::new("e1", "a", "b", EdgeType::Supportive));
        graph.add_edge(Edge::new("e2", "a", "ghost", EdgeType::Supportive));
        graph.add_edge(Edge::new("e3", "ghost", "b", EdgeType::Supportive));

        let valid = valid_edges(&graph);
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].id, "e1");
        // Weight materialized from confidence
        assert_eq!(valid[0].weight, Some(0.5));
    }

    #[test]
    fn test_extract_high_impact_subgraph_includes_neighborhood() {
        let mut graph = GraphDocument::new();
        graph.add_node(node("hub", "hub", NodeType::Hypothesis).with_impact(0.9));
        graph.add_node(node("nb", "neighbor", NodeType::Evidence).with_impact(0.1));
        graph.add_node(node("far", "unconnected", NodeType::Evidence).with_impact(0.1));
        graph.add_edge(Edge::new("e1", "hub", "nb", EdgeType::Supportive));

        let sub = extract_high_impact_subgraph(&graph, 0.6);
        assert_eq!(sub.nodes.len(), 2);
        assert!(sub.nodes.contains_key("hub"));
        assert!(sub.nodes.contains_key("nb"));
        assert!(!sub.nodes.contains_key("far"));
        assert_eq!(sub.edges.len(), 1);
    }

    #[test]
    fn test_extract_high_impact_subgraph_empty_when_no_salient_nodes() {
        let mut graph = GraphDocument::new();
        graph.add_node(node("a", "a", NodeType::Evidence).with_impact(0.2));
        let sub = extract_high_impact_subgraph(&graph, 0.6);
        assert!(sub.nodes.is_empty());
        assert!(sub.edges.is_empty());
    }

    #[test]
    fn test_rewire_edges_to_survivor_drops_self_edges() {
        let mut graph = GraphDocument::new();
        graph.add_node(node("keep", "keep", NodeType::Hypothesis));
        graph.add_node(node("gone", "gone", NodeType::Hypothesis));
        graph.add_node(node("ev", "ev", NodeType::Evidence));
        graph.add_edge(Edge::new("e1", "gone", "ev", EdgeType::Supportive));
        graph.add_edge(Edge::new("e2", "keep", "gone", EdgeType::Correlative));

        rewire_edges(&mut graph, "keep", &["gone".to_string()]);

        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].source, "keep");
        assert_eq!(graph.edges[0].target, "ev");
    }

    #[test]
    fn test_rewire_edges_dedups_non_adjacent_hyperedge_members() {
        use crate::graph::HyperEdge;

        let mut graph = GraphDocument::new();
        graph.add_node(node("keep", "keep", NodeType::Hypothesis));
        graph.add_node(node("x", "x", NodeType::Hypothesis));
        graph.add_node(node("ev", "ev", NodeType::Evidence));
        graph.add_node(node("y", "y", NodeType::Hypothesis));
        graph.add_hyperedge(HyperEdge::new(
            "h1",
            vec!["x".to_string(), "ev".to_string(), "y".to_string()],
            "joint support",
        ));

        // Two non-adjacent members collapse onto the survivor
        rewire_edges(&mut graph, "keep", &["x".to_string(), "y".to_string()]);

        assert_eq!(
            graph.hyperedges[0].nodes,
            vec!["keep".to_string(), "ev".to_string()]
        );
    }

    #[test]
    fn test_jaccard_similarity_bounds() {
        assert_eq!(jaccard_similarity("a b c", "a b c"), 1.0);
        assert_eq!(jaccard_similarity("a b", "c d"), 0.0);
        assert_eq!(jaccard_similarity("", ""), 1.0);
    }
}
