//! Stage 5: pruning and merging.
//!
//! Removes nodes whose mean confidence fell below the prune threshold
//! (the root is always kept), merges near-duplicate survivors, rewires
//! edges onto the merge survivors, and drops relations orphaned by the
//! removals. No model calls are made.

use tracing::debug;

use super::context::StageOutcome;
use super::engine::StageEngine;
use crate::error::EngineResult;
use crate::graph::{
    identify_similar_nodes, merge_nodes, rewire_edges, valid_edges, GraphDocument, Node, NodeType,
};

impl StageEngine {
    pub(crate) async fn run_pruning_and_merging(&mut self) -> EngineResult<StageOutcome> {
        let threshold = self.pipeline.prune_threshold;

        let prune_ids: Vec<String> = self
            .graph
            .nodes
            .values()
            .filter(|n| n.node_type != NodeType::Root && n.confidence.mean() < threshold)
            .map(|n| n.id.clone())
            .collect();

        let mut nodes_removed = 0;
        for id in &prune_ids {
            if self.graph.remove_node(id).is_some() {
                debug!(node_id = %id, "Pruned low-confidence node");
                nodes_removed += 1;
            }
        }

        let mut candidates: Vec<Node> = self
            .graph
            .nodes
            .values()
            .filter(|n| n.node_type != NodeType::Root)
            .cloned()
            .collect();
        candidates.sort_by(|a, b| a.id.cmp(&b.id));

        let groups = identify_similar_nodes(&candidates, self.pipeline.similarity_threshold);
        let mut groups_merged = 0;
        for group in groups.iter().filter(|g| g.len() > 1) {
            let Some(merged) = merge_nodes(group) else {
                continue;
            };
            let survivor_id = merged.id.clone();
            let absorbed: Vec<String> = group
                .iter()
                .filter(|n| n.id != survivor_id)
                .map(|n| n.id.clone())
                .collect();

            rewire_edges(&mut self.graph, &survivor_id, &absorbed);
            for id in &absorbed {
                if self.graph.remove_node(id).is_some() {
                    debug!(node_id = %id, survivor = %survivor_id, "Merged duplicate node");
                    nodes_removed += 1;
                }
            }
            if let Some(node) = self.graph.node_mut(&survivor_id) {
                *node = merged;
            }
            groups_merged += 1;
        }

        // Relations orphaned by the removals are dropped outright.
        let retained = valid_edges(&self.graph);
        let edges_dropped = self.graph.edges.len().saturating_sub(retained.len());
        self.graph.edges = retained;
        let GraphDocument {
            nodes, hyperedges, ..
        } = &mut self.graph;
        hyperedges.retain(|h| h.nodes.len() >= 2 && h.nodes.iter().all(|id| nodes.contains_key(id)));

        Ok(StageOutcome {
            summary: format!(
                "Pruned {} node(s), merged {} group(s), dropped {} orphaned edge(s)",
                prune_ids.len(),
                groups_merged,
                edges_dropped
            ),
            nodes_added: 0,
            edges_added: 0,
            nodes_removed,
            usage: Default::default(),
        })
    }
}
