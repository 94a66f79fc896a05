//! Graph document data model.
//!
//! The [`GraphDocument`] is the versioned node/edge/hyperedge container that
//! the stage pipeline builds up. It is pure data: rendering, export and
//! persistence collaborators consume it as a plain structured document.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::confidence::ConfidenceVector;

/// Current graph document schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Node classification within the reasoning graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    /// The task root created by stage 1.
    Root,
    /// A decomposition dimension (stage 2).
    Dimension,
    /// A falsifiable hypothesis (stage 3).
    Hypothesis,
    /// An evidence item backing or contradicting a hypothesis (stage 4).
    Evidence,
    /// A synthesized insight over high-impact material (stage 7).
    Synthesis,
    /// A meta-level reflection or audit record (stage 8).
    Reflection,
    /// A cross-disciplinary bridge node.
    Bridge,
    /// An identified knowledge gap.
    Gap,
    /// A fixed session-level knowledge marker (stage 1).
    Knowledge,
}

impl NodeType {
    /// Get the type name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Root => "root",
            NodeType::Dimension => "dimension",
            NodeType::Hypothesis => "hypothesis",
            NodeType::Evidence => "evidence",
            NodeType::Synthesis => "synthesis",
            NodeType::Reflection => "reflection",
            NodeType::Bridge => "bridge",
            NodeType::Gap => "gap",
            NodeType::Knowledge => "knowledge",
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Relation type between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    /// Target supports or elaborates the source.
    Supportive,
    /// Target contradicts the source.
    Contradictory,
    /// Endpoints co-vary without a causal claim.
    Correlative,
    /// Source causally produces the target.
    Causal,
    /// Source precedes the target in time.
    Temporal,
    /// Source is required before the target.
    Prerequisite,
}

/// Optional information-theory metrics attached to a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InfoMetrics {
    /// Shannon entropy of the confidence vector (bits).
    pub entropy: f64,
    /// Structural complexity proxy (normalized label/content length).
    pub complexity: f64,
    /// Change in mean confidence produced by the last update.
    pub information_gain: f64,
}

/// Structured per-node metadata.
///
/// Explicit fields for everything the pipeline computes, with free-form
/// extension limited to disciplinary tags and notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// Stage number (1-9) that created the node.
    pub stage: u32,
    /// Salience score in [0, 1] used for subgraph extraction.
    pub impact_score: f64,
    /// Number of evidence items integrated into this node.
    pub evidence_count: u32,
    /// Free-form disciplinary tags.
    #[serde(default)]
    pub disciplinary_tags: Vec<String>,
    /// Free-form notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Optional information-theory metrics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<InfoMetrics>,
}

impl NodeMetadata {
    /// Create metadata for a node created at the given stage.
    pub fn new(stage: u32) -> Self {
        Self {
            stage,
            impact_score: 0.0,
            evidence_count: 0,
            disciplinary_tags: Vec::new(),
            notes: None,
            info: None,
        }
    }
}

/// A research concept in the reasoning graph.
///
/// `id` and `node_type` are immutable after creation; confidence and
/// metadata may be updated by later stages. Nodes are only ever removed by
/// the stage-5 pruning algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Stable id, prefixed by stage/type for traceability (e.g. `s2-dim-scope`).
    pub id: String,
    /// Human-readable label.
    pub label: String,
    /// Node classification.
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Four-dimensional confidence vector.
    pub confidence: ConfidenceVector,
    /// Structured metadata.
    pub metadata: NodeMetadata,
}

impl Node {
    /// Create a new node with default confidence and empty metadata.
    pub fn new(id: impl Into<String>, label: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            node_type,
            confidence: ConfidenceVector::default(),
            metadata: NodeMetadata::new(0),
        }
    }

    /// Set the confidence vector.
    pub fn with_confidence(mut self, confidence: ConfidenceVector) -> Self {
        self.confidence = confidence;
        self
    }

    /// Set the creating stage number.
    pub fn with_stage(mut self, stage: u32) -> Self {
        self.metadata.stage = stage;
        self
    }

    /// Set the impact score, clamped to [0, 1].
    pub fn with_impact(mut self, impact_score: f64) -> Self {
        self.metadata.impact_score = impact_score.clamp(0.0, 1.0);
        self
    }

    /// Add a disciplinary tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.metadata.disciplinary_tags.push(tag.into());
        self
    }

    /// Set free-form notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.metadata.notes = Some(notes.into());
        self
    }
}

/// A directed relation between two nodes. Edges are never mutated after
/// creation, only filtered out of views when an endpoint disappears.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Unique edge id.
    pub id: String,
    /// Source node id.
    pub source: String,
    /// Target node id.
    pub target: String,
    /// Relation type.
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    /// Relation confidence in [0, 1].
    #[serde(default = "default_edge_confidence")]
    pub confidence: f64,
    /// Edge weight; defaults to `confidence` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

fn default_edge_confidence() -> f64 {
    0.5
}

impl Edge {
    /// Create a new edge with default confidence (0.5).
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        edge_type: EdgeType,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            edge_type,
            confidence: default_edge_confidence(),
            weight: None,
        }
    }

    /// Set the confidence, clamped to [0, 1].
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Set an explicit weight.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Effective weight: explicit weight if set, otherwise confidence.
    pub fn effective_weight(&self) -> f64 {
        self.weight.unwrap_or(self.confidence)
    }
}

/// A relation spanning two or more nodes (e.g. a synthesis combining
/// several evidence nodes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperEdge {
    /// Unique hyperedge id.
    pub id: String,
    /// Member node ids (always >= 2).
    pub nodes: Vec<String>,
    /// Human-readable label.
    pub label: String,
    /// Relation confidence in [0, 1].
    pub confidence: f64,
}

impl HyperEdge {
    /// Create a new hyperedge over the given members.
    pub fn new(id: impl Into<String>, nodes: Vec<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            nodes,
            label: label.into(),
            confidence: default_edge_confidence(),
        }
    }

    /// Set the confidence, clamped to [0, 1].
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }
}

/// Document-level metadata, refreshed on every commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphMetadata {
    /// Schema version of the document shape.
    pub schema_version: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Highest stage that has committed to this document (0-9).
    pub current_stage: u32,
    /// Node count at last commit.
    pub node_count: usize,
    /// Edge count at last commit.
    pub edge_count: usize,
    /// Mean of all node confidence means at last commit.
    pub average_confidence: f64,
}

impl Default for GraphMetadata {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            schema_version: SCHEMA_VERSION,
            created_at: now,
            updated_at: now,
            current_stage: 0,
            node_count: 0,
            edge_count: 0,
            average_confidence: 0.0,
        }
    }
}

/// The versioned node/edge/hyperedge container produced by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GraphDocument {
    /// Nodes by id (insertion order irrelevant).
    pub nodes: HashMap<String, Node>,
    /// Ordered edge sequence.
    pub edges: Vec<Edge>,
    /// Ordered hyperedge sequence.
    pub hyperedges: Vec<HyperEdge>,
    /// Document metadata.
    pub metadata: GraphMetadata,
}

impl GraphDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node. Returns false (and leaves the document unchanged)
    /// if a node with the same id already exists.
    pub fn add_node(&mut self, node: Node) -> bool {
        if self.nodes.contains_key(&node.id) {
            return false;
        }
        self.nodes.insert(node.id.clone(), node);
        true
    }

    /// Append an edge. Duplicate edge ids are rejected.
    pub fn add_edge(&mut self, edge: Edge) -> bool {
        if self.edges.iter().any(|e| e.id == edge.id) {
            return false;
        }
        self.edges.push(edge);
        true
    }

    /// Append a hyperedge. Requires >= 2 members, all present in `nodes`.
    pub fn add_hyperedge(&mut self, hyperedge: HyperEdge) -> bool {
        if hyperedge.nodes.len() < 2 {
            return false;
        }
        if !hyperedge.nodes.iter().all(|id| self.nodes.contains_key(id)) {
            return false;
        }
        if self.hyperedges.iter().any(|h| h.id == hyperedge.id) {
            return false;
        }
        self.hyperedges.push(hyperedge);
        true
    }

    /// Get a node by id.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Get a mutable node by id.
    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Ids of all nodes of a given type.
    pub fn node_ids_of_type(&self, node_type: NodeType) -> Vec<String> {
        let mut ids: Vec<String> = self
            .nodes
            .values()
            .filter(|n| n.node_type == node_type)
            .map(|n| n.id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Remove a node by id. Edges pointing at the removed node are kept;
    /// the `valid_edges` view excludes them. Used only by stage-5 pruning.
    pub(crate) fn remove_node(&mut self, id: &str) -> Option<Node> {
        self.nodes.remove(id)
    }

    /// Refresh metadata after a stage mutation.
    pub fn commit(&mut self, stage: u32) {
        self.metadata.current_stage = self.metadata.current_stage.max(stage.min(9));
        self.metadata.updated_at = Utc::now();
        self.metadata.node_count = self.nodes.len();
        self.metadata.edge_count = self.edges.len();
        self.metadata.average_confidence = if self.nodes.is_empty() {
            0.0
        } else {
            self.nodes.values().map(|n| n.confidence.mean()).sum::<f64>() / self.nodes.len() as f64
        };
    }
}
