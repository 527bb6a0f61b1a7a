//! Wire format for confidence trees.
//!
//! The payload is self-describing: feeding `report.nodes` back into the next
//! call reconstructs the tree fully, including the locked
//! `initial_confidence` values and preference ranks. Colors are not trusted
//! on reload; they are refreshed against the caller's current baseline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Node, NodeColor, NodeStore, Role, Shape, START_ID};

/// Serialized form of one [`Node`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePayload {
    pub id: String,
    pub parent_id: Option<String>,
    pub fen: String,
    pub move_from_parent: Option<String>,
    #[serde(rename = "ply_from_S0")]
    pub ply_from_s0: usize,
    /// Effective confidence: `transferred ?? initial ?? confidence`.
    #[serde(rename = "ConfidencePercent")]
    pub confidence_percent: u8,
    #[serde(default)]
    pub has_branches: bool,
    /// Locked at first computation; reloaded verbatim on the next call.
    #[serde(default)]
    pub initial_confidence: Option<u8>,
    #[serde(default)]
    pub transferred_confidence: Option<u8>,
    #[serde(default)]
    pub preference_number: Option<u32>,
    pub insufficient_confidence: bool,
    pub shape: Shape,
    pub color: NodeColor,
    #[serde(default = "Role::payload_fallback")]
    pub role: Role,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub extended_moves: BTreeMap<String, u8>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Role {
    fn payload_fallback() -> Role {
        Role::Extension
    }
}

impl NodePayload {
    pub fn from_node(node: &Node) -> Self {
        NodePayload {
            id: node.id.clone(),
            parent_id: node.parent_id.clone(),
            fen: node.fen.clone(),
            move_from_parent: node.move_uci.clone(),
            ply_from_s0: node.ply_index,
            confidence_percent: node.effective_confidence(),
            has_branches: node.has_branches,
            initial_confidence: node.initial_confidence(),
            transferred_confidence: node.transferred_confidence,
            preference_number: node.preference_number,
            insufficient_confidence: node.color == NodeColor::Red,
            shape: node.shape,
            color: node.color,
            role: node.role,
            tags: node.tags.clone(),
            extended_moves: node.extended_moves.clone(),
            metadata: node.metadata.clone(),
        }
    }
}

impl Node {
    /// Reconstruct a node from its payload.
    ///
    /// The lock is carried over; `transferred_confidence` is not, since it is
    /// recomputed by the next propagation pass. The serialized color is
    /// ignored in favor of a refresh against the current baseline (the start
    /// node comes back grey either way).
    pub fn from_payload(payload: &NodePayload, baseline: u8) -> Node {
        let mut node = Node {
            id: payload.id.clone(),
            parent_id: payload.parent_id.clone(),
            fen: payload.fen.clone(),
            move_uci: payload.move_from_parent.clone(),
            ply_index: payload.ply_from_s0,
            role: if payload.id == START_ID {
                Role::Start
            } else {
                payload.role
            },
            shape: payload.shape,
            color: NodeColor::Red,
            has_branches: payload.has_branches,
            initial_confidence: None,
            transferred_confidence: None,
            confidence: payload.confidence_percent,
            preference_number: payload.preference_number,
            tags: payload.tags.clone(),
            extended_moves: payload.extended_moves.clone(),
            metadata: payload.metadata.clone(),
        };
        if let Some(initial) = payload.initial_confidence {
            node.lock_initial_confidence(initial);
        }
        node.refresh_color(baseline);
        node
    }
}

/// Node budget bookkeeping reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caps {
    pub global_nodes_used: usize,
    pub max_nodes_global: usize,
}

/// Aggregate counters over one tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStats {
    /// Deepest ply reached from the start position.
    pub pv_length: usize,
    pub triangles: usize,
    pub red_pv_nodes: usize,
    pub total_nodes: usize,
    pub alternatives: usize,
    pub extensions: usize,
}

impl TreeStats {
    pub fn measure(store: &NodeStore) -> Self {
        TreeStats {
            pv_length: store.iter().map(|n| n.ply_index).max().unwrap_or(0),
            triangles: store.iter().filter(|n| n.shape == Shape::Triangle).count(),
            red_pv_nodes: store.iter().filter(|n| n.color == NodeColor::Red).count(),
            total_nodes: store.len(),
            alternatives: store.iter().filter(|n| n.role == Role::Alternative).count(),
            extensions: store.iter().filter(|n| n.role == Role::Extension).count(),
        }
    }
}

/// One per-phase view of the tree, kept for debugging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub label: String,
    pub min_confidence: u8,
    pub stats: TreeStats,
    pub nodes: Vec<NodePayload>,
}

/// The full result of one confidence computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceReport {
    /// The root node's effective confidence.
    pub overall_confidence: u8,
    /// Minimum effective confidence over all nodes.
    pub line_confidence: u8,
    /// Maximum effective confidence over all nodes.
    pub end_confidence: u8,
    /// Minimum over the serialized per-node confidences.
    pub lowest_confidence: u8,
    pub nodes: Vec<NodePayload>,
    pub caps: Caps,
    #[serde(default)]
    pub snapshots: Vec<Snapshot>,
    #[serde(default)]
    pub stats: TreeStats,
}

/// Fallback report for unrecoverable analysis failure: every confidence at
/// 100 and no nodes.
pub fn neutral_report(max_nodes_global: usize) -> ConfidenceReport {
    ConfidenceReport {
        overall_confidence: 100,
        line_confidence: 100,
        end_confidence: 100,
        lowest_confidence: 100,
        nodes: Vec::new(),
        caps: Caps {
            global_nodes_used: 0,
            max_nodes_global,
        },
        snapshots: Vec::new(),
        stats: TreeStats::default(),
    }
}
