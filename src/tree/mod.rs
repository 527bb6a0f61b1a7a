//! In-memory store for one confidence tree.
//!
//! A tree is a set of [`Node`]s indexed by id, plus the insertion order that
//! defines the canonical serialization order. The store enforces the two
//! rules everything else depends on:
//!
//! - an id is inserted once; later inserts with the same id are ignored
//! - two nodes describing the same move from the same parent are merged
//!   (role promotion, square-shape promotion, best preference rank, max
//!   confidence) instead of duplicated
//!
//! `initial_confidence` is the one locked field: it is private and can only
//! be written through [`Node::lock_initial_confidence`], which is a no-op
//! once a value is present. Propagation and reloads go through
//! `transferred_confidence` instead.

pub mod payload;

use std::collections::{BTreeMap, HashMap};

use log::debug;
use serde::{Deserialize, Serialize};

/// Reserved id of the root node (the position before the played move).
pub const START_ID: &str = "start";
/// Reserved id of the node for the played move.
pub const PLAYED_ID: &str = "played-move";
/// Reserved id of the node for the engine's deep best move.
pub const BEST_ID: &str = "best-move";

/// Why a node exists in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Start,
    Played,
    Best,
    PlayedBest,
    Alternative,
    Extension,
}

impl Role {
    /// Commutative merge of two roles on the same position. Combining the
    /// played move with the deep best move yields `PlayedBest`; anything
    /// else keeps the first role.
    fn merged_with(self, other: Role) -> Role {
        use Role::*;
        if self == other {
            return self;
        }
        match (self, other) {
            (Played | Best | PlayedBest, Played | Best | PlayedBest) => PlayedBest,
            _ => self,
        }
    }
}

/// Display hint only; carries no semantics beyond serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Square,
    Triangle,
    Circle,
}

/// Node color. `Grey` is reserved for the start node and never refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeColor {
    Grey,
    Red,
    Green,
}

/// One chess position reached by one move from its parent.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: String,
    /// `None` only for the start node.
    pub parent_id: Option<String>,
    pub fen: String,
    /// UCI move from the parent; `None` only for the start node.
    pub move_uci: Option<String>,
    /// Ply distance from the start position.
    pub ply_index: usize,
    pub role: Role,
    pub shape: Shape,
    pub color: NodeColor,
    pub has_branches: bool,
    /// Write-once: set at creation of a directly computed node, then locked.
    initial_confidence: Option<u8>,
    /// Min over children's effective confidences; absent on leaves.
    pub transferred_confidence: Option<u8>,
    /// Current effective confidence, kept in sync with the two above.
    pub confidence: u8,
    /// Depth-2 rank among all legal moves from the parent (1 = best).
    pub preference_number: Option<u32>,
    pub tags: Vec<String>,
    /// Terminal confidence per move this node has been extended with.
    pub extended_moves: BTreeMap<String, u8>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Node {
    /// Create the grey root node for the position before the played move.
    pub fn start(fen: String, confidence: u8) -> Self {
        let mut node = Node {
            id: START_ID.to_string(),
            parent_id: None,
            fen,
            move_uci: None,
            ply_index: 0,
            role: Role::Start,
            shape: Shape::Square,
            color: NodeColor::Grey,
            has_branches: false,
            initial_confidence: None,
            transferred_confidence: None,
            confidence,
            preference_number: None,
            tags: Vec::new(),
            extended_moves: BTreeMap::new(),
            metadata: serde_json::Map::new(),
        };
        node.lock_initial_confidence(confidence);
        node
    }

    /// Create a child node with a freshly computed confidence, locked on the
    /// spot.
    #[allow(clippy::too_many_arguments)]
    pub fn child(
        id: String,
        parent_id: &str,
        fen: String,
        move_uci: String,
        ply_index: usize,
        role: Role,
        shape: Shape,
        confidence: u8,
        baseline: u8,
    ) -> Self {
        let mut node = Node {
            id,
            parent_id: Some(parent_id.to_string()),
            fen,
            move_uci: Some(move_uci),
            ply_index,
            role,
            shape,
            color: NodeColor::Red,
            has_branches: false,
            initial_confidence: None,
            transferred_confidence: None,
            confidence,
            preference_number: None,
            tags: Vec::new(),
            extended_moves: BTreeMap::new(),
            metadata: serde_json::Map::new(),
        };
        node.lock_initial_confidence(confidence);
        node.refresh_color(baseline);
        node
    }

    /// The locked initial confidence, if this node has been directly computed.
    pub fn initial_confidence(&self) -> Option<u8> {
        self.initial_confidence
    }

    /// Set the initial confidence if it has never been set. Silent no-op
    /// otherwise; there is no other write path to the field.
    pub fn lock_initial_confidence(&mut self, value: u8) {
        if self.initial_confidence.is_none() {
            self.initial_confidence = Some(value);
        }
    }

    /// Effective confidence: `transferred ?? initial ?? confidence`.
    pub fn effective_confidence(&self) -> u8 {
        self.transferred_confidence
            .or(self.initial_confidence)
            .unwrap_or(self.confidence)
    }

    /// Overwrite the transferred confidence and resync `confidence` + color.
    pub fn set_transferred_confidence(&mut self, value: u8, baseline: u8) {
        self.transferred_confidence = Some(value);
        self.confidence = value;
        self.refresh_color(baseline);
    }

    /// Drop the transferred confidence (the node is a leaf again as far as
    /// propagation is concerned) and fall back to the initial value.
    pub fn clear_transferred_confidence(&mut self, baseline: u8) {
        self.transferred_confidence = None;
        if let Some(initial) = self.initial_confidence {
            self.confidence = initial;
        }
        self.refresh_color(baseline);
    }

    /// Recompute color from `confidence` against the baseline. The start
    /// node stays grey no matter what.
    pub fn refresh_color(&mut self, baseline: u8) {
        if self.id == START_ID {
            self.color = NodeColor::Grey;
            return;
        }
        self.color = if self.confidence >= baseline {
            NodeColor::Green
        } else {
            NodeColor::Red
        };
    }

    pub fn is_start(&self) -> bool {
        self.id == START_ID
    }
}

/// Ordered, deduplicating collection of nodes for one tree.
///
/// Owned exclusively by one tree computation; not shared across tasks.
#[derive(Debug, Default)]
pub struct NodeStore {
    nodes: HashMap<String, Node>,
    order: Vec<String>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Ids in insertion order.
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    /// Nodes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Direct children of `id`, in insertion order.
    pub fn children_of(&self, id: &str) -> Vec<&Node> {
        self.iter()
            .filter(|n| n.parent_id.as_deref() == Some(id))
            .collect()
    }

    pub fn has_children(&self, id: &str) -> bool {
        self.iter().any(|n| n.parent_id.as_deref() == Some(id))
    }

    /// First node carrying this FEN, in insertion order.
    pub fn find_by_fen(&self, fen: &str) -> Option<&Node> {
        self.iter().find(|n| n.fen == fen)
    }

    /// Insert a node, preserving existing nodes and merging duplicates.
    ///
    /// Returns the id of the node that ends up representing the position:
    /// the new node's own id, or the id of the existing node it was merged
    /// into / shadowed by.
    pub fn insert(&mut self, node: Node, baseline: u8) -> String {
        if self.nodes.contains_key(&node.id) {
            // Same id: the existing node wins outright, locks included.
            debug!(
                "[{}] insert ignored: id already present (existing initial={:?})",
                node.id,
                self.nodes[&node.id].initial_confidence
            );
            return node.id;
        }

        if let Some(existing_id) = self.find_merge_target(&node) {
            self.merge_into(&existing_id, node, baseline);
            return existing_id;
        }

        let id = node.id.clone();
        self.nodes.insert(id.clone(), node);
        self.order.push(id.clone());
        id
    }

    /// A node with the same parent and move (and therefore the same
    /// position) already present under a different id.
    fn find_merge_target(&self, node: &Node) -> Option<String> {
        if node.move_uci.is_none() {
            return None;
        }
        self.iter()
            .find(|n| {
                n.id != node.id
                    && n.parent_id == node.parent_id
                    && n.move_uci == node.move_uci
                    && n.fen == node.fen
            })
            .map(|n| n.id.clone())
    }

    /// Fold `incoming` into the node at `existing_id`.
    ///
    /// Every rule here is commutative and associative, so merge order never
    /// matters: role promotion, square-shape promotion, min preference rank,
    /// max confidence. The existing lock is never touched; an unset lock
    /// adopts the incoming value.
    fn merge_into(&mut self, existing_id: &str, incoming: Node, baseline: u8) {
        debug!(
            "[{}] merging duplicate of {} (move {:?})",
            incoming.id, existing_id, incoming.move_uci
        );

        // Reparent anything that already points at the discarded id.
        let orphan_ids: Vec<String> = self
            .iter()
            .filter(|n| n.parent_id.as_deref() == Some(incoming.id.as_str()))
            .map(|n| n.id.clone())
            .collect();
        for id in orphan_ids {
            if let Some(child) = self.nodes.get_mut(&id) {
                child.parent_id = Some(existing_id.to_string());
            }
        }

        let existing = self
            .nodes
            .get_mut(existing_id)
            .expect("merge target resolved from the store");

        existing.role = existing.role.merged_with(incoming.role);
        if incoming.shape == Shape::Square {
            existing.shape = Shape::Square;
        }
        existing.preference_number = match (existing.preference_number, incoming.preference_number)
        {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        if let Some(value) = incoming.initial_confidence {
            existing.lock_initial_confidence(value);
        }
        existing.confidence = existing.confidence.max(incoming.confidence);
        existing.has_branches = existing.has_branches || incoming.has_branches;
        existing.refresh_color(baseline);
    }

    /// Recompute `has_branches` for every node from actual parent links.
    pub fn refresh_branch_flags(&mut self) {
        let parent_ids: Vec<Option<String>> =
            self.iter().map(|n| n.parent_id.clone()).collect();
        for node in self.nodes.values_mut() {
            node.has_branches = false;
        }
        for parent in parent_ids.into_iter().flatten() {
            if let Some(node) = self.nodes.get_mut(&parent) {
                node.has_branches = true;
            }
        }
    }

    /// Refresh every node's color against `baseline` (start stays grey).
    pub fn refresh_colors(&mut self, baseline: u8) {
        for node in self.nodes.values_mut() {
            node.refresh_color(baseline);
        }
    }

    /// Minimum effective confidence over all nodes, or `default` when empty.
    pub fn min_effective_confidence(&self, default: u8) -> u8 {
        self.iter()
            .map(Node::effective_confidence)
            .min()
            .unwrap_or(default)
    }

    /// Maximum effective confidence over all nodes, or `default` when empty.
    pub fn max_effective_confidence(&self, default: u8) -> u8 {
        self.iter()
            .map(Node::effective_confidence)
            .max()
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STARTPOS: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
    const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";

    fn child(id: &str, move_uci: &str, role: Role, shape: Shape, conf: u8) -> Node {
        Node::child(
            id.to_string(),
            START_ID,
            AFTER_E4.to_string(),
            move_uci.to_string(),
            1,
            role,
            shape,
            conf,
            80,
        )
    }

    #[test]
    fn test_initial_confidence_locks_on_first_write() {
        let mut node = child("played-move", "e2e4", Role::Played, Shape::Triangle, 72);
        assert_eq!(node.initial_confidence(), Some(72));
        node.lock_initial_confidence(99);
        assert_eq!(node.initial_confidence(), Some(72));
    }

    #[test]
    fn test_effective_confidence_precedence() {
        let mut node = child("played-move", "e2e4", Role::Played, Shape::Triangle, 72);
        assert_eq!(node.effective_confidence(), 72);
        node.set_transferred_confidence(55, 80);
        assert_eq!(node.effective_confidence(), 55);
        assert_eq!(node.confidence, 55);
        node.clear_transferred_confidence(80);
        assert_eq!(node.effective_confidence(), 72);
        assert_eq!(node.confidence, 72);
    }

    #[test]
    fn test_start_node_stays_grey() {
        let mut start = Node::start(STARTPOS.to_string(), 95);
        assert_eq!(start.color, NodeColor::Grey);
        start.refresh_color(80);
        assert_eq!(start.color, NodeColor::Grey);
        start.set_transferred_confidence(10, 80);
        assert_eq!(start.color, NodeColor::Grey);
    }

    #[test]
    fn test_color_tracks_baseline() {
        let mut node = child("alt-0", "d2d4", Role::Alternative, Shape::Circle, 80);
        assert_eq!(node.color, NodeColor::Green);
        node.refresh_color(81);
        assert_eq!(node.color, NodeColor::Red);
    }

    #[test]
    fn test_insert_same_id_preserves_existing() {
        let mut store = NodeStore::new();
        store.insert(child("played-move", "e2e4", Role::Played, Shape::Triangle, 70), 80);
        store.insert(child("played-move", "e2e4", Role::Played, Shape::Triangle, 10), 80);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("played-move").unwrap().initial_confidence(), Some(70));
        assert_eq!(store.get("played-move").unwrap().confidence, 70);
    }

    #[test]
    fn test_merge_played_and_best_fuses_roles() {
        let mut store = NodeStore::new();
        store.insert(child("played-move", "e2e4", Role::Played, Shape::Triangle, 60), 80);
        let kept = store.insert(child("best-move", "e2e4", Role::Best, Shape::Square, 75), 80);

        assert_eq!(kept, "played-move");
        assert_eq!(store.len(), 1);
        let node = store.get("played-move").unwrap();
        assert_eq!(node.role, Role::PlayedBest);
        assert_eq!(node.shape, Shape::Square);
        assert_eq!(node.confidence, 75);
        // The first lock survives the merge.
        assert_eq!(node.initial_confidence(), Some(60));
    }

    #[test]
    fn test_merge_is_order_independent() {
        let build = |first: Node, second: Node| {
            let mut store = NodeStore::new();
            store.insert(first, 80);
            store.insert(second, 80);
            let node = store.iter().next().unwrap().clone();
            (node.role, node.shape, node.confidence, node.preference_number)
        };

        let mut played = child("played-move", "e2e4", Role::Played, Shape::Triangle, 60);
        played.preference_number = Some(3);
        let mut best = child("best-move", "e2e4", Role::Best, Shape::Square, 75);
        best.preference_number = Some(1);

        let forward = build(played.clone(), best.clone());
        let backward = build(best, played);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_merge_reparents_children() {
        let mut store = NodeStore::new();
        store.insert(child("played-move", "e2e4", Role::Played, Shape::Triangle, 60), 80);
        let mut grandchild = child("best-move-d18-2", "e7e5", Role::Extension, Shape::Circle, 50);
        grandchild.parent_id = Some("best-move".to_string());
        grandchild.ply_index = 2;
        grandchild.fen = "other".to_string();
        store.insert(grandchild, 80);
        store.insert(child("best-move", "e2e4", Role::Best, Shape::Square, 75), 80);

        let node = store.get("best-move-d18-2").unwrap();
        assert_eq!(node.parent_id.as_deref(), Some("played-move"));
    }

    #[test]
    fn test_distinct_moves_are_not_merged() {
        let mut store = NodeStore::new();
        store.insert(child("played-move", "e2e4", Role::Played, Shape::Triangle, 60), 80);
        let mut alt = child("alt-0", "d2d4", Role::Alternative, Shape::Circle, 50);
        alt.fen = "rnbqkbnr/pppppppp/8/8/3P4/8/PPP1PPPP/RNBQKBNR b KQkq - 0 1".to_string();
        store.insert(alt, 80);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_insertion_order_is_preserved() {
        let mut store = NodeStore::new();
        store.insert(Node::start(STARTPOS.to_string(), 90), 80);
        store.insert(child("played-move", "e2e4", Role::Played, Shape::Triangle, 60), 80);
        let mut alt = child("alt-0", "d2d4", Role::Alternative, Shape::Circle, 50);
        alt.fen = "x".to_string();
        store.insert(alt, 80);
        let ids: Vec<&str> = store.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["start", "played-move", "alt-0"]);
    }

    #[test]
    fn test_refresh_branch_flags() {
        let mut store = NodeStore::new();
        store.insert(Node::start(STARTPOS.to_string(), 90), 80);
        store.insert(child("played-move", "e2e4", Role::Played, Shape::Triangle, 60), 80);
        store.refresh_branch_flags();
        assert!(store.get(START_ID).unwrap().has_branches);
        assert!(!store.get("played-move").unwrap().has_branches);
    }
}
