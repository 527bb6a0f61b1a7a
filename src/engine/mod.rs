//! Tree builder, propagator, and the public confidence API.
//!
//! # Architecture
//!
//! ```text
//! compute_move_confidence(fen, move, options)
//!     │ parse + validate (fail fast)
//!     ▼
//! ConfidenceEngine::run()
//!     ├── load_existing()   (incremental: skip analysis, keep locks)
//!     │       or
//!     ├── build()           (root, played, best-with-fusion, ranking,
//!     │                      alternatives, every score normalized to S0)
//!     ├── propagate()       (transferred = min over children, leaves up)
//!     ├── apply_mode()      (line/end retarget baseline, depth widens ply)
//!     ├── expand()          (optional: ROI pick, chains, widening)
//!     └── finalize()        (payload in insertion order)
//! ```
//!
//! Engine calls are the only suspension points; between two calls the tree
//! satisfies every store invariant. One engine instance owns its store for
//! the whole computation; parallelism happens across trees, never within
//! one.

mod extend;
pub mod summary;

use std::fmt;
use std::str::FromStr;

use chess::{Board, ChessMove, Color, MoveGen};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::analyzer::{normalize_cp, parse_uci_move, walk_pv, Analyzer, AnalyzerResult};
use crate::confidence::{
    confidence, ALT_INITIAL_MAX, DEFAULT_BASELINE, DEFAULT_CHAIN_LENGTH, DEFAULT_DEEP_DEPTH,
    DEFAULT_DELTA2, DEFAULT_MAX_NODES, DEFAULT_MAX_PLY, DEFAULT_TOPK, SHALLOW_DEPTH,
};
use crate::tree::payload::{neutral_report, Caps, ConfidenceReport, NodePayload, Snapshot, TreeStats};
use crate::tree::{Node, NodeStore, Role, Shape, BEST_ID, PLAYED_ID, START_ID};

/// What the caller is optimizing for. Modes only retarget the baseline or
/// the ply budget; node creation, propagation, and the confidence formula
/// are identical across modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Raise the whole line: `target_line_conf` becomes the baseline.
    Line,
    /// Focus the PV endpoint: `target_end_conf` becomes the baseline.
    End,
    /// Search deeper: `max_depth` becomes the ply budget.
    Depth,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "line" => Ok(Mode::Line),
            "end" => Ok(Mode::End),
            "depth" => Ok(Mode::Depth),
            other => Err(format!("unknown mode '{}' (expected line, end, or depth)", other)),
        }
    }
}

/// Tuning knobs for one confidence computation.
#[derive(Debug, Clone)]
pub struct ConfidenceOptions {
    /// Baseline B: confidences at or above are green.
    pub target_conf: u8,
    /// Centipawn margin when screening alternative moves.
    pub delta2: i32,
    /// Retained for API stability; only sizes the multipv screen in the
    /// width-gain estimate.
    pub topk: usize,
    /// Global cap on nodes in the tree.
    pub max_nodes_global: usize,
    /// Ply budget from the start position.
    pub max_ply_from_s0: usize,
    /// Enable extension/widening below the initial tree.
    pub branch: bool,
    /// Nodes from a previous payload; validated against the tree identity
    /// and reloaded with their locks intact.
    pub existing_nodes: Option<Vec<NodePayload>>,
    pub mode: Mode,
    pub target_line_conf: Option<u8>,
    pub target_end_conf: Option<u8>,
    pub max_depth: Option<usize>,
    /// Deep analysis depth D (the shallow depth is always 2).
    pub deep_depth: u8,
    /// Maximum nodes in one extension chain.
    pub chain_length: usize,
}

impl Default for ConfidenceOptions {
    fn default() -> Self {
        Self {
            target_conf: DEFAULT_BASELINE,
            delta2: DEFAULT_DELTA2,
            topk: DEFAULT_TOPK,
            max_nodes_global: DEFAULT_MAX_NODES,
            max_ply_from_s0: DEFAULT_MAX_PLY,
            branch: false,
            existing_nodes: None,
            mode: Mode::Line,
            target_line_conf: None,
            target_end_conf: None,
            max_depth: None,
            deep_depth: DEFAULT_DEEP_DEPTH,
            chain_length: DEFAULT_CHAIN_LENGTH,
        }
    }
}

impl ConfidenceOptions {
    /// Create options from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            target_conf: env_parse("CONFIDENCE_TARGET", defaults.target_conf),
            delta2: env_parse("CONFIDENCE_DELTA2", defaults.delta2),
            topk: env_parse("CONFIDENCE_TOPK", defaults.topk),
            max_nodes_global: env_parse("CONFIDENCE_MAX_NODES", defaults.max_nodes_global),
            max_ply_from_s0: env_parse("CONFIDENCE_MAX_PLY", defaults.max_ply_from_s0),
            branch: std::env::var("CONFIDENCE_BRANCH")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.branch),
            mode: std::env::var("CONFIDENCE_MODE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.mode),
            deep_depth: env_parse("CONFIDENCE_DEEP_DEPTH", defaults.deep_depth),
            chain_length: env_parse("CONFIDENCE_CHAIN_LENGTH", defaults.chain_length),
            ..defaults
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Caller-facing validation failure: the inputs never produced a tree.
#[derive(Debug)]
pub enum MoveError {
    InvalidFen(String),
    IllegalMove { move_text: String, fen: String },
}

impl fmt::Display for MoveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveError::InvalidFen(fen) => write!(f, "invalid FEN '{}'", fen),
            MoveError::IllegalMove { move_text, fen } => {
                write!(f, "move '{}' is not legal in '{}'", move_text, fen)
            }
        }
    }
}

impl std::error::Error for MoveError {}

/// Parse the played move: SAN first, UCI as fallback. Only legal moves pass.
fn parse_move(board: &Board, text: &str) -> Option<ChessMove> {
    if let Ok(mv) = ChessMove::from_san(board, text) {
        if board.legal(mv) {
            return Some(mv);
        }
    }
    parse_uci_move(board, text)
}

/// The four normalized evaluations behind one confidence value, plus the
/// deep line they came from.
struct FourPoint {
    s_deep: i32,
    s_shallow: i32,
    pv_deep: i32,
    pv_shallow: i32,
    deep_moves: Vec<ChessMove>,
}

impl FourPoint {
    fn confidence(&self) -> u8 {
        confidence(self.s_deep, self.s_shallow, self.pv_deep, self.pv_shallow)
    }
}

/// A legal move with its normalized depth-2 score and preference rank.
#[derive(Debug, Clone)]
pub(crate) struct RankedMove {
    pub(crate) mv: ChessMove,
    pub(crate) score: i32,
    pub(crate) rank: u32,
}

/// One confidence-tree computation. Owns the store for its lifetime.
pub struct ConfidenceEngine<'a> {
    analyzer: &'a dyn Analyzer,
    start_board: Board,
    played_move: ChessMove,
    pub(crate) baseline: u8,
    pub(crate) delta2: i32,
    pub(crate) topk: usize,
    pub(crate) max_nodes: usize,
    pub(crate) max_ply: usize,
    pub(crate) deep_depth: u8,
    pub(crate) chain_length: usize,
    branch: bool,
    mode: Mode,
    target_line_conf: Option<u8>,
    target_end_conf: Option<u8>,
    max_depth: Option<usize>,
    s0_side: Color,
    tree_id: String,
    pub(crate) store: NodeStore,
    snapshots: Vec<Snapshot>,
    pub(crate) loaded_existing: bool,
    pub(crate) widened: bool,
}

impl<'a> ConfidenceEngine<'a> {
    pub fn new(
        analyzer: &'a dyn Analyzer,
        start_board: Board,
        played_move: ChessMove,
        options: &ConfidenceOptions,
    ) -> Self {
        let after_board = start_board.make_move_new(played_move);
        let tree_id = format!("{}:{}:{}", start_board, played_move, after_board);

        let mut engine = Self {
            analyzer,
            start_board,
            played_move,
            baseline: options.target_conf,
            delta2: options.delta2,
            topk: options.topk.max(1),
            max_nodes: options.max_nodes_global,
            max_ply: options.max_ply_from_s0,
            deep_depth: options.deep_depth,
            chain_length: options.chain_length,
            branch: options.branch,
            mode: options.mode,
            target_line_conf: options.target_line_conf,
            target_end_conf: options.target_end_conf,
            max_depth: options.max_depth,
            s0_side: start_board.side_to_move(),
            tree_id,
            store: NodeStore::new(),
            snapshots: Vec::new(),
            loaded_existing: false,
            widened: false,
        };

        if let Some(existing) = options.existing_nodes.as_deref() {
            engine.loaded_existing = engine.load_existing(existing);
        }
        engine
    }

    /// Run the computation to completion and produce the payload.
    ///
    /// Analyzer failure during the initial build yields the neutral payload;
    /// failure during expansion keeps whatever tree exists. Neither surfaces
    /// as an error.
    pub async fn run(&mut self) -> ConfidenceReport {
        if !self.loaded_existing {
            if let Err(err) = self.build().await {
                warn!("[{}] initial analysis failed: {}", self.tree_id, err);
                return neutral_report(self.max_nodes);
            }
        } else {
            info!(
                "[{}] resuming from {} existing nodes, skipping analysis",
                self.tree_id,
                self.store.len()
            );
        }

        self.propagate();
        self.record_snapshot("initial");
        self.apply_mode();

        if self.branch {
            if let Err(err) = self.expand().await {
                warn!("[{}] expansion aborted, keeping current tree: {}", self.tree_id, err);
            }
            self.propagate();
            self.record_snapshot("after_expand");
        }

        self.finalize()
    }

    /// Reload a previously serialized tree, rejecting it wholesale when the
    /// tree identity (start FEN, played move, FEN after the played move)
    /// does not match the current computation.
    fn load_existing(&mut self, payloads: &[NodePayload]) -> bool {
        if payloads.is_empty() {
            return false;
        }

        let expected_start = self.start_board.to_string();
        let start_payload = match payloads.iter().find(|p| p.id == START_ID) {
            Some(p) => p,
            None => {
                warn!("[{}] rejecting existing nodes: no start node", self.tree_id);
                return false;
            }
        };
        if start_payload.fen != expected_start {
            warn!(
                "[{}] rejecting existing nodes: start FEN mismatch (got '{}')",
                self.tree_id, start_payload.fen
            );
            return false;
        }
        if let Some(played_payload) = payloads.iter().find(|p| p.id == PLAYED_ID) {
            let expected_after = self.start_board.make_move_new(self.played_move).to_string();
            let expected_move = self.played_move.to_string();
            let same_move = played_payload.move_from_parent.as_deref() == Some(expected_move.as_str());
            if !same_move || played_payload.fen != expected_after {
                warn!(
                    "[{}] rejecting existing nodes: played move mismatch (got {:?})",
                    self.tree_id, played_payload.move_from_parent
                );
                return false;
            }
        }

        for payload in payloads {
            let node = Node::from_payload(payload, self.baseline);
            self.store.insert(node, self.baseline);
        }
        self.store.refresh_branch_flags();
        info!(
            "[{}] loaded {} existing nodes (locks preserved)",
            self.tree_id,
            self.store.len()
        );
        true
    }

    /// Build the initial tree: start, played move, deep best move (fused
    /// into the played node when they coincide), and alternatives the
    /// shallow search prefers over both.
    async fn build(&mut self) -> AnalyzerResult<()> {
        let start_fen = self.start_board.to_string();

        // Root: the position before the played move, grey forever.
        let root = self.four_point(&self.start_board).await?;
        let root_conf = root.confidence();
        self.store.insert(Node::start(start_fen, root_conf), self.baseline);
        let best_move = root.deep_moves.first().copied();

        // Depth-2 ranking of every legal move, shared by preference numbers
        // and the alternatives screen.
        let rankings = self.rank_legal_moves().await?;
        let rank_of = |mv: ChessMove| rankings.iter().find(|r| r.mv == mv).map(|r| r.rank);
        let score_of = |mv: ChessMove| rankings.iter().find(|r| r.mv == mv).map(|r| r.score);

        // Played move, evaluated from the pre-move position.
        let played = self.four_point(&self.start_board).await?;
        let played_conf = played.confidence();
        let after_played = self.start_board.make_move_new(self.played_move);
        let mut played_node = Node::child(
            PLAYED_ID.to_string(),
            START_ID,
            after_played.to_string(),
            self.played_move.to_string(),
            1,
            Role::Played,
            Shape::Triangle,
            played_conf,
            self.baseline,
        );
        played_node.preference_number = rank_of(self.played_move);
        self.store.insert(played_node, self.baseline);

        // Deep best move, evaluated from its post-move position. When it
        // reaches the same position as the played move the store merge
        // fuses the two (role played-best, square shape, max confidence,
        // first lock kept).
        if let Some(best) = best_move {
            let after_best = self.start_board.make_move_new(best);
            let best_fp = self.four_point(&after_best).await?;
            let best_conf = best_fp.confidence();
            let mut best_node = Node::child(
                BEST_ID.to_string(),
                START_ID,
                after_best.to_string(),
                best.to_string(),
                1,
                Role::Best,
                Shape::Square,
                best_conf,
                self.baseline,
            );
            best_node.preference_number = rank_of(best);
            let kept = self.store.insert(best_node, self.baseline);
            if kept == PLAYED_ID {
                debug!("[{}] played move equals best move, nodes fused", self.tree_id);
            }
        }

        // Alternatives: moves the shallow search prefers over both the
        // played and the best move by more than delta2.
        let played_d2 = score_of(self.played_move);
        let best_d2 = best_move.and_then(score_of);
        let threshold = match (played_d2, best_d2) {
            (Some(p), Some(b)) => Some(p.max(b) + self.delta2),
            (Some(p), None) => Some(p + self.delta2),
            (None, Some(b)) => Some(b + self.delta2),
            (None, None) => None,
        };

        let mut alt_counter = 0;
        for ranked in &rankings {
            if ranked.mv == self.played_move || Some(ranked.mv) == best_move {
                continue;
            }
            let Some(threshold) = threshold else { break };
            if ranked.score <= threshold {
                // Rankings are sorted by score; nothing further qualifies.
                break;
            }
            if self.store.len() >= self.max_nodes {
                info!("[{}] node budget reached during alternatives", self.tree_id);
                break;
            }

            let fp = self.four_point(&self.start_board).await?;
            let alt_conf = fp.confidence();
            let after = self.start_board.make_move_new(ranked.mv);
            let mut node = Node::child(
                format!("alt-{}", alt_counter),
                START_ID,
                after.to_string(),
                ranked.mv.to_string(),
                1,
                Role::Alternative,
                Shape::Circle,
                alt_conf,
                self.baseline,
            );
            node.preference_number = Some(ranked.rank);
            self.store.insert(node, self.baseline);
            alt_counter += 1;
            if alt_counter >= ALT_INITIAL_MAX {
                break;
            }
        }

        Ok(())
    }

    /// Analyze `board` deep and shallow, walk the deep PV to its endpoint,
    /// analyze the endpoint deep and shallow, and normalize all four scores
    /// to the S0 perspective.
    async fn four_point(&self, board: &Board) -> AnalyzerResult<FourPoint> {
        let deep = self.analyzer.analyse_pv(board, self.deep_depth, None).await?;
        let shallow = self.analyzer.analyse_pv(board, SHALLOW_DEPTH, None).await?;
        let endpoint = walk_pv(board, &deep.moves, self.deep_depth as usize);
        let ep_deep = self.analyzer.analyse_pv(&endpoint, self.deep_depth, None).await?;
        let ep_shallow = self.analyzer.analyse_pv(&endpoint, SHALLOW_DEPTH, None).await?;

        Ok(FourPoint {
            s_deep: normalize_cp(deep.score(), board.side_to_move(), self.s0_side),
            s_shallow: normalize_cp(shallow.score(), board.side_to_move(), self.s0_side),
            pv_deep: normalize_cp(ep_deep.score(), endpoint.side_to_move(), self.s0_side),
            pv_shallow: normalize_cp(ep_shallow.score(), endpoint.side_to_move(), self.s0_side),
            deep_moves: deep.moves,
        })
    }

    /// Score every legal move from S0 at depth 2 (normalized) and assign
    /// competition ranks: equal scores share a rank, and the next distinct
    /// score jumps by the number of tied moves.
    pub(crate) async fn rank_legal_moves(&self) -> AnalyzerResult<Vec<RankedMove>> {
        let mut scored = Vec::new();
        for mv in MoveGen::new_legal(&self.start_board) {
            let child = self.start_board.make_move_new(mv);
            let analysis = self.analyzer.analyse_pv(&child, SHALLOW_DEPTH, None).await?;
            let score = normalize_cp(analysis.score(), child.side_to_move(), self.s0_side);
            scored.push((mv, score));
        }
        scored.sort_by(|a, b| b.1.cmp(&a.1));

        let mut ranked = Vec::with_capacity(scored.len());
        let mut prev_score = None;
        let mut rank = 0u32;
        for (index, (mv, score)) in scored.into_iter().enumerate() {
            if prev_score != Some(score) {
                rank = index as u32 + 1;
                prev_score = Some(score);
            }
            ranked.push(RankedMove { mv, score, rank });
        }
        Ok(ranked)
    }

    /// Propagate confidence bottom-up: every node with children gets
    /// `transferred = min(children's effective)`, leaves fall back to their
    /// locked initial value.
    pub(crate) fn propagate(&mut self) {
        propagate_store(&mut self.store, self.baseline);
    }

    /// Apply the mode: line/end retarget the baseline, depth widens the ply
    /// budget. Colors are refreshed either way.
    fn apply_mode(&mut self) {
        match self.mode {
            Mode::Line => {
                if let Some(target) = self.target_line_conf {
                    self.baseline = target;
                }
            }
            Mode::End => {
                if let Some(target) = self.target_end_conf {
                    self.baseline = target;
                }
            }
            Mode::Depth => {
                if let Some(depth) = self.max_depth {
                    self.max_ply = depth;
                }
            }
        }
        self.store.refresh_colors(self.baseline);
    }

    fn record_snapshot(&mut self, label: &str) {
        let snapshot = Snapshot {
            label: label.to_string(),
            min_confidence: self.store.min_effective_confidence(100),
            stats: TreeStats::measure(&self.store),
            nodes: self.store.iter().map(NodePayload::from_node).collect(),
        };
        self.snapshots.push(snapshot);
    }

    fn finalize(&mut self) -> ConfidenceReport {
        let nodes: Vec<NodePayload> = self.store.iter().map(NodePayload::from_node).collect();
        let overall = self
            .store
            .get(START_ID)
            .map(Node::effective_confidence)
            .unwrap_or(100);
        let lowest = nodes
            .iter()
            .map(|n| n.confidence_percent)
            .min()
            .unwrap_or(overall);

        ConfidenceReport {
            overall_confidence: overall,
            line_confidence: self.store.min_effective_confidence(overall),
            end_confidence: self.store.max_effective_confidence(overall),
            lowest_confidence: lowest,
            caps: Caps {
                global_nodes_used: nodes.len(),
                max_nodes_global: self.max_nodes,
            },
            nodes,
            snapshots: std::mem::take(&mut self.snapshots),
            stats: TreeStats::measure(&self.store),
        }
    }

}

/// Visit nodes deepest first; parents take the min over their children's
/// effective confidences, leaves drop any stale transferred value.
pub(crate) fn propagate_store(store: &mut NodeStore, baseline: u8) {
    store.refresh_branch_flags();

    let mut ids: Vec<(usize, String)> = store.iter().map(|n| (n.ply_index, n.id.clone())).collect();
    ids.sort_by(|a, b| b.0.cmp(&a.0));

    for (_, id) in ids {
        let child_min = store
            .children_of(&id)
            .iter()
            .map(|c| c.effective_confidence())
            .min();
        if let Some(node) = store.get_mut(&id) {
            match child_min {
                Some(min) => node.set_transferred_confidence(min, baseline),
                None => node.clear_transferred_confidence(baseline),
            }
        }
    }
}

/// Build (or extend) the confidence tree for one played move.
///
/// Fails fast on an invalid FEN or an illegal/unparseable move; every other
/// trouble ends in a well-formed payload (possibly the neutral one).
pub async fn compute_move_confidence(
    analyzer: &dyn Analyzer,
    start_fen: &str,
    move_text: &str,
    options: &ConfidenceOptions,
) -> Result<ConfidenceReport, MoveError> {
    let board =
        Board::from_str(start_fen).map_err(|_| MoveError::InvalidFen(start_fen.to_string()))?;
    let played = parse_move(&board, move_text).ok_or_else(|| MoveError::IllegalMove {
        move_text: move_text.to_string(),
        fen: start_fen.to_string(),
    })?;

    let mut engine = ConfidenceEngine::new(analyzer, board, played, options);
    Ok(engine.run().await)
}

/// Confidence for a position: picks the engine's best move from `start_fen`
/// and delegates to [`compute_move_confidence`].
pub async fn compute_position_confidence(
    analyzer: &dyn Analyzer,
    start_fen: &str,
    target_conf: u8,
    branch: bool,
) -> Result<ConfidenceReport, MoveError> {
    let board =
        Board::from_str(start_fen).map_err(|_| MoveError::InvalidFen(start_fen.to_string()))?;
    let options = ConfidenceOptions {
        target_conf,
        branch,
        ..ConfidenceOptions::default()
    };

    let pv = match analyzer
        .analyse_pv(&board, options.deep_depth, Some(options.max_ply_from_s0))
        .await
    {
        Ok(pv) => pv,
        Err(err) => {
            warn!("position analysis failed for '{}': {}", start_fen, err);
            return Ok(neutral_report(options.max_nodes_global));
        }
    };
    let Some(best) = pv.best_move() else {
        return Ok(neutral_report(options.max_nodes_global));
    };

    compute_move_confidence(analyzer, start_fen, &best.to_string(), &options).await
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::str::FromStr;

    use chess::{Board, ChessMove};

    use crate::analyzer::scripted::ScriptedAnalyzer;

    pub(crate) const STARTPOS: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    pub(crate) fn board_after(fen: &str, moves: &[&str]) -> Board {
        let mut board = Board::from_str(fen).expect("valid fen");
        for mv in moves {
            board = board.make_move_new(ChessMove::from_str(mv).expect("valid uci"));
        }
        board
    }

    pub(crate) fn fen_after(fen: &str, moves: &[&str]) -> String {
        board_after(fen, moves).to_string()
    }

    /// Confidence of the start position (and of the played move, which is
    /// computed from the same pre-move position) under [`scripted_startpos`].
    pub(crate) const ROOT_CONF: u8 = 74;
    /// Confidence of the deep best move (1. e4) under [`scripted_startpos`].
    pub(crate) const BEST_CONF: u8 = 79;

    /// Start position with a fully scripted evaluation picture:
    ///
    /// - deep PV from the start is 1. e4 e5, scored 40 deep / 35 shallow
    /// - the endpoint of that line scores 38 deep / 30 shallow -> 74
    /// - after 1. e4 the deep line is 1... c5 (60/55 normalized, endpoint
    ///   58/52) -> 79
    /// - depth-2 child scores rank e2e4 first, d2d4 second, g1h3 third,
    ///   everything else tied behind
    pub(crate) fn scripted_startpos() -> ScriptedAnalyzer {
        let mut analyzer = ScriptedAnalyzer::new();
        let startpos = fen_after(STARTPOS, &[]);
        let after_e4 = fen_after(STARTPOS, &["e2e4"]);
        let after_d4 = fen_after(STARTPOS, &["d2d4"]);
        let after_nh3 = fen_after(STARTPOS, &["g1h3"]);
        let open_endpoint = fen_after(STARTPOS, &["e2e4", "e7e5"]);
        let sicilian_endpoint = fen_after(STARTPOS, &["e2e4", "c7c5"]);

        analyzer.script(&startpos, 18, 40, &["e2e4", "e7e5"]);
        analyzer.script(&startpos, 2, 35, &["e2e4"]);
        analyzer.script(&open_endpoint, 18, 38, &[]);
        analyzer.script(&open_endpoint, 2, 30, &[]);
        analyzer.script(&after_e4, 18, -60, &["c7c5"]);
        analyzer.script(&after_e4, 2, -55, &[]);
        analyzer.script(&sicilian_endpoint, 18, 58, &[]);
        analyzer.script(&sicilian_endpoint, 2, 52, &[]);
        analyzer.script(&after_d4, 2, -45, &[]);
        analyzer.script(&after_nh3, 2, -10, &[]);
        analyzer
    }
}
