//! Growing the tree past the initial build.
//!
//! Two strategies raise confidence: depth expansion (best-move chains below
//! a low-confidence leaf) and width expansion (more alternative children of
//! the root). A small ROI heuristic picks which one leads; after that, the
//! extend-reselect loop keeps chaining below qualifying leaves until
//! nothing qualifies, the iteration cap trips, or the node budget runs out.
//!
//! Extension never touches an existing node's locked value: every new node
//! gets its own freshly computed, freshly locked confidence, and parents
//! only ever change through propagation.

use std::collections::HashSet;
use std::str::FromStr;

use chess::Board;
use log::{debug, info, warn};

use crate::analyzer::{is_terminal, normalize_cp, walk_pv, AnalyzerResult};
use crate::confidence::{confidence, EXTEND_ITERATION_CAP, SHALLOW_DEPTH};
use crate::tree::{Node, Role, Shape, START_ID};

use super::ConfidenceEngine;

/// Which leaves qualify for extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LeafPolicy {
    /// Only leaves whose effective confidence is below the baseline.
    BelowBaseline,
    /// Every extendable leaf, used when the caller explicitly asked for a
    /// confidence raise on an existing tree.
    AllLeaves,
}

/// Estimated payoff of one expansion strategy.
struct GainEstimate {
    gain: f64,
    time_estimate: f64,
    roi: f64,
}

impl GainEstimate {
    fn none() -> Self {
        GainEstimate {
            gain: 0.0,
            time_estimate: 0.0,
            roi: 0.0,
        }
    }
}

impl ConfidenceEngine<'_> {
    /// Expansion pass: depth chains below qualifying leaves, then width
    /// expansion when the ROI estimate favored it, then one last
    /// propagation in the caller.
    pub(crate) async fn expand(&mut self) -> AnalyzerResult<()> {
        let policy = if self.loaded_existing {
            LeafPolicy::AllLeaves
        } else {
            LeafPolicy::BelowBaseline
        };

        let widen = self.width_beats_depth().await?;

        let mut iterations = 0;
        loop {
            if iterations >= EXTEND_ITERATION_CAP {
                info!("extension stopped at iteration cap ({})", EXTEND_ITERATION_CAP);
                break;
            }
            let leaves = self.extendable_leaves(policy);
            if leaves.is_empty() {
                break;
            }
            debug!(
                "extension round {}: {} candidate leaves",
                iterations + 1,
                leaves.len()
            );

            let mut created_any = false;
            for leaf_id in leaves {
                if self.store.len() >= self.max_nodes {
                    info!("node budget reached ({}), extension stopped", self.max_nodes);
                    return Ok(());
                }
                let created = self.extend_leaf(&leaf_id).await?;
                created_any |= created > 0;
                self.propagate();
            }
            if !created_any {
                break;
            }
            iterations += 1;
        }

        // Width runs after depth expansion and never re-enters; the caller
        // does the final propagation.
        if widen {
            self.expand_width().await?;
            self.propagate();
        }
        Ok(())
    }

    /// Compare the estimated confidence gain per second of going deeper
    /// against going wider. Purely a scheduling hint; the nodes either way
    /// carry the same invariants.
    async fn width_beats_depth(&self) -> AnalyzerResult<bool> {
        let lowest_conf = self
            .extendable_leaves(LeafPolicy::AllLeaves)
            .iter()
            .filter_map(|id| self.store.get(id).map(Node::effective_confidence))
            .min();

        let depth_estimate = match lowest_conf {
            Some(conf) => self.estimate_depth_gain(conf),
            None => GainEstimate::none(),
        };
        let width_estimate = self.estimate_width_gain().await?;

        if depth_estimate.roi > width_estimate.roi && depth_estimate.gain > 0.0 {
            info!(
                "expansion strategy: depth (gain {:.1} / {:.1}s)",
                depth_estimate.gain, depth_estimate.time_estimate
            );
            Ok(false)
        } else if width_estimate.gain > 0.0 {
            info!(
                "expansion strategy: width (gain {:.1} / {:.1}s)",
                width_estimate.gain, width_estimate.time_estimate
            );
            Ok(true)
        } else {
            debug!("no expansion strategy looks profitable");
            Ok(false)
        }
    }

    /// Extending a few plies usually recovers a slice of the gap to the
    /// baseline; assume roughly 3 seconds of engine time per chain.
    fn estimate_depth_gain(&self, leaf_confidence: u8) -> GainEstimate {
        let gap = self.baseline.saturating_sub(leaf_confidence) as f64;
        let gain = (gap * 0.3).clamp(3.0, 8.0);
        let time_estimate = 3.0;
        GainEstimate {
            gain,
            time_estimate,
            roi: gain / time_estimate,
        }
    }

    /// Screen the top shallow candidates for moves not yet in the tree;
    /// each missing alternative is worth a couple of points for about a
    /// second and a half of engine time.
    async fn estimate_width_gain(&self) -> AnalyzerResult<GainEstimate> {
        let candidates = self
            .analyzer
            .analyse_multipv(&self.start_board, SHALLOW_DEPTH, self.topk.max(1) + 1)
            .await?;

        let existing: HashSet<String> = self
            .store
            .children_of(START_ID)
            .iter()
            .filter_map(|n| n.move_uci.clone())
            .collect();
        let missing = candidates
            .iter()
            .filter(|c| !existing.contains(&c.mv.to_string()))
            .count();
        if missing == 0 {
            return Ok(GainEstimate::none());
        }

        let gain = (missing as f64 * 1.5).clamp(2.0, 5.0);
        let time_estimate = missing.min(2) as f64 * 1.5;
        Ok(GainEstimate {
            gain,
            time_estimate,
            roi: gain / time_estimate,
        })
    }

    /// Leaves that may grow a chain: directly computed (locked), childless,
    /// inside the ply budget, and not the start node.
    pub(crate) fn extendable_leaves(&self, policy: LeafPolicy) -> Vec<String> {
        self.store
            .iter()
            .filter(|n| !n.is_start())
            .filter(|n| n.initial_confidence().is_some())
            .filter(|n| n.ply_index < self.max_ply)
            .filter(|n| !self.store.has_children(&n.id))
            .filter(|n| match policy {
                LeafPolicy::AllLeaves => true,
                LeafPolicy::BelowBaseline => n.effective_confidence() < self.baseline,
            })
            .map(|n| n.id.clone())
            .collect()
    }

    /// Grow one best-move chain below a leaf: up to `chain_length` nodes,
    /// each taking the deep best move from the previous position, each with
    /// its own freshly locked confidence. Stops at terminal positions, the
    /// ply budget, or the node budget. Returns the number of nodes created.
    pub(crate) async fn extend_leaf(&mut self, leaf_id: &str) -> AnalyzerResult<usize> {
        let Some(leaf) = self.store.get(leaf_id) else {
            return Ok(0);
        };
        if leaf.initial_confidence().is_none() {
            debug!("[{}] not extendable: never directly computed", leaf_id);
            return Ok(0);
        }
        if leaf.ply_index >= self.max_ply {
            return Ok(0);
        }
        let Ok(mut board) = Board::from_str(&leaf.fen) else {
            warn!("[{}] unparseable FEN '{}', skipping extension", leaf_id, leaf.fen);
            return Ok(0);
        };

        let mut cursor_id = leaf.id.clone();
        let mut cursor_ply = leaf.ply_index;
        let mut first_move: Option<String> = None;
        let mut chain_tail_conf: Option<u8> = None;
        let mut created = 0;

        for _ in 0..self.chain_length {
            if cursor_ply >= self.max_ply || is_terminal(&board) {
                break;
            }
            if self.store.len() >= self.max_nodes {
                info!("node budget reached inside chain below {}", leaf_id);
                break;
            }

            let pv = self
                .analyzer
                .analyse_pv(&board, self.deep_depth, Some(1))
                .await?;
            let Some(mv) = pv.best_move() else { break };
            if !board.legal(mv) {
                break;
            }
            let next_board = board.make_move_new(mv);
            if is_terminal(&next_board) {
                debug!("[{}] chain hit a terminal position, stopping", cursor_id);
                break;
            }

            // The new node's confidence comes from the position before the
            // move; the endpoint is the rest of that deep line walked from
            // the position after it.
            let deep = self.analyzer.analyse_pv(&board, self.deep_depth, None).await?;
            let shallow = self.analyzer.analyse_pv(&board, SHALLOW_DEPTH, None).await?;
            let remainder = match deep.moves.split_first() {
                Some((head, tail)) if *head == mv => tail,
                _ => deep.moves.as_slice(),
            };
            let endpoint = walk_pv(&next_board, remainder, self.deep_depth as usize);
            let ep_deep = self.analyzer.analyse_pv(&endpoint, self.deep_depth, None).await?;
            let ep_shallow = self.analyzer.analyse_pv(&endpoint, SHALLOW_DEPTH, None).await?;

            let s_deep = normalize_cp(deep.score(), board.side_to_move(), self.s0_side);
            let s_shallow = normalize_cp(shallow.score(), board.side_to_move(), self.s0_side);
            let pv_deep = normalize_cp(ep_deep.score(), endpoint.side_to_move(), self.s0_side);
            let pv_shallow = normalize_cp(ep_shallow.score(), endpoint.side_to_move(), self.s0_side);
            let conf = confidence(s_deep, s_shallow, pv_deep, pv_shallow);

            let node_id = format!("{}-d{}-{}", cursor_id, self.deep_depth, cursor_ply + 1);
            let node = Node::child(
                node_id,
                &cursor_id,
                next_board.to_string(),
                mv.to_string(),
                cursor_ply + 1,
                Role::Extension,
                Shape::Circle,
                conf,
                self.baseline,
            );
            let inserted_id = self.store.insert(node, self.baseline);
            if let Some(parent) = self.store.get_mut(&cursor_id) {
                parent.has_branches = true;
            }

            if first_move.is_none() {
                first_move = Some(mv.to_string());
            }
            chain_tail_conf = Some(conf);
            created += 1;
            cursor_id = inserted_id;
            cursor_ply += 1;
            board = next_board;
        }

        if let (Some(mv), Some(conf)) = (first_move, chain_tail_conf) {
            if let Some(leaf) = self.store.get_mut(leaf_id) {
                leaf.extended_moves.insert(mv, conf);
            }
            debug!("[{}] chain of {} nodes created", leaf_id, created);
        }
        Ok(created)
    }

    /// Width expansion: add alternative children of the start node for
    /// every preference rank not yet represented, as long as the shallow
    /// score is not worse than the played move's by more than delta2. Runs
    /// at most once per computation.
    pub(crate) async fn expand_width(&mut self) -> AnalyzerResult<()> {
        if self.widened {
            return Ok(());
        }
        self.widened = true;

        let rankings = self.rank_legal_moves().await?;
        let played_d2 = rankings
            .iter()
            .find(|r| r.mv == self.played_move)
            .map(|r| r.score)
            .unwrap_or(0);
        let floor = played_d2 - self.delta2;

        let existing_moves: HashSet<String> = self
            .store
            .children_of(START_ID)
            .iter()
            .filter_map(|n| n.move_uci.clone())
            .collect();
        let mut alt_counter = self
            .store
            .iter()
            .filter(|n| n.id.starts_with("alt-"))
            .count();
        let mut added = 0;

        for ranked in &rankings {
            if ranked.mv == self.played_move || existing_moves.contains(&ranked.mv.to_string()) {
                continue;
            }
            if ranked.score < floor {
                continue;
            }
            if self.store.len() >= self.max_nodes {
                info!("node budget reached during width expansion");
                break;
            }

            let fp = self.four_point(&self.start_board).await?;
            let conf = fp.confidence();
            let after = self.start_board.make_move_new(ranked.mv);
            let mut node = Node::child(
                format!("alt-{}", alt_counter),
                START_ID,
                after.to_string(),
                ranked.mv.to_string(),
                1,
                Role::Alternative,
                Shape::Circle,
                conf,
                self.baseline,
            );
            node.preference_number = Some(ranked.rank);
            self.store.insert(node, self.baseline);
            alt_counter += 1;
            added += 1;
        }

        info!("width expansion added {} alternative(s)", added);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures::*;
    use crate::engine::{
        compute_move_confidence, parse_move, ConfidenceEngine, ConfidenceOptions,
    };
    use crate::tree::payload::NodePayload;
    use crate::tree::NodeColor;

    fn node<'a>(nodes: &'a [NodePayload], id: &str) -> &'a NodePayload {
        nodes
            .iter()
            .find(|n| n.id == id)
            .unwrap_or_else(|| panic!("node '{}' missing from payload", id))
    }

    #[tokio::test]
    async fn test_extension_chains_below_low_confidence_leaves() {
        let analyzer = scripted_startpos();
        let options = ConfidenceOptions {
            branch: true,
            target_conf: 90,
            max_ply_from_s0: 2,
            ..ConfidenceOptions::default()
        };
        let report = compute_move_confidence(&analyzer, STARTPOS, "Nh3", &options)
            .await
            .unwrap();

        // One chain node under each red leaf, named {parent}-d{D}-{ply}.
        let played_ext = node(&report.nodes, "played-move-d18-2");
        assert_eq!(played_ext.parent_id.as_deref(), Some("played-move"));
        assert_eq!(played_ext.role, Role::Extension);
        assert_eq!(played_ext.shape, Shape::Circle);
        assert_eq!(played_ext.ply_from_s0, 2);
        assert!(played_ext.initial_confidence.is_some());

        let best_ext = node(&report.nodes, "best-move-d18-2");
        assert_eq!(best_ext.parent_id.as_deref(), Some("best-move"));
        assert_eq!(best_ext.initial_confidence, Some(BEST_CONF));

        // The parent's transferred confidence became the min over its
        // children while its own lock stayed put.
        let played = node(&report.nodes, "played-move");
        assert_eq!(played.initial_confidence, Some(ROOT_CONF));
        assert_eq!(
            played.transferred_confidence,
            Some(played_ext.confidence_percent)
        );
        assert!(played.has_branches);
        // The first chain move is recorded with the chain's tail confidence.
        assert_eq!(
            played.extended_moves.values().next().copied(),
            Some(played_ext.confidence_percent)
        );

        // Nothing grew past the ply budget.
        assert!(report.nodes.iter().all(|n| n.ply_from_s0 <= 2));
        assert_eq!(report.caps.global_nodes_used, 5);
        assert_eq!(report.stats.extensions, 2);
        assert_eq!(
            report.overall_confidence,
            node(&report.nodes, "start").confidence_percent
        );
    }

    #[tokio::test]
    async fn test_terminal_position_stops_the_chain() {
        // Black to move; after the played pawn push, white mates with Ra8#,
        // so the chain below the played move cannot create any node.
        let start_fen = "6k1/5ppp/8/8/8/1p6/5PPP/R5K1 b - - 0 1";
        let after_played = fen_after(start_fen, &["b3b2"]);

        let mut analyzer = crate::analyzer::scripted::ScriptedAnalyzer::new();
        let start_key = fen_after(start_fen, &[]);
        analyzer.script(&start_key, 18, 40, &[]);
        analyzer.script(&start_key, 2, -20, &[]);
        analyzer.script(&after_played, 18, 500, &["a1a8"]);

        let options = ConfidenceOptions {
            branch: true,
            ..ConfidenceOptions::default()
        };
        let report = compute_move_confidence(&analyzer, start_fen, "b3b2", &options)
            .await
            .unwrap();

        // Only the start and played nodes; the chain stopped without error.
        assert_eq!(report.nodes.len(), 2);
        let played = node(&report.nodes, "played-move");
        assert_eq!(played.transferred_confidence, None);
        assert_eq!(played.confidence_percent, played.initial_confidence.unwrap());
        assert_eq!(played.color, NodeColor::Red);
        assert!(played.extended_moves.is_empty());
    }

    #[tokio::test]
    async fn test_width_expansion_fills_missing_preference_ranks() {
        let analyzer = scripted_startpos();
        let board = board_after(STARTPOS, &[]);
        let played = parse_move(&board, "Nh3").unwrap();
        let mut engine =
            ConfidenceEngine::new(&analyzer, board, played, &ConfidenceOptions::default());
        engine.run().await;
        assert_eq!(engine.store.len(), 3);

        engine.expand_width().await.unwrap();

        // Every legal move is now a child of the start node: the built
        // played/best pair plus 18 fresh alternatives.
        assert_eq!(engine.store.len(), 21);
        assert_eq!(engine.store.children_of(START_ID).len(), 20);

        // The strongest missing move fills the first slot with its rank.
        let first_alt = engine.store.get("alt-0").unwrap();
        assert_eq!(first_alt.move_uci.as_deref(), Some("d2d4"));
        assert_eq!(first_alt.preference_number, Some(2));
        assert_eq!(first_alt.role, Role::Alternative);
        assert!(first_alt.initial_confidence().is_some());

        // Width expansion never re-enters.
        engine.expand_width().await.unwrap();
        assert_eq!(engine.store.len(), 21);
    }

    #[tokio::test]
    async fn test_node_budget_stops_expansion() {
        let analyzer = scripted_startpos();
        let options = ConfidenceOptions {
            branch: true,
            target_conf: 90,
            max_nodes_global: 4,
            max_ply_from_s0: 6,
            ..ConfidenceOptions::default()
        };
        let report = compute_move_confidence(&analyzer, STARTPOS, "Nh3", &options)
            .await
            .unwrap();

        assert_eq!(report.caps.global_nodes_used, 4);
        assert_eq!(report.caps.max_nodes_global, 4);
        assert_eq!(report.nodes.len(), 4);
    }

    #[tokio::test]
    async fn test_loaded_tree_extends_even_green_leaves() {
        let analyzer = scripted_startpos();
        let first = compute_move_confidence(
            &analyzer,
            STARTPOS,
            "Nh3",
            &ConfidenceOptions::default(),
        )
        .await
        .unwrap();

        // Reload with a lower baseline: both leaves are green now, yet the
        // explicit raise still widens and extends all of them.
        let raise = ConfidenceOptions {
            branch: true,
            target_conf: 70,
            max_ply_from_s0: 3,
            existing_nodes: Some(first.nodes.clone()),
            ..ConfidenceOptions::default()
        };
        let second = compute_move_confidence(&analyzer, STARTPOS, "Nh3", &raise)
            .await
            .unwrap();

        // Green leaves got chains anyway.
        assert!(second.nodes.iter().any(|n| n.id == "played-move-d18-2"));
        assert!(second.nodes.iter().any(|n| n.id == "best-move-d18-2"));
        // Width expansion ran as well.
        assert!(second.nodes.iter().any(|n| n.id.starts_with("alt-")));
        assert!(second.caps.global_nodes_used > first.caps.global_nodes_used);
        assert!(second.caps.global_nodes_used <= second.caps.max_nodes_global);

        // Locks from the first run survived the whole raise.
        assert_eq!(
            node(&second.nodes, "played-move").initial_confidence,
            Some(ROOT_CONF)
        );
        assert_eq!(
            node(&second.nodes, "best-move").initial_confidence,
            Some(BEST_CONF)
        );
    }

    #[tokio::test]
    async fn test_expansion_failure_keeps_loaded_tree() {
        let analyzer = scripted_startpos();
        let first = compute_move_confidence(
            &analyzer,
            STARTPOS,
            "Nh3",
            &ConfidenceOptions::default(),
        )
        .await
        .unwrap();

        let mut failing = scripted_startpos();
        failing.fail_for(&fen_after(STARTPOS, &["g1h3"]));
        let raise = ConfidenceOptions {
            branch: true,
            target_conf: 90,
            existing_nodes: Some(first.nodes.clone()),
            ..ConfidenceOptions::default()
        };
        let second = compute_move_confidence(&failing, STARTPOS, "Nh3", &raise)
            .await
            .unwrap();

        // The loaded tree comes back unchanged (propagated, recolored).
        assert_eq!(second.nodes.len(), first.nodes.len());
        assert_eq!(
            node(&second.nodes, "played-move").initial_confidence,
            Some(ROOT_CONF)
        );
        assert_eq!(second.overall_confidence, ROOT_CONF.min(BEST_CONF));
    }

    #[tokio::test]
    async fn test_leaf_policies() {
        let analyzer = scripted_startpos();
        let board = board_after(STARTPOS, &[]);
        let played = parse_move(&board, "Nh3").unwrap();
        let mut engine =
            ConfidenceEngine::new(&analyzer, board, played, &ConfidenceOptions::default());
        engine.run().await;

        // Baseline 80: both leaves (74 and 79) qualify either way.
        let below = engine.extendable_leaves(LeafPolicy::BelowBaseline);
        assert_eq!(below, vec!["played-move".to_string(), "best-move".to_string()]);

        // Baseline 70: nothing is below, but the all-leaves policy still
        // selects both.
        engine.baseline = 70;
        assert!(engine.extendable_leaves(LeafPolicy::BelowBaseline).is_empty());
        assert_eq!(
            engine.extendable_leaves(LeafPolicy::AllLeaves).len(),
            2
        );
    }
}
