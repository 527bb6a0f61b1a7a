//! Built-in material analyzer.
//!
//! A compact alpha-beta negamax over material and mobility, implementing
//! the [`Analyzer`] trait. It exists so the crate can run end to end (the
//! demo binary and integration tests use it) while a real UCI engine
//! stays behind the same trait in production setups.
//!
//! Requested depths are clamped to a configurable cap: confidence trees ask
//! for depth 18, which a toy searcher cannot honor in reasonable time. The
//! clamp keeps the deep/shallow asymmetry (deep requests still search
//! strictly deeper than depth-2 requests) without the exponential blowup.

use async_trait::async_trait;
use chess::{Board, BoardStatus, ChessMove, Color, MoveGen, Piece};

use super::{Analyzer, AnalyzerResult, PvAnalysis, ScoredMove};

/// Default clamp on the effective search depth.
const DEFAULT_DEPTH_CAP: u8 = 4;

const MATE_SCORE: i32 = 30_000;
const MATE_THRESHOLD: i32 = 29_000;
const INFINITY: i32 = 1_000_000;

/// Centipawn value of one piece kind.
fn piece_value(piece: Piece) -> i32 {
    match piece {
        Piece::Pawn => 100,
        Piece::Knight => 320,
        Piece::Bishop => 330,
        Piece::Rook => 500,
        Piece::Queen => 900,
        Piece::King => 0,
    }
}

/// Static evaluation from the side to move's perspective: material balance
/// plus one centipawn per available move.
pub fn evaluate_board(board: &Board) -> i32 {
    let mut white_material = 0;
    let mut black_material = 0;
    for piece in [
        Piece::Pawn,
        Piece::Knight,
        Piece::Bishop,
        Piece::Rook,
        Piece::Queen,
    ] {
        let bb = *board.pieces(piece);
        white_material +=
            piece_value(piece) * (bb & *board.color_combined(Color::White)).popcnt() as i32;
        black_material +=
            piece_value(piece) * (bb & *board.color_combined(Color::Black)).popcnt() as i32;
    }

    let material = match board.side_to_move() {
        Color::White => white_material - black_material,
        Color::Black => black_material - white_material,
    };
    let mobility = MoveGen::new_legal(board).len() as i32;
    material + mobility
}

/// Negamax with alpha-beta, returning the score and the principal
/// variation. Mates score `MATE_SCORE` plus remaining depth so nearer
/// mates win the comparison.
fn negamax(board: &Board, depth: u8, mut alpha: i32, beta: i32) -> (i32, Vec<ChessMove>) {
    match board.status() {
        BoardStatus::Checkmate => return (-(MATE_SCORE + depth as i32), Vec::new()),
        BoardStatus::Stalemate => return (0, Vec::new()),
        BoardStatus::Ongoing => {}
    }
    if depth == 0 {
        return (evaluate_board(board), Vec::new());
    }

    let mut best_score = -INFINITY;
    let mut best_line = Vec::new();
    let mut child = *board;
    for mv in MoveGen::new_legal(board) {
        board.make_move(mv, &mut child);
        let (reply_score, reply_line) = negamax(&child, depth - 1, -beta, -alpha);
        let score = -reply_score;
        if score > best_score {
            best_score = score;
            best_line = std::iter::once(mv).chain(reply_line).collect();
        }
        if score > alpha {
            alpha = score;
        }
        if alpha >= beta {
            break;
        }
    }
    (best_score, best_line)
}

/// Convert a mate-flavored score back into moves-to-mate. Mate scores carry
/// the remaining search depth, so plies-to-mate is the searched depth minus
/// that remainder.
fn mate_in_from_score(score: i32, searched_depth: u8) -> Option<i32> {
    if score >= MATE_THRESHOLD {
        let plies = (searched_depth as i32 - (score - MATE_SCORE)).max(1);
        Some((plies + 1) / 2)
    } else if score <= -MATE_THRESHOLD {
        let plies = (searched_depth as i32 - (-score - MATE_SCORE)).max(1);
        Some(-((plies + 1) / 2))
    } else {
        None
    }
}

/// Material/mobility searcher behind the [`Analyzer`] trait.
#[derive(Debug, Clone)]
pub struct MaterialAnalyzer {
    depth_cap: u8,
}

impl MaterialAnalyzer {
    pub fn new() -> Self {
        Self {
            depth_cap: DEFAULT_DEPTH_CAP,
        }
    }

    /// Raise or lower the search-depth clamp (kept at least 1).
    pub fn with_depth_cap(depth_cap: u8) -> Self {
        Self {
            depth_cap: depth_cap.max(1),
        }
    }

    fn effective_depth(&self, requested: u8) -> u8 {
        requested.clamp(1, self.depth_cap)
    }
}

impl Default for MaterialAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Analyzer for MaterialAnalyzer {
    async fn analyse_pv(
        &self,
        board: &Board,
        depth: u8,
        max_length: Option<usize>,
    ) -> AnalyzerResult<PvAnalysis> {
        match board.status() {
            BoardStatus::Checkmate => {
                return Ok(PvAnalysis {
                    score_cp: Some(-MATE_SCORE),
                    moves: Vec::new(),
                    mate_in: Some(0),
                })
            }
            BoardStatus::Stalemate => {
                return Ok(PvAnalysis {
                    score_cp: Some(0),
                    moves: Vec::new(),
                    mate_in: None,
                })
            }
            BoardStatus::Ongoing => {}
        }

        let effective = self.effective_depth(depth);
        let (score, mut line) = negamax(board, effective, -INFINITY, INFINITY);
        if let Some(cap) = max_length {
            line.truncate(cap);
        }
        Ok(PvAnalysis {
            score_cp: Some(score),
            mate_in: mate_in_from_score(score, effective),
            moves: line,
        })
    }

    async fn analyse_multipv(
        &self,
        board: &Board,
        depth: u8,
        multipv: usize,
    ) -> AnalyzerResult<Vec<ScoredMove>> {
        if board.status() != BoardStatus::Ongoing {
            return Ok(Vec::new());
        }

        let reply_depth = self.effective_depth(depth).saturating_sub(1);
        let mut entries = Vec::new();
        let mut child = *board;
        for mv in MoveGen::new_legal(board) {
            board.make_move(mv, &mut child);
            let (reply_score, _) = negamax(&child, reply_depth, -INFINITY, INFINITY);
            entries.push(ScoredMove {
                score_cp: -reply_score,
                mv,
            });
        }
        entries.sort_by(|a, b| b.score_cp.cmp(&a.score_cp));
        entries.truncate(multipv);
        Ok(entries)
    }
}
