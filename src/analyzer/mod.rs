//! The analyzer seam.
//!
//! The confidence engine never searches on its own: every evaluation comes
//! from an [`Analyzer`], an async interface over some engine backend (a UCI
//! engine behind a queue in production, the built-in material searcher for
//! demos, a scripted table in tests). Scores returned by an analyzer are
//! always from the side to move of the argument board; callers normalize to
//! the tree root's perspective with [`normalize_cp`] immediately on receipt.

pub mod material;
pub mod scripted;

use async_trait::async_trait;
use chess::{Board, BoardStatus, ChessMove, Color, Square};
use std::str::FromStr;

/// Error type shared by all analyzer backends.
pub type AnalyzerError = Box<dyn std::error::Error + Send + Sync>;

pub type AnalyzerResult<T> = Result<T, AnalyzerError>;

/// Result of a principal-variation analysis.
#[derive(Debug, Clone)]
pub struct PvAnalysis {
    /// Centipawns from the analyzed board's side to move. `None` is
    /// tolerated and read as 0.
    pub score_cp: Option<i32>,
    /// The preferred line; may be empty (treated as terminal for PV
    /// purposes).
    pub moves: Vec<ChessMove>,
    pub mate_in: Option<i32>,
}

impl PvAnalysis {
    /// The score with the `None -> 0` substitution applied.
    pub fn score(&self) -> i32 {
        self.score_cp.unwrap_or(0)
    }

    /// First move of the line, if any.
    pub fn best_move(&self) -> Option<ChessMove> {
        self.moves.first().copied()
    }
}

/// One entry of a multipv analysis.
#[derive(Debug, Clone)]
pub struct ScoredMove {
    pub score_cp: i32,
    pub mv: ChessMove,
}

/// Asynchronous engine interface consumed by the confidence engine.
///
/// Implementations are expected to serialize their own engine access; the
/// engine issues calls sequentially and treats every call as a suspension
/// point.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Best line from `board` at `depth`, up to `max_length` plies.
    async fn analyse_pv(
        &self,
        board: &Board,
        depth: u8,
        max_length: Option<usize>,
    ) -> AnalyzerResult<PvAnalysis>;

    /// Top `multipv` root moves from `board`, sorted by score descending.
    async fn analyse_multipv(
        &self,
        board: &Board,
        depth: u8,
        multipv: usize,
    ) -> AnalyzerResult<Vec<ScoredMove>>;
}

/// Flip `score` when `side` differs from `reference`.
///
/// This is the single place perspective handling happens; every score read
/// from an analyzer goes through here before it is compared with anything.
pub fn normalize_cp(score: i32, side: Color, reference: Color) -> i32 {
    if side == reference {
        score
    } else {
        -score
    }
}

/// Whether the position has no continuation (checkmate or stalemate).
pub fn is_terminal(board: &Board) -> bool {
    board.status() != BoardStatus::Ongoing
}

/// Walk a principal variation from `board`.
///
/// Moves are pushed one at a time; the walk stops at the first illegal
/// move, at a terminal position, or after `max_plies` pushes. Returns the
/// final board (the starting board when nothing was playable).
pub fn walk_pv(board: &Board, moves: &[ChessMove], max_plies: usize) -> Board {
    let mut current = *board;
    for mv in moves.iter().take(max_plies) {
        if is_terminal(&current) || !current.legal(*mv) {
            break;
        }
        current = current.make_move_new(*mv);
    }
    current
}

/// Parse a UCI move string (e.g., "e2e4", "e7e8q") against a board,
/// returning the move only if it is legal.
pub fn parse_uci_move(board: &Board, move_str: &str) -> Option<ChessMove> {
    let move_str = move_str.trim();
    if move_str.len() < 4 {
        return None;
    }

    let from = Square::from_str(&move_str[0..2]).ok()?;
    let to = Square::from_str(&move_str[2..4]).ok()?;

    let promotion = if move_str.len() > 4 {
        match move_str.as_bytes()[4] {
            b'q' | b'Q' => Some(chess::Piece::Queen),
            b'r' | b'R' => Some(chess::Piece::Rook),
            b'b' | b'B' => Some(chess::Piece::Bishop),
            b'n' | b'N' => Some(chess::Piece::Knight),
            _ => None,
        }
    } else {
        None
    };

    let chess_move = ChessMove::new(from, to, promotion);
    if board.legal(chess_move) {
        Some(chess_move)
    } else {
        None
    }
}
