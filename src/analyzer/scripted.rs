//! Scripted analyzer for deterministic testing.
//!
//! Responds from a `(fen, depth)` table instead of searching. Positions
//! without an entry fall back to a default score and the first legal move,
//! so a test only scripts the evaluations it actually asserts on. Individual
//! positions can also be scripted to fail, for exercising the
//! analyzer-unavailable paths.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Mutex;

use async_trait::async_trait;
use chess::{Board, ChessMove, MoveGen};

use super::{is_terminal, Analyzer, AnalyzerResult, PvAnalysis, ScoredMove};

#[derive(Debug, Clone)]
struct ScriptedLine {
    score_cp: Option<i32>,
    moves: Vec<String>,
}

/// Table-driven [`Analyzer`] implementation.
#[derive(Debug, Default)]
pub struct ScriptedAnalyzer {
    lines: HashMap<(String, u8), ScriptedLine>,
    failing_fens: HashSet<String>,
    default_score: i32,
    calls: Mutex<u64>,
}

impl ScriptedAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Score handed out for positions with no scripted entry.
    pub fn with_default_score(default_score: i32) -> Self {
        Self {
            default_score,
            ..Self::default()
        }
    }

    /// Script the full response for `(fen, depth)`.
    pub fn script(&mut self, fen: &str, depth: u8, score_cp: i32, moves: &[&str]) -> &mut Self {
        self.lines.insert(
            (fen.to_string(), depth),
            ScriptedLine {
                score_cp: Some(score_cp),
                moves: moves.iter().map(|m| m.to_string()).collect(),
            },
        );
        self
    }

    /// Script a scoreless response (exercises the `None -> 0` tolerance).
    pub fn script_no_score(&mut self, fen: &str, depth: u8, moves: &[&str]) -> &mut Self {
        self.lines.insert(
            (fen.to_string(), depth),
            ScriptedLine {
                score_cp: None,
                moves: moves.iter().map(|m| m.to_string()).collect(),
            },
        );
        self
    }

    /// Make every analysis of `fen` fail.
    pub fn fail_for(&mut self, fen: &str) -> &mut Self {
        self.failing_fens.insert(fen.to_string());
        self
    }

    /// Number of analyse calls served so far.
    pub fn calls(&self) -> u64 {
        *self.calls.lock().expect("call counter poisoned")
    }

    fn bump(&self) {
        *self.calls.lock().expect("call counter poisoned") += 1;
    }

    fn lookup(&self, board: &Board, depth: u8) -> PvAnalysis {
        let fen = board.to_string();
        if let Some(line) = self.lines.get(&(fen, depth)) {
            let moves = line
                .moves
                .iter()
                .filter_map(|m| ChessMove::from_str(m).ok())
                .collect();
            return PvAnalysis {
                score_cp: line.score_cp,
                moves,
                mate_in: None,
            };
        }
        let moves = if is_terminal(board) {
            Vec::new()
        } else {
            MoveGen::new_legal(board).take(1).collect()
        };
        PvAnalysis {
            score_cp: Some(self.default_score),
            moves,
            mate_in: None,
        }
    }
}

#[async_trait]
impl Analyzer for ScriptedAnalyzer {
    async fn analyse_pv(
        &self,
        board: &Board,
        depth: u8,
        max_length: Option<usize>,
    ) -> AnalyzerResult<PvAnalysis> {
        self.bump();
        let fen = board.to_string();
        if self.failing_fens.contains(&fen) {
            return Err(format!("scripted failure for {}", fen).into());
        }
        let mut analysis = self.lookup(board, depth);
        if let Some(cap) = max_length {
            analysis.moves.truncate(cap);
        }
        Ok(analysis)
    }

    async fn analyse_multipv(
        &self,
        board: &Board,
        depth: u8,
        multipv: usize,
    ) -> AnalyzerResult<Vec<ScoredMove>> {
        self.bump();
        let fen = board.to_string();
        if self.failing_fens.contains(&fen) {
            return Err(format!("scripted failure for {}", fen).into());
        }

        // Root moves scored from the child entries of the same table, the
        // way a real engine's multipv relates to its single-pv output.
        let mut entries = Vec::new();
        for mv in MoveGen::new_legal(board) {
            let child = board.make_move_new(mv);
            let analysis = self.lookup(&child, depth);
            entries.push(ScoredMove {
                score_cp: -analysis.score(),
                mv,
            });
        }
        entries.sort_by(|a, b| b.score_cp.cmp(&a.score_cp));
        entries.truncate(multipv);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn startpos() -> String {
        Board::default().to_string()
    }

    #[tokio::test]
    async fn test_scripted_entry_wins_over_fallback() {
        let mut analyzer = ScriptedAnalyzer::with_default_score(7);
        analyzer.script(&startpos(), 18, 33, &["e2e4", "e7e5"]);

        let board = Board::default();
        let deep = analyzer.analyse_pv(&board, 18, None).await.unwrap();
        assert_eq!(deep.score_cp, Some(33));
        assert_eq!(deep.moves.len(), 2);

        let shallow = analyzer.analyse_pv(&board, 2, None).await.unwrap();
        assert_eq!(shallow.score_cp, Some(7));
        assert_eq!(shallow.moves.len(), 1);
    }

    #[tokio::test]
    async fn test_scoreless_entry() {
        let mut analyzer = ScriptedAnalyzer::new();
        analyzer.script_no_score(&startpos(), 18, &["e2e4"]);
        let board = Board::default();
        let analysis = analyzer.analyse_pv(&board, 18, None).await.unwrap();
        assert_eq!(analysis.score_cp, None);
        // Callers read the score through the zero substitution.
        assert_eq!(analysis.score(), 0);
        assert_eq!(analysis.moves.len(), 1);
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let mut analyzer = ScriptedAnalyzer::new();
        analyzer.fail_for(&startpos());
        let board = Board::default();
        assert!(analyzer.analyse_pv(&board, 18, None).await.is_err());
    }

    #[tokio::test]
    async fn test_multipv_orders_by_scripted_child_scores() {
        let mut analyzer = ScriptedAnalyzer::new();
        let board = Board::default();
        // Make 1. d4 the clear favorite: the child score is from black's
        // perspective, so a very negative entry ranks the move first.
        let after_d4 = board
            .make_move_new(ChessMove::from_str("d2d4").unwrap())
            .to_string();
        analyzer.script(&after_d4, 2, -250, &[]);

        let entries = analyzer.analyse_multipv(&board, 2, 3).await.unwrap();
        assert_eq!(entries[0].mv.to_string(), "d2d4");
        assert_eq!(entries[0].score_cp, 250);
    }

    #[tokio::test]
    async fn test_call_counter() {
        let analyzer = ScriptedAnalyzer::new();
        let board = Board::default();
        analyzer.analyse_pv(&board, 2, None).await.unwrap();
        analyzer.analyse_pv(&board, 18, None).await.unwrap();
        assert_eq!(analyzer.calls(), 2);
    }
}
